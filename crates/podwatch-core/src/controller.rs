//! Reconcile runtime.
//!
//! Drives the dispatcher from a bounded notification queue:
//!
//! - at most `max_concurrent` reconciles run at once,
//! - a key is never reconciled twice concurrently; notifications arriving
//!   while it is in flight are coalesced and replayed afterwards. A coalesced
//!   `Deleted` is never overwritten: it runs first, then the latest `Changed`
//!   that followed it,
//! - every pass runs under the configured deadline,
//! - retryable failures are re-enqueued with exponential backoff,
//! - `requeue_after` outcomes arm one timer per key. Re-arming replaces the
//!   previous timer and shutdown aborts and joins them all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::config::ReconcileConfig;
use crate::context::ReconcileContext;
use crate::dispatcher::ReconcileDispatcher;
use crate::error::{PodwatchError, Result};
use crate::types::{Notification, NotificationKind, ObjectKey, ReconcileOutcome};

/// Reconcile counters, shared between the runtime and its handle.
#[derive(Debug, Clone, Default)]
pub struct ControllerStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    reconciles_total: AtomicU64,
    failures_total: AtomicU64,
    retries_scheduled: AtomicU64,
    requeues_scheduled: AtomicU64,
}

impl ControllerStats {
    /// Completed reconcile passes, successful or not.
    #[must_use]
    pub fn reconciles_total(&self) -> u64 {
        self.inner.reconciles_total.load(Ordering::Relaxed)
    }

    /// Failed reconcile passes.
    #[must_use]
    pub fn failures_total(&self) -> u64 {
        self.inner.failures_total.load(Ordering::Relaxed)
    }

    /// Backoff retries armed after retryable failures.
    #[must_use]
    pub fn retries_scheduled(&self) -> u64 {
        self.inner.retries_scheduled.load(Ordering::Relaxed)
    }

    /// Timers armed from `requeue_after` outcomes.
    #[must_use]
    pub fn requeues_scheduled(&self) -> u64 {
        self.inner.requeues_scheduled.load(Ordering::Relaxed)
    }

    /// Creates a snapshot of current counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reconciles_total: self.reconciles_total(),
            failures_total: self.failures_total(),
            retries_scheduled: self.retries_scheduled(),
            requeues_scheduled: self.requeues_scheduled(),
        }
    }

    fn record(&self, counter: fn(&StatsInner) -> &AtomicU64) {
        counter(&self.inner).fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`ControllerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Completed reconcile passes.
    pub reconciles_total: u64,
    /// Failed reconcile passes.
    pub failures_total: u64,
    /// Backoff retries armed.
    pub retries_scheduled: u64,
    /// Requeue timers armed.
    pub requeues_scheduled: u64,
}

/// Reconcile runtime builder.
pub struct Controller {
    dispatcher: Arc<ReconcileDispatcher>,
    config: ReconcileConfig,
}

impl Controller {
    /// Creates a controller around `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<ReconcileDispatcher>, config: ReconcileConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Starts the runtime on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> ControllerHandle {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = ControllerStats::default();

        let runtime = Runtime::new(self.dispatcher, self.config, stats.clone());
        let task = tokio::spawn(runtime.run(rx, shutdown_rx));

        ControllerHandle {
            tx,
            shutdown_tx,
            task,
            stats,
        }
    }
}

/// Handle to a running controller.
pub struct ControllerHandle {
    tx: mpsc::Sender<Notification>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    stats: ControllerStats,
}

impl ControllerHandle {
    /// Enqueues a notification, waiting for queue capacity.
    ///
    /// # Errors
    /// Returns [`PodwatchError::Shutdown`] once the controller has stopped.
    pub async fn notify(&self, notification: Notification) -> Result<()> {
        self.tx
            .send(notification)
            .await
            .map_err(|_| PodwatchError::Shutdown)
    }

    /// Returns a sender for watch collaborators.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<Notification> {
        self.tx.clone()
    }

    /// Returns the reconcile counters.
    #[must_use]
    pub const fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    /// Stops the controller, cancels pending timers and in-flight passes, and
    /// waits for every task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "controller task failed during shutdown");
        }
    }
}

struct Completion {
    notification: Notification,
    result: Result<ReconcileOutcome>,
}

struct Timer {
    generation: u64,
    handle: AbortHandle,
}

/// Work queued behind an in-flight pass for the same key.
#[derive(Default)]
struct Pending {
    deleted: Option<Notification>,
    changed: Option<Notification>,
}

impl Pending {
    fn push(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Deleted => {
                self.changed = None;
                self.deleted = Some(notification);
            }
            NotificationKind::Changed => self.changed = Some(notification),
        }
    }

    fn pop(&mut self) -> Option<Notification> {
        self.deleted.take().or_else(|| self.changed.take())
    }

    fn is_empty(&self) -> bool {
        self.deleted.is_none() && self.changed.is_none()
    }
}

struct Runtime {
    dispatcher: Arc<ReconcileDispatcher>,
    config: ReconcileConfig,
    stats: ControllerStats,
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
    in_flight: HashSet<ObjectKey>,
    pending: HashMap<ObjectKey, Pending>,
    failures: HashMap<ObjectKey, u32>,
    timers: HashMap<ObjectKey, Timer>,
    timer_tasks: JoinSet<()>,
    next_generation: u64,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    timer_tx: mpsc::UnboundedSender<(u64, Notification)>,
    timer_rx: mpsc::UnboundedReceiver<(u64, Notification)>,
}

impl Runtime {
    fn new(
        dispatcher: Arc<ReconcileDispatcher>,
        config: ReconcileConfig,
        stats: ControllerStats,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            dispatcher,
            config,
            stats,
            tasks: JoinSet::new(),
            in_flight: HashSet::new(),
            pending: HashMap::new(),
            failures: HashMap::new(),
            timers: HashMap::new(),
            timer_tasks: JoinSet::new(),
            next_generation: 0,
            done_tx,
            done_rx,
            timer_tx,
            timer_rx,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Notification>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut inputs_open = true;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                Some(completion) = self.done_rx.recv() => self.complete(completion),
                Some((generation, notification)) = self.timer_rx.recv() => {
                    self.fire_timer(generation, notification);
                }
                received = rx.recv(), if inputs_open => match received {
                    Some(notification) => self.schedule(notification),
                    None => inputs_open = false,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "reconcile task failed");
                    }
                }
                Some(joined) = self.timer_tasks.join_next(), if !self.timer_tasks.is_empty() => {
                    if let Some(e) = joined.err().filter(|e| !e.is_cancelled()) {
                        error!(error = %e, "requeue timer failed");
                    }
                }
            }
        }

        self.timers.clear();
        self.timer_tasks.shutdown().await;
        self.tasks.shutdown().await;
        debug!("controller stopped");
    }

    fn schedule(&mut self, notification: Notification) {
        if self.in_flight.contains(&notification.key) {
            self.pending
                .entry(notification.key.clone())
                .or_default()
                .push(notification);
            return;
        }
        self.start(notification);
    }

    fn start(&mut self, notification: Notification) {
        self.in_flight.insert(notification.key.clone());

        let dispatcher = Arc::clone(&self.dispatcher);
        let permits = Arc::clone(&self.permits);
        let done_tx = self.done_tx.clone();
        let timeout = self.config.timeout;
        let span = info_span!("reconcile", key = %notification.key);

        self.tasks.spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let ctx = ReconcileContext::with_timeout(timeout);
                let result =
                    match tokio::time::timeout(timeout, dispatcher.dispatch(&notification, &ctx))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ctx.timeout_error(&notification.key)),
                    };
                let _ = done_tx.send(Completion {
                    notification,
                    result,
                });
            }
            .instrument(span),
        );
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            notification,
            result,
        } = completion;
        let key = notification.key.clone();
        self.in_flight.remove(&key);
        self.stats.record(|s| &s.reconciles_total);

        match result {
            Ok(outcome) => {
                self.failures.remove(&key);
                if let Some(delay) = outcome.requeue_after {
                    self.stats.record(|s| &s.requeues_scheduled);
                    self.arm_timer(Notification::changed(key.clone()), delay);
                }
            }
            Err(e) if e.is_retryable() => {
                self.stats.record(|s| &s.failures_total);
                self.stats.record(|s| &s.retries_scheduled);
                let failures = self.failures.entry(key.clone()).or_insert(0);
                let delay = self.config.backoff.delay_for(*failures);
                *failures = failures.saturating_add(1);
                warn!(%key, error = %e, retry_in = ?delay, "reconcile failed, retrying");
                self.arm_timer(notification, delay);
            }
            Err(e) => {
                self.stats.record(|s| &s.failures_total);
                self.failures.remove(&key);
                error!(%key, error = %e, "reconcile failed");
            }
        }

        if let Some(next) = self.next_pending(&key) {
            self.start(next);
        }
    }

    fn next_pending(&mut self, key: &ObjectKey) -> Option<Notification> {
        let pending = self.pending.get_mut(key)?;
        let next = pending.pop();
        if pending.is_empty() {
            self.pending.remove(key);
        }
        next
    }

    fn arm_timer(&mut self, notification: Notification, delay: Duration) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let key = notification.key.clone();
        let timer_tx = self.timer_tx.clone();
        let handle = self.timer_tasks.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = timer_tx.send((generation, notification));
        });

        if let Some(previous) = self.timers.insert(key, Timer { generation, handle }) {
            previous.handle.abort();
        }
    }

    fn fire_timer(&mut self, generation: u64, notification: Notification) {
        let current = self
            .timers
            .get(&notification.key)
            .is_some_and(|timer| timer.generation == generation);
        if !current {
            return;
        }
        self.timers.remove(&notification.key);
        self.schedule(notification);
    }
}
