//! Replays a container restart history against an in-memory cluster and
//! prints the resulting Prometheus exposition.
//!
//! ```bash
//! cargo run --example restarts
//! RUST_LOG=debug cargo run --example restarts
//! ```

use std::sync::Arc;
use std::time::Duration;

use podwatch::prelude::*;
use podwatch_core::{ContainerStatus, LogConfig};
use podwatch_test::FakeCluster;
use podwatch_test::fixtures::{issuer_key, issuer_secret, pod, terminated};
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    podwatch::observe::logging::init(&LogConfig::default())?;

    let cluster = Arc::new(FakeCluster::new());
    cluster.put_secret(issuer_secret("ca.crt"));
    let podwatch = Podwatch::start(PodwatchConfig::default(), cluster.clone())?;
    podwatch.notify(Notification::changed(issuer_key())).await?;

    let web = ObjectKey::new("default", "web-0");
    let history = [
        ContainerStatus::running("app", 0),
        terminated("app", 1, "OOMKilled", 137, OffsetDateTime::now_utc()),
        ContainerStatus::running("app", 2),
        terminated("app", 3, "Error", 1, OffsetDateTime::now_utc()),
    ];
    for status in history {
        cluster.put_pod(pod("default", "web-0", [status]));
        podwatch.notify(Notification::changed(web.clone())).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    println!("{}", podwatch.export()?);
    podwatch.shutdown().await;
    Ok(())
}
