// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # podwatch-test
//!
//! Testing infrastructure for podwatch.
//!
//! This crate provides:
//! - **Fake cluster**: in-memory [`ClusterSource`] with fault injection
//! - **Fixtures**: a real issuer certificate, malformed PEM and pod builders
//! - **Controller harness**: a running controller over fake collaborators
//! - **Falsification tests**: each property of the reconcile engine is
//!   stated as a test that tries to refute it
//!
//! ## Example
//!
//! ```rust,ignore
//! use podwatch_test::{ControllerTestHarness, fixtures};
//!
//! let harness = ControllerTestHarness::builder().build()?;
//! harness.cluster().put_secret(fixtures::issuer_secret("ca.crt"));
//! harness.notify(Notification::changed(fixtures::issuer_key())).await?;
//! harness
//!     .wait_for(Duration::from_secs(1), |h| h.stats().reconciles_total() > 0)
//!     .await?;
//! ```
//!
//! [`ClusterSource`]: podwatch_core::ClusterSource

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod chaos;
pub mod cluster;
pub mod error;
pub mod fixtures;
pub mod harness;

pub use chaos::ChaosConfig;
pub use cluster::FakeCluster;
pub use error::{Result, TestError};
pub use harness::{ControllerTestHarness, ControllerTestHarnessBuilder};
