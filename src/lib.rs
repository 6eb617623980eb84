//! Camera Service Monitor: an always-on watchdog for a single streaming
//! service on a resource-constrained host.
//!
//! Three independently-paced loops share one best-effort Loki client:
//!
//! - [`monitor::journal::LogStreamer`] tails the unit's journal and forwards
//!   every record.
//! - [`monitor::health::HealthChecker`] polls liveness and restarts the unit
//!   when it is not `active`/`activating`.
//! - [`monitor::retention::StorageReclaimer`] deletes expired recording
//!   segments under a name/age policy.
//!
//! The [`daemon::Supervisor`] launches them as OS threads and winds the
//! process down cooperatively on SIGINT/SIGTERM. Telemetry delivery is
//! deliberately at-most-once per attempt: a failed push is dropped rather
//! than allowed to block the health or retention loops.

#[cfg(feature = "cli")]
pub mod cli_app;
pub mod core;
#[cfg(feature = "daemon")]
pub mod daemon;
pub mod monitor;
pub mod shipper;
