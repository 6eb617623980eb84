//! Supervisor: starts the three loops, idles on the shutdown flag, and
//! coordinates graceful termination.

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::core::errors::{CsmError, Result};
use crate::core::shutdown::ShutdownFlag;
use crate::daemon::signals;
use crate::monitor::health::{HealthChecker, ServiceManager, SystemctlManager};
use crate::monitor::journal::{JournalSource, LogSource, LogStreamer};
use crate::monitor::retention::{RetentionPolicy, StorageReclaimer};
use crate::shipper::{LabelSet, Level, LokiClient};

/// Main-thread poll cadence while the workers run.
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Daemon lifecycle. Transitions only move forward; once a shutdown signal
/// arrives there is no way back to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// Configuration accepted, loops not yet launched.
    Starting,
    /// All three loops running.
    Running,
    /// Signal observed, waiting for loops to drain.
    ShuttingDown,
    /// All loops joined; final push attempted.
    Stopped,
}

/// Host name for the base label set. Falls back to a placeholder when the
/// `hostname` utility is unavailable.
fn hostname() -> String {
    Command::new("hostname")
        .output()
        .ok()
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Owns the process lifecycle: signal registration, worker threads, and the
/// best-effort startup/stopped pushes.
pub struct Supervisor {
    config: Config,
    client: Arc<LokiClient>,
    shutdown: ShutdownFlag,
    state: DaemonState,
}

impl Supervisor {
    /// Build the shared client from the validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let base_labels = LabelSet::new()
            .with("job", config.job_name.clone())
            .with("host", hostname())
            .with("service", config.service_name.clone());
        let client = Arc::new(LokiClient::new(config.loki_url.clone(), base_labels)?);
        Ok(Self {
            config,
            client,
            shutdown: ShutdownFlag::new(),
            state: DaemonState::Starting,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> DaemonState {
        self.state
    }

    /// Handle for requesting shutdown from outside a signal handler.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Run against the real host: journald follower and systemctl.
    pub fn run(&mut self) -> Result<()> {
        signals::register(&self.shutdown)?;
        let source = JournalSource::spawn(&self.config.service_name)?;
        self.run_with(Box::new(source), Box::new(SystemctlManager))
    }

    /// Run with injected collaborators. Blocks until shutdown completes.
    pub fn run_with(
        &mut self,
        source: Box<dyn LogSource>,
        manager: Box<dyn ServiceManager>,
    ) -> Result<()> {
        let _ = self.client.push_event(
            Level::Info,
            "Camera service monitor started.",
            LabelSet::new().with("action", "startup"),
        );
        println!("Monitor started for service: {}", self.config.service_name);

        let streamer_handle = {
            let streamer = LogStreamer::new(Arc::clone(&self.client), self.config.service_name.clone());
            let shutdown = self.shutdown.clone();
            let mut source = source;
            spawn_worker("csm-journal", move || {
                streamer.run(source.as_mut(), &shutdown);
            })?
        };

        let health_handle = {
            let checker = HealthChecker::new(
                manager,
                Arc::clone(&self.client),
                self.config.service_name.clone(),
            );
            let interval = self.config.health_interval();
            let shutdown = self.shutdown.clone();
            spawn_worker("csm-health", move || {
                checker.run(interval, &shutdown);
            })?
        };

        let reclaim_handle = {
            let policy = RetentionPolicy::for_recordings(
                self.config.recordings_dir.clone(),
                self.config.retention_age(),
            );
            let reclaimer = StorageReclaimer::new(Arc::clone(&self.client), policy);
            let interval = self.config.maintenance_interval();
            let shutdown = self.shutdown.clone();
            spawn_worker("csm-reclaim", move || {
                reclaimer.run(interval, &shutdown);
            })?
        };

        self.state = DaemonState::Running;
        while !self.shutdown.wait(IDLE_POLL) {}
        self.state = DaemonState::ShuttingDown;
        println!("Shutdown signal received. Exiting gracefully...");

        // Cooperative only: each loop notices the flag within one iteration
        // bound, so these joins complete without forced cancellation.
        for (name, handle) in [
            ("csm-journal", streamer_handle),
            ("csm-health", health_handle),
            ("csm-reclaim", reclaim_handle),
        ] {
            if handle.join().is_err() {
                eprintln!("worker {name} panicked during shutdown");
            }
        }

        let _ = self.client.push_event(
            Level::Info,
            "Camera service monitor stopped.",
            LabelSet::new().with("action", "shutdown"),
        );
        self.state = DaemonState::Stopped;
        Ok(())
    }
}

fn spawn_worker(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|err| CsmError::Runtime {
            details: format!("failed to spawn {name}: {err}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{DaemonState, Supervisor, hostname};
    use crate::core::config::Config;

    #[test]
    fn hostname_is_never_empty() {
        assert!(!hostname().is_empty());
    }

    #[test]
    fn new_supervisor_starts_in_starting_state() {
        let supervisor = Supervisor::new(Config::default()).expect("supervisor");
        assert_eq!(supervisor.state(), DaemonState::Starting);
        assert!(!supervisor.shutdown_flag().is_requested());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = Config {
            service_name: String::new(),
            ..Config::default()
        };
        assert!(Supervisor::new(config).is_err());
    }
}
