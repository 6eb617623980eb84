//! Daemon configuration: loaded once at startup, no hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{CsmError, Result};

/// Full configuration surface. Every knob is fixed at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the systemd unit under supervision.
    pub service_name: String,
    /// Directory holding the service's recording segments.
    pub recordings_dir: PathBuf,
    /// Recording segments older than this many hours are deleted.
    pub retention_hours: u64,
    /// Loki push endpoint, e.g. `http://loki.lan:3100/loki/api/v1/push`.
    pub loki_url: String,
    /// Seconds between liveness checks of the managed service.
    pub health_check_interval_secs: u64,
    /// Seconds between storage maintenance passes.
    pub maintenance_interval_secs: u64,
    /// Job label attached to every pushed stream.
    pub job_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "mediamtx".to_string(),
            recordings_dir: PathBuf::from("/opt/recordings"),
            retention_hours: 24,
            loki_url: "http://localhost:3100/loki/api/v1/push".to_string(),
            health_check_interval_secs: 60,
            maintenance_interval_secs: 900,
            job_name: "pi_camera_monitor".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or fall back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Err(CsmError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|err| CsmError::io(path, err))?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make a loop degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(CsmError::InvalidConfig {
                details: "service_name must not be empty".to_string(),
            });
        }
        if self.loki_url.trim().is_empty() {
            return Err(CsmError::InvalidConfig {
                details: "loki_url must not be empty".to_string(),
            });
        }
        if self.health_check_interval_secs == 0 {
            return Err(CsmError::InvalidConfig {
                details: "health_check_interval_secs must be positive".to_string(),
            });
        }
        if self.maintenance_interval_secs == 0 {
            return Err(CsmError::InvalidConfig {
                details: "maintenance_interval_secs must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Liveness check cadence.
    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    /// Storage maintenance cadence.
    #[must_use]
    pub const fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    /// Retention cutoff age for recording segments.
    #[must_use]
    pub const fn retention_age(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}
