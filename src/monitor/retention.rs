//! Retention-based storage reclamation for the service's recording segments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::shutdown::ShutdownFlag;
use crate::shipper::{LabelSet, Level, LokiClient};

/// Age- and name-based deletion rule. Applies to regular files directly in
/// `directory`; subdirectories are never entered.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Directory to scan (non-recursive).
    pub directory: PathBuf,
    /// Files with a last-modified time older than `now - max_age` qualify.
    pub max_age: Duration,
    /// Required file-name prefix.
    pub name_prefix: String,
    /// Required file-name suffix.
    pub name_suffix: String,
}

impl RetentionPolicy {
    /// Policy for the recorder's segment naming scheme (`record_*.mp4`).
    #[must_use]
    pub fn for_recordings(directory: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            directory: directory.into(),
            max_age,
            name_prefix: "record_".to_string(),
            name_suffix: ".mp4".to_string(),
        }
    }

    /// Name match. Prefix and suffix must both be present without
    /// overlapping, so `record_` alone never matches `record_*.mp4`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.len() >= self.name_prefix.len() + self.name_suffix.len()
            && name.starts_with(&self.name_prefix)
            && name.ends_with(&self.name_suffix)
    }
}

/// Outcome of one reclamation pass. `failure` carries the first error that
/// ended the pass early; deletions made before it are kept and counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimSummary {
    /// Files deleted.
    pub deleted: usize,
    /// Combined size of the deleted files.
    pub bytes_freed: u64,
    /// First error encountered, if the pass aborted.
    pub failure: Option<String>,
}

impl ReclaimSummary {
    /// Freed space in MiB, for the summary log line.
    #[must_use]
    pub fn freed_mib(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let bytes = self.bytes_freed as f64;
        bytes / (1024.0 * 1024.0)
    }
}

/// One reclamation pass under `policy`, with `now` injected for testing.
///
/// A missing directory is a silent no-op (the recorder may not have created
/// it yet). The first scan/stat/delete error ends the pass; the summary still
/// reports everything deleted up to that point.
#[must_use]
pub fn reclaim(policy: &RetentionPolicy, now: SystemTime) -> ReclaimSummary {
    let mut summary = ReclaimSummary::default();
    if !policy.directory.exists() {
        return summary;
    }
    let Some(cutoff) = now.checked_sub(policy.max_age) else {
        // Retention window reaches before the epoch; nothing can qualify.
        return summary;
    };

    let entries = match std::fs::read_dir(&policy.directory) {
        Ok(entries) => entries,
        Err(err) => {
            summary.failure = Some(format!("cannot list {}: {err}", policy.directory.display()));
            return summary;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                summary.failure = Some(format!("directory scan failed: {err}"));
                return summary;
            }
        };
        // Non-UTF-8 names cannot match the pattern and are never touched.
        let raw_name = entry.file_name();
        let Some(name) = raw_name.to_str() else {
            continue;
        };
        if !policy.matches(name) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                summary.failure = Some(format!("cannot stat {name}: {err}"));
                return summary;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(err) => {
                summary.failure = Some(format!("no mtime for {name}: {err}"));
                return summary;
            }
        };
        if modified >= cutoff {
            continue;
        }
        let size = metadata.len();
        if let Err(err) = std::fs::remove_file(entry.path()) {
            summary.failure = Some(format!("cannot delete {name}: {err}"));
            return summary;
        }
        summary.deleted += 1;
        summary.bytes_freed += size;
    }
    summary
}

/// Periodic reclamation loop reporting through the shared client.
pub struct StorageReclaimer {
    client: Arc<LokiClient>,
    policy: RetentionPolicy,
}

impl StorageReclaimer {
    /// Reclaimer for `policy`, reporting through `client`.
    pub fn new(client: Arc<LokiClient>, policy: RetentionPolicy) -> Self {
        Self { client, policy }
    }

    /// One pass. Quiet cycles (nothing deleted, no error) push nothing, so a
    /// healthy idle system does not generate a log line every interval.
    pub fn run_cycle(&self) {
        let summary = reclaim(&self.policy, SystemTime::now());
        let labels = LabelSet::new().with("action", "cleanup");
        if let Some(detail) = &summary.failure {
            let _ = self.client.push_event(
                Level::Error,
                format!("Storage maintenance failed: {detail}"),
                labels,
            );
            return;
        }
        if summary.deleted > 0 {
            let message = format!(
                "Storage maintenance: removed {} segments, freed {:.2} MB",
                summary.deleted,
                summary.freed_mib()
            );
            println!("{message}");
            let _ = self.client.push_event(Level::Info, message, labels);
        }
    }

    /// Maintenance loop.
    pub fn run(&self, interval: Duration, shutdown: &ShutdownFlag) {
        println!(
            "Starting maintenance loop (interval: {}s)...",
            interval.as_secs()
        );
        while !shutdown.is_requested() {
            self.run_cycle();
            if shutdown.wait(interval) {
                break;
            }
        }
    }
}
