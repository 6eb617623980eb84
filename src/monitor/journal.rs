//! Journal tailing: follows the managed unit's structured log output and
//! forwards each record to Loki.

use std::io::BufRead;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::core::errors::{CsmError, Result};
use crate::core::shutdown::ShutdownFlag;
use crate::shipper::{LabelSet, Level, LokiClient};

/// Sleep between polls when the source has nothing buffered.
const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Seam over a following log reader. `next_record` never blocks: `None`
/// means nothing is buffered right now, not end of stream.
pub trait LogSource: Send {
    /// Next raw record, if one is ready.
    fn next_record(&mut self) -> Option<String>;

    /// Tear down the underlying follower. Must leave no orphaned reader.
    fn close(&mut self);
}

/// `journalctl -f` follower scoped to one unit, starting at the current tail.
///
/// A dedicated reader thread drains the child's stdout into a channel so the
/// streamer loop can poll without blocking on the pipe.
pub struct JournalSource {
    child: Child,
    receiver: Receiver<String>,
    reader: Option<std::thread::JoinHandle<()>>,
    closed: bool,
}

impl JournalSource {
    /// Spawn the follower for `unit`. `-n 0` skips the backlog: only records
    /// logged after startup are shipped.
    pub fn spawn(unit: &str) -> Result<Self> {
        let mut child = Command::new("journalctl")
            .args(["-u", unit, "-f", "-o", "json", "-n", "0"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| CsmError::Runtime {
                details: format!("failed to spawn journalctl: {err}"),
            })?;
        let stdout = child.stdout.take().ok_or_else(|| CsmError::Runtime {
            details: "journalctl stdout was not captured".to_string(),
        })?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        let reader = std::thread::Builder::new()
            .name("csm-journal-reader".to_string())
            .spawn(move || {
                let mut lines = std::io::BufReader::new(stdout).lines();
                while let Some(Ok(line)) = lines.next() {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| CsmError::Runtime {
                details: format!("failed to spawn journal reader thread: {err}"),
            })?;
        Ok(Self {
            child,
            receiver,
            reader: Some(reader),
            closed: false,
        })
    }
}

impl LogSource for JournalSource {
    fn next_record(&mut self) -> Option<String> {
        match self.receiver.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
        // Reader sees EOF once the child is gone.
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for JournalSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Parse one journald JSON export record into a level and message.
/// Returns `None` for anything malformed; a corrupt line must never stop
/// the stream.
fn parse_record(line: &str) -> Option<(Level, String)> {
    let record: serde_json::Value = serde_json::from_str(line).ok()?;
    // MESSAGE may be a byte array for binary payloads; those are skipped.
    let message = record.get("MESSAGE")?.as_str()?.to_string();
    let priority = match record.get("PRIORITY") {
        Some(serde_json::Value::String(raw)) => raw.parse::<u8>().ok(),
        Some(serde_json::Value::Number(raw)) => raw.as_u64().and_then(|v| u8::try_from(v).ok()),
        _ => None,
    };
    let level = priority.map_or(Level::Info, Level::from_priority);
    Some((level, message))
}

/// Forwards journal records to Loki, one push per record, in source order.
pub struct LogStreamer {
    client: Arc<LokiClient>,
    unit: String,
}

impl LogStreamer {
    /// Streamer for `unit`, shipping through `client`.
    pub fn new(client: Arc<LokiClient>, unit: impl Into<String>) -> Self {
        Self {
            client,
            unit: unit.into(),
        }
    }

    /// Read loop. Checks the shutdown flag once per iteration and closes the
    /// source before returning so no follower process outlives the daemon.
    pub fn run(&self, source: &mut dyn LogSource, shutdown: &ShutdownFlag) {
        println!("Starting journal log stream for {}...", self.unit);
        while !shutdown.is_requested() {
            let Some(line) = source.next_record() else {
                let _ = shutdown.wait(IDLE_SLEEP);
                continue;
            };
            let Some((level, message)) = parse_record(&line) else {
                continue;
            };
            let labels = LabelSet::new()
                .with("source", "journald")
                .with("unit", self.unit.clone());
            let _ = self.client.push_event(level, message, labels);
        }
        source.close();
    }
}
