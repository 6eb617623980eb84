//! Best-effort Loki push client shared by every loop in the daemon.
//!
//! Delivery contract: one POST per `push` call, bounded by a short timeout,
//! and **no retry** — a failed push is reported on stderr and dropped. The
//! health and retention loops must never stall behind a down backend.

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::errors::{CsmError, Result};
use crate::shipper::entry::{EventBatch, LabelSet, Level, LogEntry};

/// Status code the reference backend returns for an accepted push.
const SUCCESS_STATUS: u16 = 204;

/// Bound on the POST round trip. Chosen so a wedged backend delays a caller
/// by at most one short network timeout per loop iteration.
const PUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct PushRequest {
    streams: Vec<StreamPayload>,
}

#[derive(Serialize)]
struct StreamPayload {
    stream: LabelSet,
    values: Vec<(String, String)>,
}

/// Client for the Loki HTTP push API.
///
/// Base labels (`job`, `host`, `service`) ride on every stream; entry labels
/// and the severity label are merged over them. The timestamp counter is the
/// only mutable state and is shared by all producer threads.
pub struct LokiClient {
    http: reqwest::blocking::Client,
    url: String,
    base_labels: LabelSet,
    last_ns: Mutex<i64>,
}

impl LokiClient {
    /// Build a client for `url` with the given base labels.
    pub fn new(url: impl Into<String>, base_labels: LabelSet) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            base_labels,
            last_ns: Mutex::new(0),
        })
    }

    /// Next wire timestamp in nanoseconds, strictly greater than any value
    /// previously returned by this instance. When the wall clock has not
    /// advanced past the last issued value (coarse clocks, rapid successive
    /// pushes), the counter bumps by one nanosecond instead.
    pub fn next_timestamp(&self) -> i64 {
        let now_ns = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX - 1);
        let mut last = self.last_ns.lock();
        let ts = if now_ns <= *last { *last + 1 } else { now_ns };
        *last = ts;
        ts
    }

    /// Stamp `entries` and group them into per-label-set streams. Entries
    /// sharing an effective label set collapse into one stream; both stream
    /// order and intra-stream value order follow arrival order.
    fn build_streams(&self, entries: &[LogEntry]) -> Vec<StreamPayload> {
        let mut streams: Vec<StreamPayload> = Vec::new();
        for entry in entries {
            let labels = self
                .base_labels
                .merged(&entry.labels)
                .with("level", entry.level.as_str());
            let value = (self.next_timestamp().to_string(), entry.message.clone());
            match streams.iter_mut().find(|s| s.stream == labels) {
                Some(stream) => stream.values.push(value),
                None => streams.push(StreamPayload {
                    stream: labels,
                    values: vec![value],
                }),
            }
        }
        streams
    }

    fn post(&self, request: &PushRequest) -> Result<()> {
        let response = self.http.post(&self.url).json(request).send()?;
        let status = response.status().as_u16();
        if status == SUCCESS_STATUS {
            Ok(())
        } else {
            Err(CsmError::PushStatus { status })
        }
    }

    /// Ship a group of entries in one POST. On any failure the entries are
    /// dropped after a stderr diagnostic; callers may ignore the result.
    pub fn push(&self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let request = PushRequest {
            streams: self.build_streams(entries),
        };
        self.post(&request).inspect_err(|err| {
            eprintln!("loki push dropped: {err}");
        })
    }

    /// Ship one message with extra labels on top of the base set.
    pub fn push_event(&self, level: Level, message: impl Into<String>, labels: LabelSet) -> Result<()> {
        self.push(&[LogEntry {
            level,
            message: message.into(),
            labels,
        }])
    }

    /// Ship a detection batch: one shared timestamp, one stream per event
    /// label so the backend groups each object into its own stream.
    pub fn push_batch(&self, batch: &EventBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let ts = self.next_timestamp().to_string();
        let streams = batch
            .events()
            .iter()
            .map(|(label, confidence)| StreamPayload {
                stream: self.base_labels.clone().with("object", label.clone()),
                values: vec![(ts.clone(), format!("Detection: {label} (conf: {confidence:.2})"))],
            })
            .collect();
        self.post(&PushRequest { streams }).inspect_err(|err| {
            eprintln!("loki batch push dropped: {err}");
        })
    }
}
