//! Log entry model: severity levels, ordered label sets, event batches.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Syslog-convention severity, ordered most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Priority 0.
    Emergency,
    /// Priority 1.
    Alert,
    /// Priority 2.
    Critical,
    /// Priority 3.
    Error,
    /// Priority 4.
    Warning,
    /// Priority 5.
    Notice,
    /// Priority 6.
    Info,
    /// Priority 7.
    Debug,
}

impl Level {
    /// Map a journald `PRIORITY` value. Unknown or out-of-range values
    /// default to `Info`, matching the journald export convention.
    #[must_use]
    pub const fn from_priority(priority: u8) -> Self {
        match priority {
            0 => Self::Emergency,
            1 => Self::Alert,
            2 => Self::Critical,
            3 => Self::Error,
            4 => Self::Warning,
            5 => Self::Notice,
            7 => Self::Debug,
            _ => Self::Info,
        }
    }

    /// Wire representation used as the `level` stream label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Ordered label mapping. Serves as both the stream-grouping key and the
/// serialized `stream` object on the wire, so equality and iteration order
/// must be deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Empty label set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or overwrite one label.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (name, value) in &other.0 {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Label value lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no labels are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// One log line headed for the backend. Timestamps are assigned by the
/// client at push time, not here; see `LokiClient::next_timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity, folded into the stream labels on the wire.
    pub level: Level,
    /// Raw message text.
    pub message: String,
    /// Entry-specific labels merged over the client's base labels.
    pub labels: LabelSet,
}

impl LogEntry {
    /// Entry with no extra labels beyond the client's base set.
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            labels: LabelSet::new(),
        }
    }

    /// Builder-style extra label.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name, value);
        self
    }
}

/// A group of `(label, confidence)` events that collapse into one push with
/// one shared timestamp, one stream per label. Producers that sample
/// repeatedly (e.g. per-frame inference) use `novel_since` to suppress
/// events already reported in the previous sampling window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    events: Vec<(String, f64)>,
}

impl EventBatch {
    /// Batch from `(label, confidence)` pairs, in producer order.
    #[must_use]
    pub fn new(events: Vec<(String, f64)>) -> Self {
        Self { events }
    }

    /// Events in this batch.
    #[must_use]
    pub fn events(&self) -> &[(String, f64)] {
        &self.events
    }

    /// True when there is nothing to push.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Subset of events whose label did not appear in `seen`. Deduplication
    /// is keyed on the label name only; confidence changes alone do not make
    /// an event novel.
    #[must_use]
    pub fn novel_since(&self, seen: &HashSet<String>) -> Self {
        Self {
            events: self
                .events
                .iter()
                .filter(|(label, _)| !seen.contains(label))
                .cloned()
                .collect(),
        }
    }

    /// Label names present in this batch, for carrying into the next
    /// sampling window's `novel_since` call.
    #[must_use]
    pub fn label_names(&self) -> HashSet<String> {
        self.events.iter().map(|(label, _)| label.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBatch, LabelSet, Level, LogEntry};
    use std::collections::HashSet;

    #[test]
    fn priority_table_covers_syslog_range() {
        assert_eq!(Level::from_priority(0), Level::Emergency);
        assert_eq!(Level::from_priority(3), Level::Error);
        assert_eq!(Level::from_priority(6), Level::Info);
        assert_eq!(Level::from_priority(7), Level::Debug);
        // Out-of-range falls back to info.
        assert_eq!(Level::from_priority(42), Level::Info);
    }

    #[test]
    fn label_sets_compare_by_content_not_insertion_order() {
        let forward: LabelSet = [("unit", "mediamtx"), ("source", "journald")]
            .into_iter()
            .collect();
        let reverse: LabelSet = [("source", "journald"), ("unit", "mediamtx")]
            .into_iter()
            .collect();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn merged_prefers_entry_labels_over_base() {
        let base = LabelSet::new().with("host", "pi1").with("action", "startup");
        let entry = LabelSet::new().with("action", "restart");
        let merged = base.merged(&entry);
        assert_eq!(merged.get("action"), Some("restart"));
        assert_eq!(merged.get("host"), Some("pi1"));
    }

    #[test]
    fn label_set_serializes_as_json_object() {
        let labels = LabelSet::new().with("job", "test").with("host", "pi1");
        let json = serde_json::to_string(&labels).expect("serialize");
        assert_eq!(json, r#"{"host":"pi1","job":"test"}"#);
    }

    #[test]
    fn entry_builder_attaches_labels() {
        let entry = LogEntry::new(Level::Error, "restarting").with_label("action", "restart");
        assert_eq!(entry.labels.get("action"), Some("restart"));
    }

    #[test]
    fn batch_dedup_is_keyed_on_label_name() {
        let batch = EventBatch::new(vec![
            ("person".to_string(), 0.91),
            ("dog".to_string(), 0.74),
        ]);
        let mut seen = HashSet::new();
        seen.insert("person".to_string());
        let novel = batch.novel_since(&seen);
        assert_eq!(novel.events(), &[("dog".to_string(), 0.74)]);
        // A changed confidence for a seen label is still suppressed.
        let repriced = EventBatch::new(vec![("person".to_string(), 0.55)]);
        assert!(repriced.novel_since(&seen).is_empty());
    }
}
