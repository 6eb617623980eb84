//! Log shipping: entry model and the shared best-effort Loki push client.

pub mod entry;
pub mod loki;

pub use entry::{EventBatch, LabelSet, Level, LogEntry};
pub use loki::LokiClient;
