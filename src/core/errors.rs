//! CSM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, CsmError>;

/// Top-level error type for Camera Service Monitor.
#[derive(Debug, Error)]
pub enum CsmError {
    #[error("[CSM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CSM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CSM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CSM-2001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CSM-2101] push rejected by backend: status {status}")]
    PushStatus { status: u16 },

    #[error("[CSM-2102] push transport failure: {details}")]
    PushTransport { details: String },

    #[error("[CSM-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CSM-3002] signal handler registration failed: {details}")]
    Signal { details: String },

    #[error("[CSM-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl CsmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CSM-1001",
            Self::MissingConfig { .. } => "CSM-1002",
            Self::ConfigParse { .. } => "CSM-1003",
            Self::Serialization { .. } => "CSM-2001",
            Self::PushStatus { .. } => "CSM-2101",
            Self::PushTransport { .. } => "CSM-2102",
            Self::Io { .. } => "CSM-3001",
            Self::Signal { .. } => "CSM-3002",
            Self::Runtime { .. } => "CSM-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PushStatus { .. }
                | Self::PushTransport { .. }
                | Self::Io { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for CsmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for CsmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for CsmError {
    fn from(value: reqwest::Error) -> Self {
        Self::PushTransport {
            details: value.to_string(),
        }
    }
}
