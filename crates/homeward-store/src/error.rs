//! Error types for the store and collaborator boundary.

use std::path::PathBuf;

use homeward_core::EscalationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid state JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("invalid escalation config: {0}")]
    Escalation(#[from] EscalationError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A signal provider could not answer. Never fatal: the signal is treated
/// as absent for the tick.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed signal data: {0}")]
    Malformed(String),

    #[error("signal data is stale ({age_secs}s old)")]
    Stale { age_secs: i64 },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}
