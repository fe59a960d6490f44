use std::path::PathBuf;

use thiserror::Error;

/// Why a poll of the now-playing endpoint failed.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Rasterize(#[from] anyhow::Error),

    #[error("failed to write snapshot to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got {value:?}")]
    InvalidMillis { var: &'static str, value: String },
}
