use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("max-cpu-usage must be within 1..=100, got {0}")]
    MaxCpuUsage(usize),

    #[error("multihash-factor must be within 0..={max}, got {value}")]
    HashFactor { value: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
