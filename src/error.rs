use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TalonError>;

#[derive(Error, Debug)]
pub enum TalonError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("telegram rejected {method}: {description}")]
    TelegramApi { method: String, description: String },
}
