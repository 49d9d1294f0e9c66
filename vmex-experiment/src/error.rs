use std::path::PathBuf;
use vmex_core::DeviceError;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("session directory {0} already exists and overwriting was declined")]
    DirectoryExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trial table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExperimentError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ExperimentError::Config(msg.into())
    }
}
