use sitelens_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    NoInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
