use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    ParseError(String),
}

impl From<quick_xml::Error> for ScanError {
    fn from(err: quick_xml::Error) -> Self {
        ScanError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
