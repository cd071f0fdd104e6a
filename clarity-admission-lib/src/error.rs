use thiserror::Error;

/// Errors that can occur in the admission service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("client key must not be empty")]
    InvalidKey,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<std::io::Error> for AdmissionError {
    fn from(e: std::io::Error) -> Self {
        AdmissionError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdmissionError>;
