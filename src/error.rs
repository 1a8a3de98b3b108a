use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Inconsistent document: {0}")]
    InconsistentDocument(String),

    #[error("Missing attachment: \"{0}\" has no metadata")]
    MissingAttachment(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Generic `put` on `_attachments`.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::Decode(format!("{}", e))
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
