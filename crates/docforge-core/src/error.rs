use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Encryption is not supported by this build")]
    EncryptionUnsupported,

    #[error("Failed to save PDF: {0}")]
    SaveError(String),
}

impl DocumentError {
    /// True when the caller supplied a selection that resolves to nothing usable.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DocumentError::InvalidSelection(_))
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
