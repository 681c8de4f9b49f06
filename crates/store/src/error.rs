use thiserror::Error;

/// Errors raised by the document store and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Serialization encode error: {0}")]
    Encode(String),
    #[error("Serialization decode error: {0}")]
    Decode(String),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("'{0}' is not a valid identifier, it must be a 24-character hex string")]
    InvalidId(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("duplicate key error: _id {0} already exists")]
    DuplicateKey(String),
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Whether the failure was caused by the caller's input rather than the store itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidId(_)
                | StoreError::InvalidDocument(_)
                | StoreError::InvalidFilter(_)
                | StoreError::DuplicateKey(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Compression(e.to_string())
    }
}
