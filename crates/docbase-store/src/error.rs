use docbase_types::{DocumentPath, TypeError};

/// Errors from document store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or reported a fault. Carried verbatim.
    #[error("transport error: {0}")]
    Transport(String),

    /// An update targeted a document that does not exist.
    #[error("no document at {0}")]
    Missing(DocumentPath),

    #[error("invalid document path: {0}")]
    InvalidPath(String),

    /// A body could not be encoded or decoded into the requested type.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<TypeError> for StoreError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::InvalidPath(msg) => Self::InvalidPath(msg),
            other => Self::Serialization(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
