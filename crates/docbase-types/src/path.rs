use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Address of a document: a collection name plus a document id.
///
/// Both segments must be non-empty and must not contain `/`. Nested
/// sub-collections are not modelled.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    /// Build a path, validating both segments.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Result<Self, TypeError> {
        let collection = collection.into();
        let id = id.into();
        validate_segment(&collection, "collection")?;
        validate_segment(&id, "document id")?;
        Ok(Self { collection, id })
    }

    /// The collection segment.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The document id segment.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Validate a single collection or id segment.
pub fn validate_segment(segment: &str, what: &str) -> Result<(), TypeError> {
    if segment.trim().is_empty() {
        return Err(TypeError::InvalidPath(format!("{what} must not be empty")));
    }
    if segment.contains('/') {
        return Err(TypeError::InvalidPath(format!(
            "{what} must not contain '/': {segment}"
        )));
    }
    Ok(())
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.collection, self.id)
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({self})")
    }
}
