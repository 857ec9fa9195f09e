use async_trait::async_trait;

use docbase_types::{Constraint, Document, DocumentPath, Fields, WriteData};

use crate::error::StoreResult;
use crate::watch::{Snapshot, Subscription, WatchTarget};

/// Remote document database addressed by `(collection, id)`.
///
/// All implementations must satisfy these invariants:
/// - `get` on a missing document returns `Ok(None)`.
/// - `set` replaces the whole body; `update` merges into an existing one and
///   fails with [`crate::StoreError::Missing`] if there is none.
/// - `delete` is unconditional and succeeds for missing documents.
/// - Stored bodies never contain the `id` field.
/// - `watch` never fails synchronously: establishment and transport
///   failures arrive as the single error item of the returned subscription.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document body.
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>>;

    /// Write a full body, creating or replacing the document.
    async fn set(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()>;

    /// Partially merge `data` into an existing document.
    async fn update(&self, path: &DocumentPath, data: &WriteData) -> StoreResult<()>;

    /// Remove a document.
    async fn delete(&self, path: &DocumentPath) -> StoreResult<()>;

    /// Scan a collection under the given constraints.
    async fn query(
        &self,
        collection: &str,
        constraints: &[Constraint],
    ) -> StoreResult<Vec<Document>>;

    /// Open a live feed of a document or a query result set.
    ///
    /// The current state is queued before this returns.
    fn watch(&self, target: WatchTarget) -> Subscription<Snapshot>;

    /// Mint a fresh document id.
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
