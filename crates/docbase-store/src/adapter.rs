//! Create-or-update and typed subscriptions over any [`DocumentStore`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use docbase_types::{
    validate_segment, Constraint, Document, DocumentPath, Provenance, WriteData, CREATED_AT_FIELD,
    CREATED_BY_FIELD,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;
use crate::watch::{Snapshot, Subscription, WatchTarget};

/// Which branch a create-or-update takes.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The document exists; its current state is attached.
    Update(Document),
    /// The document does not exist (or no id was supplied) and will be
    /// written at this path.
    Create(DocumentPath),
}

impl Resolution {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Update(doc) => doc.path(),
            Self::Create(path) => path,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// Result of a create-or-update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    pub id: String,
    pub created: bool,
}

/// Document operations shared by both facades.
#[derive(Clone)]
pub struct DocumentAdapter {
    store: Arc<dyn DocumentStore>,
}

impl DocumentAdapter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fetch a document. Absence is `Ok(None)`.
    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let path = DocumentPath::new(collection, id)?;
        let fields = self.store.get(&path).await?;
        Ok(fields.map(|fields| Document::new(path, fields)))
    }

    /// Fetch and decode a document (with `id` merged in).
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<T>> {
        match self.get(collection, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    /// Decide between the update and create branches.
    ///
    /// A blank `id` counts as omitted. With no id a fresh one is minted by
    /// the store.
    pub async fn resolve(&self, collection: &str, id: Option<&str>) -> StoreResult<Resolution> {
        let Some(id) = id.filter(|id| !id.trim().is_empty()) else {
            let path = DocumentPath::new(collection, self.store.generate_id())?;
            return Ok(Resolution::Create(path));
        };

        let path = DocumentPath::new(collection, id)?;
        Ok(match self.store.get(&path).await? {
            Some(fields) => Resolution::Update(Document::new(path, fields)),
            None => Resolution::Create(path),
        })
    }

    /// Write `data` according to `resolution`.
    ///
    /// The update branch merges into the existing body and leaves metadata
    /// alone: when `provenance` is given, any `createdBy`/`createdAt` keys in
    /// `data` are dropped so the original stamp survives. The create branch
    /// writes the full body and stamps `provenance` when given. If the
    /// document vanished after `resolve`, the update branch fails with
    /// [`crate::StoreError::Missing`].
    pub async fn apply(
        &self,
        resolution: &Resolution,
        data: &WriteData,
        provenance: Option<&Provenance>,
    ) -> StoreResult<WriteOutcome> {
        match resolution {
            Resolution::Update(existing) => {
                if provenance.is_some() {
                    let data = data
                        .clone()
                        .without(CREATED_BY_FIELD)
                        .without(CREATED_AT_FIELD);
                    self.store.update(existing.path(), &data).await?;
                } else {
                    self.store.update(existing.path(), data).await?;
                }
                debug!(path = %existing.path(), "merged into existing document");
                Ok(WriteOutcome {
                    id: existing.id().to_string(),
                    created: false,
                })
            }
            Resolution::Create(path) => {
                let mut body = data.to_body();
                if let Some(provenance) = provenance {
                    provenance.stamp(&mut body);
                }
                self.store.set(path, body).await?;
                debug!(%path, stamped = provenance.is_some(), "created document");
                Ok(WriteOutcome {
                    id: path.id().to_string(),
                    created: true,
                })
            }
        }
    }

    /// Update the document if `id` names an existing one, otherwise create
    /// it.
    ///
    /// The existence check and the write are two separate store calls.
    /// Two first writers racing on the same id both take the create branch
    /// and the last `set` wins.
    pub async fn create_or_update(
        &self,
        collection: &str,
        id: Option<&str>,
        data: &WriteData,
        provenance: Option<&Provenance>,
    ) -> StoreResult<WriteOutcome> {
        let resolution = self.resolve(collection, id).await?;
        self.apply(&resolution, data, provenance).await
    }

    /// Unconditional delete; a missing document is not an error.
    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let path = DocumentPath::new(collection, id)?;
        self.store.delete(&path).await
    }

    /// Query a collection once.
    pub async fn query(
        &self,
        collection: &str,
        constraints: &[Constraint],
    ) -> StoreResult<Vec<Document>> {
        self.store.query(collection, constraints).await
    }

    /// Live feed of one document, decoded into `T`. `None` while absent.
    ///
    /// An invalid path is delivered as the subscription's only item.
    pub fn watch_document<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Subscription<Option<T>> {
        let target = DocumentPath::new(collection, id).map(WatchTarget::Document);
        self.watch(target.map_err(Into::into)).map_snapshots(decode_document::<T>)
    }

    /// Live feed of a collection query, decoded into `T`.
    pub fn watch_query<T: DeserializeOwned>(
        &self,
        collection: &str,
        constraints: Vec<Constraint>,
    ) -> Subscription<Vec<T>> {
        let target = validate_segment(collection, "collection").map(|_| WatchTarget::Query {
            collection: collection.to_string(),
            constraints,
        });
        self.watch(target.map_err(Into::into)).map_snapshots(decode_query::<T>)
    }

    fn watch(&self, target: StoreResult<WatchTarget>) -> Subscription<Snapshot> {
        match target {
            Ok(target) => self.store.watch(target),
            Err(e) => Subscription::failed(e),
        }
    }
}

impl std::fmt::Debug for DocumentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAdapter").finish_non_exhaustive()
    }
}

fn decode_document<T: DeserializeOwned>(snapshot: Snapshot) -> StoreResult<Option<T>> {
    match snapshot {
        Snapshot::Document(Some(doc)) => Ok(Some(doc.decode()?)),
        Snapshot::Document(None) => Ok(None),
        Snapshot::Query(_) => Err(StoreError::Serialization(
            "expected a document snapshot".into(),
        )),
    }
}

fn decode_query<T: DeserializeOwned>(snapshot: Snapshot) -> StoreResult<Vec<T>> {
    match snapshot {
        Snapshot::Query(docs) => docs
            .iter()
            .map(|doc| doc.decode().map_err(Into::into))
            .collect(),
        Snapshot::Document(_) => Err(StoreError::Serialization(
            "expected a query snapshot".into(),
        )),
    }
}
