use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use docbase_types::{Constraint, Document, DocumentPath, Fields, WriteData, ID_FIELD};

use crate::error::{StoreError, StoreResult};
use crate::query::run_query;
use crate::traits::DocumentStore;
use crate::watch::{Snapshot, Subscription, WatchRegistry, WatchTarget};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// In-memory, HashMap-based document store.
///
/// Intended for tests, embedding, and as the local emulator. Bodies are
/// cloned on read and write. Watchers are notified while the data lock is
/// still held, which fixes notification order to mutation order.
///
/// [`InMemoryDocumentStore::fail_transport`] simulates an unreachable store.
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    watchers: Arc<WatchRegistry>,
    fault: RwLock<Option<String>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            watchers: WatchRegistry::new(),
            fault: RwLock::new(None),
        }
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Make every subsequent call fail with [`StoreError::Transport`] and
    /// terminate all live subscriptions with that error.
    pub fn fail_transport(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "store transport failed");
        *self.fault.write().expect("lock poisoned") = Some(reason.clone());
        self.watchers.fail_all(&StoreError::Transport(reason));
    }

    /// Undo [`InMemoryDocumentStore::fail_transport`].
    pub fn restore_transport(&self) {
        *self.fault.write().expect("lock poisoned") = None;
    }

    fn check_transport(&self) -> StoreResult<()> {
        match self.fault.read().expect("lock poisoned").as_ref() {
            Some(reason) => Err(StoreError::Transport(reason.clone())),
            None => Ok(()),
        }
    }

    /// Apply `mutate` under the write lock and notify watchers of `path`.
    fn mutate<R>(
        &self,
        path: &DocumentPath,
        mutate: impl FnOnce(&mut Collections) -> StoreResult<R>,
    ) -> StoreResult<R> {
        self.check_transport()?;
        let mut collections = self.collections.write().expect("lock poisoned");
        let result = mutate(&mut *collections)?;
        self.watchers
            .notify(path, |target| snapshot_of(&*collections, target));
        Ok(result)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn documents_in(collections: &Collections, collection: &str) -> Vec<Document> {
    let Some(docs) = collections.get(collection) else {
        return Vec::new();
    };
    docs.iter()
        .filter_map(|(id, fields)| {
            let path = DocumentPath::new(collection, id.as_str()).ok()?;
            Some(Document::new(path, fields.clone()))
        })
        .collect()
}

fn snapshot_of(collections: &Collections, target: &WatchTarget) -> Snapshot {
    match target {
        WatchTarget::Document(path) => Snapshot::Document(
            collections
                .get(path.collection())
                .and_then(|docs| docs.get(path.id()))
                .map(|fields| Document::new(path.clone(), fields.clone())),
        ),
        WatchTarget::Query {
            collection,
            constraints,
        } => Snapshot::Query(run_query(documents_in(collections, collection), constraints)),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Fields>> {
        self.check_transport()?;
        let collections = self.collections.read().expect("lock poisoned");
        Ok(collections
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .cloned())
    }

    async fn set(&self, path: &DocumentPath, mut fields: Fields) -> StoreResult<()> {
        fields.remove(ID_FIELD);
        self.mutate(path, |collections| {
            collections
                .entry(path.collection().to_string())
                .or_default()
                .insert(path.id().to_string(), fields);
            Ok(())
        })?;
        debug!(%path, "document set");
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, data: &WriteData) -> StoreResult<()> {
        self.mutate(path, |collections| {
            let body = collections
                .get_mut(path.collection())
                .and_then(|docs| docs.get_mut(path.id()))
                .ok_or_else(|| StoreError::Missing(path.clone()))?;
            data.merge_into(body);
            body.remove(ID_FIELD);
            Ok(())
        })?;
        debug!(%path, "document updated");
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        let existed = self.mutate(path, |collections| {
            let Some(docs) = collections.get_mut(path.collection()) else {
                return Ok(false);
            };
            let existed = docs.remove(path.id()).is_some();
            if docs.is_empty() {
                collections.remove(path.collection());
            }
            Ok(existed)
        })?;
        debug!(%path, existed, "document deleted");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        constraints: &[Constraint],
    ) -> StoreResult<Vec<Document>> {
        self.check_transport()?;
        let collections = self.collections.read().expect("lock poisoned");
        Ok(run_query(documents_in(&collections, collection), constraints))
    }

    fn watch(&self, target: WatchTarget) -> Subscription<Snapshot> {
        if let Err(e) = self.check_transport() {
            return self.watchers.register(target, Err(e));
        }
        // Holding the data lock across registration keeps a concurrent
        // mutation from slipping in between the initial state and the first
        // notification.
        let collections = self.collections.read().expect("lock poisoned");
        let initial = snapshot_of(&collections, &target);
        self.watchers.register(target, Ok(initial))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .field("watchers", &self.watcher_count())
            .finish()
    }
}
