//! Per-collection server hooks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use docbase_types::{Document, Uid, WriteData};

use crate::error::ServerResult;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookResult {
    Allow,
    Reject { reason: String },
}

impl HookResult {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }
}

/// What a hook sees of a privileged operation.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub collection: &'a str,
    /// Target id; on the create branch this is the id about to be written.
    pub id: &'a str,
    pub uid: &'a Uid,
    /// Payload of a write; `None` for deletes.
    pub data: Option<&'a WriteData>,
    /// Current state on the update branch and for deletes of existing
    /// documents.
    pub existing: Option<&'a Document>,
}

/// Hooks for one collection. Every method defaults to a pass-through.
#[async_trait]
pub trait CollectionHooks: Send + Sync {
    /// Rewrite a write payload before the branch is decided.
    fn sanitize(&self, data: WriteData) -> WriteData {
        data
    }

    async fn before_create(&self, _ctx: HookContext<'_>) -> ServerResult<HookResult> {
        Ok(HookResult::Allow)
    }

    async fn before_update(&self, _ctx: HookContext<'_>) -> ServerResult<HookResult> {
        Ok(HookResult::Allow)
    }

    async fn before_delete(&self, _ctx: HookContext<'_>) -> ServerResult<HookResult> {
        Ok(HookResult::Allow)
    }
}

pub struct NoOpHooks;

impl CollectionHooks for NoOpHooks {}

/// Hooks keyed by collection name. Unlisted collections get [`NoOpHooks`].
#[derive(Clone, Default)]
pub struct DatabaseConfig {
    collections: HashMap<String, Arc<dyn CollectionHooks>>,
}

impl DatabaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(
        mut self,
        name: impl Into<String>,
        hooks: impl CollectionHooks + 'static,
    ) -> Self {
        self.collections.insert(name.into(), Arc::new(hooks));
        self
    }

    pub fn hooks_for(&self, collection: &str) -> Arc<dyn CollectionHooks> {
        match self.collections.get(collection) {
            Some(hooks) => Arc::clone(hooks),
            None => Arc::new(NoOpHooks),
        }
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnly;

    #[async_trait]
    impl CollectionHooks for ReadOnly {
        async fn before_update(&self, _ctx: HookContext<'_>) -> ServerResult<HookResult> {
            Ok(HookResult::reject("read only"))
        }
    }

    fn ctx(uid: &Uid) -> HookContext<'_> {
        HookContext {
            collection: "c",
            id: "x",
            uid,
            data: None,
            existing: None,
        }
    }

    #[tokio::test]
    async fn noop_hooks_allow_everything() {
        let uid = Uid::new("u");
        let hooks = NoOpHooks;
        assert_eq!(hooks.before_create(ctx(&uid)).await.unwrap(), HookResult::Allow);
        assert_eq!(hooks.before_update(ctx(&uid)).await.unwrap(), HookResult::Allow);
        assert_eq!(hooks.before_delete(ctx(&uid)).await.unwrap(), HookResult::Allow);
        let data = WriteData::new().set("a", 1);
        assert_eq!(hooks.sanitize(data.clone()), data);
    }

    #[tokio::test]
    async fn unlisted_collections_fall_back_to_noop() {
        let uid = Uid::new("u");
        let db = DatabaseConfig::new().with_collection("locked", ReadOnly);
        assert_eq!(
            db.hooks_for("locked").before_update(ctx(&uid)).await.unwrap(),
            HookResult::reject("read only")
        );
        assert_eq!(
            db.hooks_for("open").before_update(ctx(&uid)).await.unwrap(),
            HookResult::Allow
        );
        assert_eq!(db.collections().collect::<Vec<_>>(), vec!["locked"]);
    }
}
