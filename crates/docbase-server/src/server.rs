use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info};

use docbase_identity::TokenVerifier;
use docbase_store::{DocumentAdapter, DocumentStore, Resolution};
use docbase_types::{Document, IdToken, Provenance, Uid, WriteData};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::hooks::{DatabaseConfig, HookContext, HookResult};
use crate::request::{DbDeleteRequest, DbUpdateRequest};
use crate::router::build_router;

/// Trusted-context facade.
///
/// Every privileged call resolves the caller's identity from the token it
/// carries; nothing is cached between calls.
pub struct Server {
    config: ServerConfig,
    verifier: Arc<dyn TokenVerifier>,
    adapter: DocumentAdapter,
    database: DatabaseConfig,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn DocumentStore>,
        database: DatabaseConfig,
    ) -> Self {
        Self {
            config,
            verifier,
            adapter: DocumentAdapter::new(store),
            database,
        }
    }

    /// A server that verifies tokens with the configured service account.
    pub fn from_config(
        config: ServerConfig,
        store: Arc<dyn DocumentStore>,
        database: DatabaseConfig,
    ) -> ServerResult<Self> {
        let verifier = Arc::new(config.service_account.verifier()?);
        Ok(Self::new(config, verifier, store, database))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    /// Resolve a presented token to a uid.
    ///
    /// An absent or blank token is `Ok(None)`; a token that fails
    /// verification is [`ServerError::InvalidCredential`].
    pub async fn authenticate(&self, token: Option<&str>) -> ServerResult<Option<Uid>> {
        let Some(token) = token.map(|t| IdToken::new(t)).filter(|t| !t.is_blank()) else {
            return Ok(None);
        };
        let uid = self.verifier.verify_token(&token).await?;
        debug!(%uid, "token verified");
        Ok(Some(uid))
    }

    /// Fetch a document; absence is [`ServerError::NotFound`].
    pub async fn db_get(&self, collection: &str, id: &str) -> ServerResult<Document> {
        self.adapter
            .get(collection, id)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("/{collection}/{id}")))
    }

    /// Authorization-gated create-or-update.
    ///
    /// Runs, in order: identity check, request validation, the collection's
    /// `sanitize` hook, branch resolution, `before_create` or
    /// `before_update`, the write, and a re-read of the stored document.
    /// Provenance is stamped on the create branch only. No store call is
    /// made for an anonymous caller.
    pub async fn db_update(&self, request: DbUpdateRequest) -> ServerResult<Document> {
        let uid = self.require_identity(request.id_token.as_deref()).await?;

        let collection = required(request.collection_id, "collectionId")?;
        let data = request
            .data
            .ok_or_else(|| ServerError::BadRequest("missing property \"data\"".into()))?;
        let data = WriteData::from_serialize(&data)
            .map_err(|e| ServerError::BadRequest(format!("\"data\": {e}")))?;

        let hooks = self.database.hooks_for(&collection);
        let data = hooks.sanitize(data);

        let resolution = self.adapter.resolve(&collection, request.id.as_deref()).await?;
        let ctx = HookContext {
            collection: &collection,
            id: resolution.path().id(),
            uid: &uid,
            data: Some(&data),
            existing: match &resolution {
                Resolution::Update(doc) => Some(doc),
                Resolution::Create(_) => None,
            },
        };
        let verdict = if resolution.is_create() {
            hooks.before_create(ctx).await?
        } else {
            hooks.before_update(ctx).await?
        };
        reject_if(&collection, verdict)?;

        let provenance = Provenance::now(uid.clone());
        let outcome = self.adapter.apply(&resolution, &data, Some(&provenance)).await?;
        info!(
            %collection,
            id = %outcome.id,
            created = outcome.created,
            %uid,
            "db update"
        );

        self.db_get(&collection, &outcome.id).await
    }

    /// Authorization-gated delete. Missing documents are not an error.
    pub async fn db_delete(&self, request: DbDeleteRequest) -> ServerResult<()> {
        let uid = self.require_identity(request.id_token.as_deref()).await?;
        let collection = required(request.collection_id, "collectionId")?;
        let id = required(request.id, "id")?;

        let existing = self.adapter.get(&collection, &id).await?;
        let verdict = self
            .database
            .hooks_for(&collection)
            .before_delete(HookContext {
                collection: &collection,
                id: &id,
                uid: &uid,
                data: None,
                existing: existing.as_ref(),
            })
            .await?;
        reject_if(&collection, verdict)?;

        self.adapter.delete(&collection, &id).await?;
        info!(%collection, %id, %uid, existed = existing.is_some(), "db delete");
        Ok(())
    }

    async fn require_identity(&self, token: Option<&str>) -> ServerResult<Uid> {
        self.authenticate(token)
            .await?
            .ok_or(ServerError::PermissionDenied)
    }

    /// Build the HTTP router over this server.
    pub fn router(self: &Arc<Self>) -> axum::Router {
        build_router(Arc::clone(self))
    }

    /// Start serving requests.
    pub async fn serve(self: Arc<Self>) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("docbase server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, name: &str) -> ServerResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest(format!("missing property \"{name}\"")))
}

fn reject_if(collection: &str, verdict: HookResult) -> ServerResult<()> {
    match verdict {
        HookResult::Allow => Ok(()),
        HookResult::Reject { reason } => Err(ServerError::Rejected {
            collection: collection.to_string(),
            reason,
        }),
    }
}
