use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use docbase_identity::{AuthResult, IdentityGateway, LocalIdentityService, Session, TokenSigner};
use docbase_store::{DocumentAdapter, DocumentStore, InMemoryDocumentStore, Subscription};
use docbase_types::{Constraint, WriteData};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::session::SessionState;

/// Untrusted-context facade over the document store and identity service.
///
/// Writes go straight to the store: no identity is checked and no
/// provenance is stamped. Access control belongs to the store's own rules
/// or to the server facade.
pub struct Client {
    config: ClientConfig,
    identity: Arc<dyn IdentityGateway>,
    adapter: DocumentAdapter,
    session: RwLock<SessionState>,
}

impl Client {
    pub fn new(
        config: ClientConfig,
        identity: Arc<dyn IdentityGateway>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        if config.use_emulator {
            info!(
                project = %config.connection.project_id,
                store = %config.emulator.store_endpoint(),
                auth = %config.emulator.auth_url(),
                "client using emulators"
            );
        }
        Self {
            config,
            identity,
            adapter: DocumentAdapter::new(store),
            session: RwLock::new(SessionState::Anonymous),
        }
    }

    /// A client over fresh in-process backends.
    pub fn in_memory(config: ClientConfig) -> Self {
        let signer = TokenSigner::generate(config.connection.project_id.clone());
        let identity = Arc::new(LocalIdentityService::new(signer));
        let store = Arc::new(InMemoryDocumentStore::new());
        Self::new(config, identity, store)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The cached session, without consulting the identity service.
    pub fn session(&self) -> SessionState {
        self.session.read().expect("session lock poisoned").clone()
    }

    // ---- Identity ----

    /// Bring the cached session in line with the identity service.
    ///
    /// With nobody signed in the cache is cleared and `Anonymous` returned.
    /// A cached token for the current user is reused as is; otherwise a
    /// freshly minted one is cached. Tokens are never refreshed ahead of
    /// expiry.
    pub async fn authenticate(&self) -> AuthResult<SessionState> {
        let Some(user) = self.identity.current_user().await else {
            debug!("authenticate: no current user");
            return Ok(self.replace_session(SessionState::Anonymous));
        };

        if let SessionState::Authenticated { uid, .. } = &self.session() {
            if *uid == user.uid {
                return Ok(self.session());
            }
        }

        let state = match self.identity.get_id_token(true).await? {
            Some(token) => SessionState::Authenticated {
                uid: user.uid,
                token,
            },
            None => SessionState::Anonymous,
        };
        debug!(authenticated = state.is_authenticated(), "authenticate: session cached");
        Ok(self.replace_session(state))
    }

    /// Create an account and sign it in. Failures are logged and returned.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.identity
            .sign_up(email, password)
            .await
            .inspect(|session| info!(uid = %session.uid, "signed up"))
            .inspect_err(|e| warn!(error = %e, "sign-up failed"))
    }

    /// Sign in to an existing account. Failures are logged and returned.
    pub async fn log_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.identity
            .log_in(email, password)
            .await
            .inspect(|session| info!(uid = %session.uid, "logged in"))
            .inspect_err(|e| warn!(error = %e, "log-in failed"))
    }

    /// End the identity session and clear the cache.
    pub async fn sign_out(&self) -> AuthResult<()> {
        self.identity.sign_out().await?;
        self.replace_session(SessionState::Anonymous);
        Ok(())
    }

    fn replace_session(&self, state: SessionState) -> SessionState {
        *self.session.write().expect("session lock poisoned") = state.clone();
        state
    }

    // ---- Documents ----

    /// Fetch a document decoded as `T` (with `id` merged in).
    pub async fn get_item<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> ClientResult<Option<T>> {
        Ok(self.adapter.get_as(collection, id).await?)
    }

    /// Create-or-update. Returns the id that was written.
    pub async fn update_item(
        &self,
        collection: &str,
        id: Option<&str>,
        data: &WriteData,
    ) -> ClientResult<String> {
        let outcome = self
            .adapter
            .create_or_update(collection, id, data, None)
            .await?;
        Ok(outcome.id)
    }

    pub async fn delete_item(&self, collection: &str, id: &str) -> ClientResult<()> {
        Ok(self.adapter.delete(collection, id).await?)
    }

    /// Live feed of one document. `None` while it does not exist.
    pub fn watch_item<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Subscription<Option<T>> {
        self.adapter.watch_document(collection, id)
    }

    /// Live feed of a collection query. Constraints go to the store as is.
    pub fn watch_query<T: DeserializeOwned>(
        &self,
        collection: &str,
        constraints: Vec<Constraint>,
    ) -> Subscription<Vec<T>> {
        self.adapter.watch_query(collection, constraints)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("session", &self.session())
            .finish()
    }
}
