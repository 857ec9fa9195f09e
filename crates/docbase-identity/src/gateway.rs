use async_trait::async_trait;
use docbase_types::{IdToken, Uid};

use crate::error::AuthResult;

/// A signed-in user as seen by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub uid: Uid,
    pub email: String,
}

/// Client-side identity service.
///
/// Holds at most one current session. Implementations talk to a remote
/// identity provider; [`crate::LocalIdentityService`] is the in-process one.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// Sign in to an existing account, replacing any current session.
    async fn log_in(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// End the current session. A no-op when nobody is signed in.
    async fn sign_out(&self) -> AuthResult<()>;

    /// The current session, if any.
    async fn current_user(&self) -> Option<Session>;

    /// An id token for the current session.
    ///
    /// Returns `Ok(None)` when nobody is signed in. With `force_refresh` a new
    /// token is always minted; otherwise a still-valid cached one may be
    /// returned.
    async fn get_id_token(&self, force_refresh: bool) -> AuthResult<Option<IdToken>>;
}

/// Server-side credential check.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a presented token and return its subject.
    async fn verify_token(&self, token: &IdToken) -> AuthResult<Uid>;
}
