//! In-process identity service.
//!
//! [`LocalIdentityService`] keeps accounts in a `HashMap` behind a `RwLock`
//! and signs tokens with a [`TokenSigner`]. It stands in for the remote auth
//! emulator in tests and in the dev host.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use docbase_types::{IdToken, Uid};

use crate::error::{AuthError, AuthResult};
use crate::gateway::{IdentityGateway, Session, TokenVerifier};
use crate::password::PasswordDigest;
use crate::service_account::{ServiceAccount, ServiceAccountVerifier};
use crate::token::{self, TokenClaims, TokenSigner};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: Uid,
    email: String,
    password: PasswordDigest,
}

struct ActiveSession {
    session: Session,
    token: Option<(IdToken, TokenClaims)>,
}

/// Account table plus a single current session.
pub struct LocalIdentityService {
    signer: TokenSigner,
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<ActiveSession>>,
}

impl LocalIdentityService {
    pub fn new(signer: TokenSigner) -> Self {
        Self {
            signer,
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
        }
    }

    /// Service whose tokens verify against `account`.
    pub fn for_service_account(account: &ServiceAccount) -> AuthResult<Self> {
        Ok(Self::new(account.signer()?))
    }

    /// A verifier for tokens issued by this service.
    pub fn verifier(&self) -> ServiceAccountVerifier {
        ServiceAccountVerifier::new(self.signer.verifying_key(), self.signer.audience())
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.read().expect("accounts lock poisoned").len()
    }

    fn start_session(&self, uid: Uid, email: String) -> Session {
        let session = Session { uid, email };
        *self.current.write().expect("session lock poisoned") = Some(ActiveSession {
            session: session.clone(),
            token: None,
        });
        session
    }
}

impl std::fmt::Debug for LocalIdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityService")
            .field("audience", &self.signer.audience())
            .field("accounts", &self.account_count())
            .finish()
    }
}

fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email))
    }
}

#[async_trait]
impl IdentityGateway for LocalIdentityService {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Session> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let digest = PasswordDigest::new(password)?;
        let uid = Uid::new(uuid::Uuid::new_v4().simple().to_string());
        {
            let mut accounts = self.accounts.write().expect("accounts lock poisoned");
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse(email));
            }
            accounts.insert(
                email.clone(),
                Account {
                    uid: uid.clone(),
                    email: email.clone(),
                    password: digest,
                },
            );
        }

        info!(uid = %uid, "account created");
        Ok(self.start_session(uid, email))
    }

    async fn log_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let email = normalize_email(email)?;
        let (uid, email) = {
            let accounts = self.accounts.read().expect("accounts lock poisoned");
            let account = accounts
                .get(&email)
                .ok_or_else(|| AuthError::UserNotFound(email.clone()))?;
            if !account.password.verify(password) {
                return Err(AuthError::WrongPassword);
            }
            (account.uid.clone(), account.email.clone())
        };

        debug!(uid = %uid, "signed in");
        Ok(self.start_session(uid, email))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if let Some(active) = self.current.write().expect("session lock poisoned").take() {
            debug!(uid = %active.session.uid, "signed out");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<Session> {
        self.current
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|active| active.session.clone())
    }

    async fn get_id_token(&self, force_refresh: bool) -> AuthResult<Option<IdToken>> {
        let mut current = self.current.write().expect("session lock poisoned");
        let Some(active) = current.as_mut() else {
            return Ok(None);
        };

        if !force_refresh {
            if let Some((token, claims)) = &active.token {
                if !claims.is_expired_at(Utc::now().timestamp_millis()) {
                    return Ok(Some(token.clone()));
                }
            }
        }

        let (token, claims) = self.signer.issue(&active.session.uid)?;
        debug!(uid = %active.session.uid, exp = claims.exp, "issued id token");
        active.token = Some((token.clone(), claims));
        Ok(Some(token))
    }
}

#[async_trait]
impl TokenVerifier for LocalIdentityService {
    async fn verify_token(&self, token: &IdToken) -> AuthResult<Uid> {
        let claims = token::decode(&self.signer.verifying_key(), self.signer.audience(), token)?;
        Ok(Uid::new(claims.sub))
    }
}
