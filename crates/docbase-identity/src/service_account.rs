use async_trait::async_trait;
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use docbase_types::{IdToken, Uid};

use crate::error::{AuthError, AuthResult};
use crate::gateway::TokenVerifier;
use crate::token::{self, TokenSigner};

/// Credential object for the trusted server context.
///
/// `private_key` is the hex-encoded 32-byte Ed25519 secret of the project's
/// token issuer.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccount {
    /// A service account with freshly generated key material.
    pub fn generate(project_id: impl Into<String>, client_email: impl Into<String>) -> Self {
        let key = SigningKey::generate(&mut rand::thread_rng());
        Self {
            project_id: project_id.into(),
            client_email: client_email.into(),
            private_key: hex::encode(key.to_bytes()),
        }
    }

    pub fn signing_key(&self) -> AuthResult<SigningKey> {
        let bytes = hex::decode(self.private_key.trim())
            .map_err(|e| AuthError::InvalidServiceAccount(format!("private_key: {e}")))?;
        let secret: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            AuthError::InvalidServiceAccount(format!(
                "private_key must be 32 bytes, got {}",
                b.len()
            ))
        })?;
        Ok(SigningKey::from_bytes(&secret))
    }

    /// Token signer for this project (what the identity service holds).
    pub fn signer(&self) -> AuthResult<TokenSigner> {
        Ok(TokenSigner::new(self.signing_key()?, self.project_id.clone()))
    }

    /// Token verifier for this project (what the server holds).
    pub fn verifier(&self) -> AuthResult<ServiceAccountVerifier> {
        Ok(ServiceAccountVerifier::new(
            self.signing_key()?.verifying_key(),
            self.project_id.clone(),
        ))
    }
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Verifies id tokens against a project's public key.
#[derive(Clone, Debug)]
pub struct ServiceAccountVerifier {
    key: VerifyingKey,
    project_id: String,
}

impl ServiceAccountVerifier {
    pub fn new(key: VerifyingKey, project_id: impl Into<String>) -> Self {
        Self {
            key,
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for ServiceAccountVerifier {
    async fn verify_token(&self, token: &IdToken) -> AuthResult<Uid> {
        let claims = token::decode(&self.key, &self.project_id, token)?;
        Ok(Uid::new(claims.sub))
    }
}
