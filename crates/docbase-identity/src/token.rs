use chrono::{Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use docbase_types::{IdToken, Uid};

use crate::error::{AuthError, AuthResult};

/// Claims carried inside an id token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject.
    pub sub: String,
    /// Audience: the project the token was issued for.
    pub aud: String,
    /// Issued-at, epoch milliseconds.
    pub iat: i64,
    /// Expiry, epoch milliseconds.
    pub exp: i64,
    /// Random token id so that refreshed tokens always differ.
    pub jti: String,
}

impl TokenClaims {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.exp
    }
}

/// Mints id tokens for a single project.
pub struct TokenSigner {
    key: SigningKey,
    audience: String,
    ttl: Duration,
}

impl TokenSigner {
    /// Default token lifetime.
    pub const DEFAULT_TTL_SECS: i64 = 3600;

    pub fn new(key: SigningKey, audience: impl Into<String>) -> Self {
        Self {
            key,
            audience: audience.into(),
            ttl: Duration::seconds(Self::DEFAULT_TTL_SECS),
        }
    }

    /// Signer with a freshly generated key.
    pub fn generate(audience: impl Into<String>) -> Self {
        let mut csprng = rand::thread_rng();
        Self::new(SigningKey::generate(&mut csprng), audience)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// The public half, for building verifiers.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Issue a token for `uid`, returning it with its claims.
    pub fn issue(&self, uid: &Uid) -> AuthResult<(IdToken, TokenClaims)> {
        let iat = Utc::now().timestamp_millis();
        let claims = TokenClaims {
            sub: uid.as_str().to_string(),
            aud: self.audience.clone(),
            iat,
            exp: iat + self.ttl.num_milliseconds(),
            jti: hex::encode(rand::random::<[u8; 8]>()),
        };
        let token = encode(&self.key, &claims)?;
        Ok((token, claims))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("audience", &self.audience)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Encode and sign claims.
pub fn encode(key: &SigningKey, claims: &TokenClaims) -> AuthResult<IdToken> {
    let body = serde_json::to_vec(claims)
        .map_err(|e| AuthError::InvalidCredential(format!("claims encoding: {e}")))?;
    let body_hex = hex::encode(body);
    let signature = key.sign(body_hex.as_bytes());
    Ok(IdToken::new(format!(
        "{body_hex}.{}",
        hex::encode(signature.to_bytes())
    )))
}

/// Check a token's signature, audience and expiry, returning its claims.
pub fn decode(key: &VerifyingKey, audience: &str, token: &IdToken) -> AuthResult<TokenClaims> {
    let (body_hex, sig_hex) = token
        .as_str()
        .split_once('.')
        .ok_or_else(|| AuthError::InvalidCredential("malformed token".into()))?;

    let sig_bytes = hex::decode(sig_hex)
        .map_err(|_| AuthError::InvalidCredential("malformed signature".into()))?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidCredential("malformed signature".into()))?;
    key.verify(body_hex.as_bytes(), &signature)
        .map_err(|_| AuthError::InvalidCredential("signature mismatch".into()))?;

    let body = hex::decode(body_hex)
        .map_err(|_| AuthError::InvalidCredential("malformed claims".into()))?;
    let claims: TokenClaims = serde_json::from_slice(&body)
        .map_err(|_| AuthError::InvalidCredential("malformed claims".into()))?;

    if claims.aud != audience {
        return Err(AuthError::InvalidCredential(format!(
            "token issued for project {}",
            claims.aud
        )));
    }
    if claims.is_expired_at(Utc::now().timestamp_millis()) {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_decode() {
        let signer = TokenSigner::generate("proj");
        let (token, claims) = signer.issue(&Uid::new("u1")).unwrap();
        let decoded = decode(&signer.verifying_key(), "proj", &token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.sub, "u1");
        assert_eq!(decoded.exp - decoded.iat, TokenSigner::DEFAULT_TTL_SECS * 1000);
    }

    #[test]
    fn refreshed_tokens_differ() {
        let signer = TokenSigner::generate("proj");
        let (a, _) = signer.issue(&Uid::new("u1")).unwrap();
        let (b, _) = signer.issue(&Uid::new("u1")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn foreign_key_is_rejected() {
        let signer = TokenSigner::generate("proj");
        let other = TokenSigner::generate("proj");
        let (token, _) = signer.issue(&Uid::new("u1")).unwrap();
        let err = decode(&other.verifying_key(), "proj", &token).unwrap_err();
        assert_eq!(err, AuthError::InvalidCredential("signature mismatch".into()));
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let signer = TokenSigner::generate("proj-a");
        let (token, _) = signer.issue(&Uid::new("u1")).unwrap();
        let err = decode(&signer.verifying_key(), "proj-b", &token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::generate("proj").with_ttl(Duration::milliseconds(-1));
        let (token, _) = signer.issue(&Uid::new("u1")).unwrap();
        let err = decode(&signer.verifying_key(), "proj", &token).unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let signer = TokenSigner::generate("proj");
        let (token, _) = signer.issue(&Uid::new("u1")).unwrap();
        let (_, sig) = token.as_str().split_once('.').unwrap();
        let forged_claims = TokenClaims {
            sub: "admin".into(),
            aud: "proj".into(),
            iat: 0,
            exp: i64::MAX,
            jti: "00".into(),
        };
        let forged_body = hex::encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = IdToken::new(format!("{forged_body}.{sig}"));
        assert!(decode(&signer.verifying_key(), "proj", &forged).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let signer = TokenSigner::generate("proj");
        for bad in ["", "nodot", "zz.zz", "abcd.00"] {
            let err = decode(&signer.verifying_key(), "proj", &IdToken::new(bad)).unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredential(_)), "{bad}: {err}");
        }
    }
}
