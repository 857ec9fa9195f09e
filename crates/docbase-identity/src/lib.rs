//! Identity gateway for docbase.
//!
//! Exchanges credentials for verified subject identifiers. The client side
//! talks to an [`IdentityGateway`] (sign-up, log-in, id tokens); the server
//! side only needs a [`TokenVerifier`].
//!
//! Tokens are `hex(claims).hex(signature)` with an Ed25519 signature over the
//! encoded claims. [`LocalIdentityService`] issues them in-process and plays
//! the role of the auth emulator; [`ServiceAccountVerifier`] checks them with
//! nothing but the service account's key material.

pub mod error;
pub mod gateway;
pub mod local;
pub mod password;
pub mod service_account;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use gateway::{IdentityGateway, Session, TokenVerifier};
pub use local::LocalIdentityService;
pub use password::PasswordDigest;
pub use service_account::{ServiceAccount, ServiceAccountVerifier};
pub use token::{TokenClaims, TokenSigner};
