/// Errors from the identity gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Sign-up with an email that already has an account.
    #[error("email already in use: {0}")]
    EmailInUse(String),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("no account for {0}")]
    UserNotFound(String),

    #[error("wrong password")]
    WrongPassword,

    /// The token is malformed, forged, or issued for another project.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("token expired")]
    TokenExpired,

    /// Key material in a service account could not be used.
    #[error("invalid service account: {0}")]
    InvalidServiceAccount(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// The identity service could not be reached or returned a fault.
    #[error("identity transport error: {0}")]
    Transport(String),
}

/// Result alias for identity operations.
pub type AuthResult<T> = Result<T, AuthError>;
