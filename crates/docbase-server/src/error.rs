use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use docbase_identity::AuthError;
use docbase_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no document found at {0}")]
    NotFound(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("rejected by {collection} hooks: {reason}")]
    Rejected { collection: String, reason: String },

    #[error("store transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Self::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::PermissionDenied => "permission-denied",
            Self::BadRequest(_) => "bad-request",
            Self::InvalidCredential(_) => "invalid-credential",
            Self::Rejected { .. } => "rejected",
            Self::Transport(_) => "unavailable",
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Transport(msg) => Self::Transport(msg),
            StoreError::Missing(path) => Self::NotFound(path.to_string()),
            StoreError::InvalidPath(msg) => Self::BadRequest(msg),
            StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredential(msg) => Self::InvalidCredential(msg),
            AuthError::TokenExpired => Self::InvalidCredential("token expired".into()),
            AuthError::Transport(msg) => Self::Transport(msg),
            AuthError::InvalidServiceAccount(msg) => Self::Config(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
