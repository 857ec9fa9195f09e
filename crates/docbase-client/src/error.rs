use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("auth error: {0}")]
    Auth(#[from] docbase_identity::AuthError),

    #[error("store error: {0}")]
    Store(#[from] docbase_store::StoreError),

    #[error("type error: {0}")]
    Type(#[from] docbase_types::TypeError),

    #[error("invalid config: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
