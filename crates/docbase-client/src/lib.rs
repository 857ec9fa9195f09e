//! Client facade for docbase.
//!
//! Runs in an untrusted context. [`Client`] bootstraps a session from the
//! identity service, then reads, writes and watches documents directly
//! through the store adapter. It never checks identity before a write and
//! never stamps provenance; use the server facade for authorization-gated
//! writes.
//!
//! Subscriptions are `futures::Stream`s. Callers that prefer callbacks use
//! [`Subscription::spawn_callbacks`], which returns the [`CancelHandle`].

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::Client;
pub use config::{ClientConfig, EmulatorConfig, StoreConnection};
pub use error::{ClientError, ClientResult};
pub use session::SessionState;

// Re-export the constraint and write vocabulary
pub use docbase_identity::{AuthError, Session};
pub use docbase_store::{CancelHandle, StoreError, Subscription};
pub use docbase_types::{
    limit, order_by, where_field, Constraint, Direction, FieldTransform, FilterOp, WriteData,
};
