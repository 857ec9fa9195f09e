//! Document store adapter for docbase.
//!
//! A document store is a remote key-value database addressed by
//! `(collection, id)`. This crate defines the [`DocumentStore`] seam,
//! ships an in-memory backend, and layers the create-or-update protocol and
//! live subscriptions on top in [`DocumentAdapter`].
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests, embedding
//!   and the local emulator
//!
//! # Design Rules
//!
//! 1. A missing document is `Ok(None)`, never an error.
//! 2. Deleting a missing document succeeds.
//! 3. A document body never stores its own id.
//! 4. Notifications for one subscription arrive in the order the store
//!    applied the mutations; nothing is promised across subscriptions.
//! 5. A subscription ends after its first error. Nothing is retried.
//! 6. Constraints are interpreted by the backend only.

pub mod adapter;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;
pub mod watch;

pub use adapter::{DocumentAdapter, Resolution, WriteOutcome};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;
pub use traits::DocumentStore;
pub use watch::{CancelHandle, Snapshot, Subscription, WatchRegistry, WatchTarget};
