//! Foundation types for docbase.
//!
//! Every other docbase crate depends on `docbase-types`. Nothing in here
//! performs I/O; these are the values that flow between the facades, the
//! document store and the identity service.
//!
//! # Key Types
//!
//! - [`DocumentPath`] -- `(collection, id)` address of a document
//! - [`Document`] -- a stored body plus the path it was read from
//! - [`WriteData`] -- a write payload with optional array transforms
//! - [`Constraint`] -- opaque filter/order/limit terms for collection queries
//! - [`Uid`] / [`IdToken`] -- verified subject and the bearer credential
//! - [`Timestamp`] -- wall-clock milliseconds since the UNIX epoch

pub mod constraint;
pub mod document;
pub mod error;
pub mod identity;
pub mod path;
pub mod timestamp;
pub mod write;

pub use constraint::{limit, order_by, where_field, Constraint, Direction, FilterOp};
pub use document::{Document, Fields, Provenance, CREATED_AT_FIELD, CREATED_BY_FIELD, ID_FIELD};
pub use error::TypeError;
pub use identity::{IdToken, Uid};
pub use path::{validate_segment, DocumentPath};
pub use timestamp::Timestamp;
pub use write::{FieldTransform, WriteData};
