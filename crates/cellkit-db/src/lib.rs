//! # CellKit Design Database
//!
//! The design database referenced by the transaction engine: named cells
//! holding design objects and properties, where cells may instantiate other
//! cells.
//!
//! ## Lifetimes
//!
//! Nothing is destroyed implicitly. An object moves through
//! [`ObjectState`]s and is linked into or unlinked from its cell's live list;
//! only [`Database::destroy_object`] removes it for good. This is what lets
//! an undo record resurrect an object by id.
//!
//! ```text
//! create_object ──► Incomplete ──► Normal ◄──► Deleted (linked)
//!                                    ▲              │ unlink
//!                                    └── link ◄── Deleted (unlinked) ──► destroy
//! ```
//!
//! Ids come from one monotonically increasing counter and are never reused, so
//! a stale id can only miss.

pub mod cell;
pub mod database;
pub mod hyper;
pub mod ids;
pub mod object;
pub mod property;

pub use cell::{Cell, CellFlags, CellKind};
pub use cellkit_core::error::DatabaseError;
pub use database::Database;
pub use hyper::HyperLink;
pub use ids::{CellId, ObjectId, PropertyId};
pub use object::{DesignObject, Layer, ObjectKind, ObjectState};
pub use property::{Property, PropertyKind, PropertyOwner};

/// Result type alias for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
