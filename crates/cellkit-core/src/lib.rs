//! # CellKit Core
//!
//! Core types shared by every CellKit crate: database-unit geometry,
//! the umbrella error type, the editor event bus that stands in for the
//! status line, and a handful of shared-ownership aliases.

pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod types;

pub use error::{CollaboratorError, DatabaseError, Error, Result};
pub use event_bus::{
    DiagnosticEvent, DiagnosticKind, EditorEvent, EventBus, EventBusConfig, EventCategory, EventFilter,
    HistoryEvent, StatusEvent, SubscriptionId,
};
pub use geometry::{Bounds, Coord, Point};
pub use types::{
    thread_safe, thread_safe_rw_map, thread_safe_vec, ThreadSafe, ThreadSafeRwMap, ThreadSafeVec,
};
