//! # CellKit Undo
//!
//! The transactional undo/redo engine that sits underneath every mutating
//! editor command.
//!
//! - [`change`]: object and property change entries, and the push-only list
//!   background recorders append to
//! - [`operation`]: operation records and record groups
//! - [`history`]: bounded undo and redo stacks
//! - [`trash`]: deferred hard deletions
//! - [`collaborators`]: interfaces to design-rule checking, extraction,
//!   schematic connectivity, selection, display and scripting
//! - [`engine`]: begin / record / commit / undo / redo
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cellkit_core::{Bounds, EventBus};
//! use cellkit_db::{CellKind, Database, Layer, ObjectKind};
//! use cellkit_settings::Config;
//! use cellkit_undo::{Collaborators, TransactionEngine};
//!
//! let mut db = Database::new();
//! let cell = db.create_cell("inv", CellKind::Physical).unwrap();
//! let mut engine = TransactionEngine::from_config(
//!     &Config::default(),
//!     Collaborators::default(),
//!     Arc::new(EventBus::new()),
//! );
//!
//! engine.begin_transaction(&mut db, "place", Some(cell), false);
//! let wire = db
//!     .create_object(cell, ObjectKind::Wire, Layer::new("metal1"), Bounds::new(0, 0, 4, 40))
//!     .unwrap();
//! engine.record_object_change(&mut db, cell, None, Some(wire));
//! assert!(engine.commit(&mut db, true, false));
//!
//! assert!(engine.undo(&mut db));
//! assert!(!db.cell_contains(cell, wire));
//! assert!(engine.redo(&mut db));
//! assert!(db.cell_contains(cell, wire));
//! ```

pub mod change;
pub mod collaborators;
pub mod engine;
pub mod history;
pub mod operation;
pub mod recorder;
pub mod trash;

pub use change::{ObjectChange, PropertyChange};
pub use collaborators::{
    Collaborators, DesignRuleCheck, DisplayMode, InstanceServices, NetExtraction, Noop, Redisplay,
    Schematic, Scripting, SelectionSet,
};
pub use engine::{RepairReport, SavedState, TransactionEngine};
pub use history::HistoryStack;
pub use operation::{HyperSnapshot, OpFlags, Operation, OperationGroup};
pub use recorder::ChangeRecorder;
pub use trash::TrashBin;
