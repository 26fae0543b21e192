//! # CellKit
//!
//! A transactional undo/redo engine for hierarchical, cell-based design
//! editors. Every mutating command opens a transaction, records the object and
//! property changes it makes, and commits; committed transactions can be
//! undone and redone at arbitrary depth while design-rule checking, net
//! extraction, schematic connectivity, selection and redisplay are kept in
//! step through injected collaborators.
//!
//! ## Architecture
//!
//! CellKit is organized as a workspace with multiple crates:
//!
//! 1. **cellkit-core** - Geometry, error types, type aliases, event bus
//! 2. **cellkit-db** - The design database: cells, objects, properties
//! 3. **cellkit-settings** - Configuration files (JSON / TOML)
//! 4. **cellkit-undo** - Transactions, commit, undo, redo, collaborators
//! 5. **cellkit** - This facade

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

pub use cellkit_core as core;
pub use cellkit_db as db;
pub use cellkit_settings as settings;
pub use cellkit_undo as undo;

pub use cellkit_core::{
    Bounds, CollaboratorError, DatabaseError, DiagnosticEvent, DiagnosticKind, EditorEvent, Error,
    EventBus, EventFilter, HistoryEvent, Point, Result, StatusEvent,
};
pub use cellkit_db::{
    Cell, CellId, CellKind, Database, DesignObject, Layer, ObjectId, ObjectKind, ObjectState,
    Property, PropertyId, PropertyKind, PropertyOwner,
};
pub use cellkit_settings::{Config, DisplaySettings, UndoSettings};
pub use cellkit_undo::{
    ChangeRecorder, Collaborators, OpFlags, OperationGroup, SavedState, TransactionEngine,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// Fails if a global subscriber is already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("installing the tracing subscriber")?;

    Ok(())
}

/// Builds a transaction engine from the configuration file at `path`, or
/// from the defaults if the file does not exist.
pub fn engine_from_file(
    path: &Path,
    collaborators: Collaborators,
    events: Arc<EventBus>,
) -> anyhow::Result<TransactionEngine> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    tracing::debug!(
        "Undo history length {} (debug checks: {})",
        config.undo.history_length,
        config.undo.debug_queue_check
    );
    Ok(TransactionEngine::from_config(&config, collaborators, events))
}
