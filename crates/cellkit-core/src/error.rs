//! Error handling for CellKit
//!
//! Provides the error types shared across the workspace:
//! - Database errors (cell/object/property lookups, naming)
//! - Collaborator errors (failures reported by external subsystems)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Design database error type
///
/// Raised by database lookups and constructors when an id does not resolve
/// or a cell name is already taken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// No cell with this id exists
    #[error("Unknown cell: {id}")]
    UnknownCell {
        /// The raw cell id.
        id: u64,
    },

    /// No design object with this id exists
    #[error("Unknown object: {id}")]
    UnknownObject {
        /// The raw object id.
        id: u64,
    },

    /// No property with this id exists
    #[error("Unknown property: {id}")]
    UnknownProperty {
        /// The raw property id.
        id: u64,
    },

    /// A cell with this name already exists
    #[error("Cell name already in use: {name}")]
    DuplicateCellName {
        /// The conflicting name.
        name: String,
    },

    /// The object does not belong to the given cell
    #[error("Object {object} does not belong to cell {cell}")]
    WrongCell {
        /// The raw object id.
        object: u64,
        /// The raw cell id that was expected to own it.
        cell: u64,
    },
}

/// Collaborator error type
///
/// Reported by an external subsystem (design-rule check, schematic
/// connectivity, instance services, ...) when it cannot complete a request.
/// The transaction engine logs these and carries on with best-effort results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// A label or other derived object could not be created
    #[error("{collaborator}: could not create {what}")]
    CreateFailed {
        /// Name of the reporting collaborator.
        collaborator: String,
        /// What could not be created.
        what: String,
    },

    /// The collaborator is not available in this build
    #[error("{collaborator} is unavailable")]
    Unavailable {
        /// Name of the missing collaborator.
        collaborator: String,
    },

    /// Generic collaborator failure
    #[error("{collaborator}: {reason}")]
    Failed {
        /// Name of the reporting collaborator.
        collaborator: String,
        /// Failure description.
        reason: String,
    },
}

impl CollaboratorError {
    /// Create a generic failure for the named collaborator
    pub fn failed(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        CollaboratorError::Failed {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// Name of the collaborator that reported the error
    pub fn collaborator(&self) -> &str {
        match self {
            CollaboratorError::CreateFailed { collaborator, .. }
            | CollaboratorError::Unavailable { collaborator }
            | CollaboratorError::Failed { collaborator, .. } => collaborator,
        }
    }
}

/// Main error type for CellKit
///
/// A unified error type that can represent any error from the shared layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Design database error
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Collaborator error
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a database error
    pub fn is_database_error(&self) -> bool {
        matches!(self, Error::Database(_))
    }

    /// Check if this is a collaborator error
    pub fn is_collaborator_error(&self) -> bool {
        matches!(self, Error::Collaborator(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
