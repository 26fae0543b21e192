//! Event type definitions for the event bus.
//!
//! Events are cloneable and serializable so a host can log or replay them.

use serde::{Deserialize, Serialize};

/// Root event enum for all editor events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    /// User-facing status line messages
    Status(StatusEvent),
    /// Undo/redo history changes
    History(HistoryEvent),
    /// Logged diagnostics worth surfacing in a UI
    Diagnostic(DiagnosticEvent),
}

impl EditorEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            EditorEvent::Status(_) => EventCategory::Status,
            EditorEvent::History(_) => EventCategory::History,
            EditorEvent::Diagnostic(_) => EventCategory::Diagnostic,
        }
    }

    /// Get a short description of this event for logging
    pub fn description(&self) -> String {
        match self {
            EditorEvent::Status(e) => e.message(),
            EditorEvent::History(e) => e.description(),
            EditorEvent::Diagnostic(e) => e.description(),
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Status line messages.
    Status,
    /// History changes.
    History,
    /// Diagnostics.
    Diagnostic,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Status => write!(f, "Status"),
            EventCategory::History => write!(f, "History"),
            EventCategory::Diagnostic => write!(f, "Diagnostic"),
        }
    }
}

/// Status line messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEvent {
    /// Undo was requested with an empty undo stack.
    NothingToUndo,
    /// Redo was requested with an empty redo stack.
    NothingToRedo,
    /// A record was undone.
    Undone {
        /// Command name tag of the record.
        command: String,
        /// Name of the record's cell.
        cell: String,
    },
    /// A record was redone.
    Redone {
        /// Command name tag of the record.
        command: String,
        /// Name of the record's cell.
        cell: String,
    },
}

impl StatusEvent {
    /// Text as it would appear on the status line
    pub fn message(&self) -> String {
        match self {
            StatusEvent::NothingToUndo => "Nothing to undo".to_string(),
            StatusEvent::NothingToRedo => "Nothing to redo".to_string(),
            StatusEvent::Undone { command, cell } => format!("Undo {} in {}", command, cell),
            StatusEvent::Redone { command, cell } => format!("Redo {} in {}", command, cell),
        }
    }
}

/// History changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// A transaction was committed onto the undo stack.
    Committed {
        /// Command name tag.
        command: String,
        /// Name of the target cell.
        cell: String,
        /// Number of object and property changes in the record group.
        changes: usize,
    },
    /// Both stacks were discarded.
    Cleared,
    /// An editing session ended.
    Finalized {
        /// Whether the stacks were kept as holdover records.
        kept: bool,
    },
}

impl HistoryEvent {
    fn description(&self) -> String {
        match self {
            HistoryEvent::Committed {
                command,
                cell,
                changes,
            } => format!("Committed {} in {} ({} changes)", command, cell, changes),
            HistoryEvent::Cleared => "History cleared".to_string(),
            HistoryEvent::Finalized { kept } => {
                if *kept {
                    "History kept as holdover".to_string()
                } else {
                    "History discarded".to_string()
                }
            }
        }
    }
}

/// Diagnostic category, mirroring the engine's error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A caller broke the transaction protocol.
    Protocol,
    /// Duplicate or dangling change entries were repaired.
    Consistency,
    /// An external collaborator reported a failure.
    Collaborator,
}

/// A diagnostic surfaced to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// What kind of problem this is.
    pub kind: DiagnosticKind,
    /// Human readable message.
    pub message: String,
}

impl DiagnosticEvent {
    /// Create a new diagnostic
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn description(&self) -> String {
        format!("{:?}: {}", self.kind, self.message)
    }
}
