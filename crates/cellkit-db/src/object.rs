//! Design objects.

use crate::ids::{CellId, ObjectId, PropertyId};
use cellkit_core::Bounds;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a design object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectState {
    #[default]
    Normal,
    /// Soft-deleted: invisible, kept so undo can bring it back.
    Deleted,
    /// Still being constructed by a command.
    Incomplete,
    /// Live but not selectable.
    Internal,
}

impl ObjectState {
    /// Normal or internal.
    pub fn is_live(self) -> bool {
        matches!(self, ObjectState::Normal | ObjectState::Internal)
    }
}

/// What a design object is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Shape,
    Wire,
    Label,
    /// An instance of another cell.
    Instance { master: CellId },
}

impl ObjectKind {
    pub fn is_instance(&self) -> bool {
        matches!(self, ObjectKind::Instance { .. })
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, ObjectKind::Wire)
    }

    /// Master cell of an instance.
    pub fn master(&self) -> Option<CellId> {
        match self {
            ObjectKind::Instance { master } => Some(*master),
            _ => None,
        }
    }
}

/// Drawing layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    /// Internal/derived layers never count as a user-visible modification.
    pub internal: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal: false,
        }
    }

    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal: true,
        }
    }
}

/// A geometric or instance entity living inside a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignObject {
    pub id: ObjectId,
    /// Owning cell.
    pub cell: CellId,
    pub kind: ObjectKind,
    pub layer: Layer,
    pub bounds: Bounds,
    pub state: ObjectState,
    /// Attached live properties, in link order.
    pub properties: Vec<PropertyId>,
}

impl DesignObject {
    pub fn is_instance(&self) -> bool {
        self.kind.is_instance()
    }
}
