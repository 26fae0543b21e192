//! Cells: named containers of design objects and properties.

use crate::ids::{CellId, ObjectId, PropertyId};
use bitflags::bitflags;
use cellkit_core::Bounds;
use serde::{Deserialize, Serialize};

/// Whether a cell holds schematic or layout data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Electrical,
    Physical,
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellKind::Electrical => write!(f, "electrical"),
            CellKind::Physical => write!(f, "physical"),
        }
    }
}

bitflags! {
    /// Persisted per-cell flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CellFlags: u32 {
        /// Net connectivity has been derived and is current.
        const CONNECTIVITY_KNOWN = 1 << 0;
        /// Derived geometry (instance boxes, terminals) is current.
        const DERIVED_KNOWN = 1 << 1;
        /// The cell is a parametrized sub-master.
        const SUB_MASTER = 1 << 2;
        /// Extraction must not modify the cell.
        const IMMUTABLE = 1 << 3;

        const USER_0 = 1 << 8;
        const USER_1 = 1 << 9;
        const USER_2 = 1 << 10;
        const USER_3 = 1 << 11;
        const USER_4 = 1 << 12;
        const USER_5 = 1 << 13;
        const USER_6 = 1 << 14;
        const USER_7 = 1 << 15;

        /// Bits that may only be carried forward while the live cell asserts them.
        const KNOWN = Self::CONNECTIVITY_KNOWN.bits() | Self::DERIVED_KNOWN.bits();
        /// Bits controlled by a cell-level flags property.
        const USER = 0xFF00;
    }
}

impl CellFlags {
    /// User bits encoded by a flags property value.
    pub fn from_user_value(value: u32) -> Self {
        CellFlags::from_bits_truncate(value << 8) & CellFlags::USER
    }
}

/// A named cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub name: String,
    pub kind: CellKind,
    /// Live (linked) objects, in link order.
    pub objects: Vec<ObjectId>,
    /// Live cell-level properties, in link order.
    pub properties: Vec<PropertyId>,
    /// Modification counter. Undo decrements it, so it is signed.
    pub modified: i64,
    pub flags: CellFlags,
    /// Set when this cell is the symbolic view of the given electrical cell.
    pub symbolic_of: Option<CellId>,
    /// Paired electrical/physical cell.
    pub twin: Option<CellId>,
    /// Whether the twin pairing reflects the current contents.
    pub associated: bool,
    pub bbox: Bounds,
}

impl Cell {
    pub(crate) fn new(id: CellId, name: String, kind: CellKind) -> Self {
        Self {
            id,
            name,
            kind,
            objects: Vec::new(),
            properties: Vec::new(),
            modified: 0,
            flags: CellFlags::empty(),
            symbolic_of: None,
            twin: None,
            associated: true,
            bbox: Bounds::empty(),
        }
    }

    pub fn is_electrical(&self) -> bool {
        self.kind == CellKind::Electrical
    }

    /// Is this cell the symbolic view of another cell?
    pub fn is_symbolic_view(&self) -> bool {
        self.symbolic_of.is_some()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_mask() {
        assert!(CellFlags::KNOWN.contains(CellFlags::CONNECTIVITY_KNOWN));
        assert!(CellFlags::KNOWN.contains(CellFlags::DERIVED_KNOWN));
        assert!(!CellFlags::KNOWN.intersects(CellFlags::USER));
    }

    #[test]
    fn test_user_value() {
        let flags = CellFlags::from_user_value(0b101);
        assert_eq!(flags, CellFlags::USER_0 | CellFlags::USER_2);
        assert_eq!(CellFlags::from_user_value(0x1_00), CellFlags::empty());
    }
}
