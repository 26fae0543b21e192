//! Properties: typed attributes attached to a cell or a design object.
//!
//! Properties are immutable once created. Changing one means unlinking the old
//! property from its owner and linking a freshly created one.

use crate::ids::{CellId, ObjectId, PropertyId};
use cellkit_core::Point;
use serde::{Deserialize, Serialize};

/// Well-known property kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Display name of an object or cell.
    Name,
    /// A schematic terminal; `location` holds its position.
    Node,
    /// Symbolic-view toggle.
    Symbolic,
    /// Cell-level user flag bits.
    Flags,
    /// Parameters of a parametrized sub-cell.
    SubCellParams,
    /// Request to re-parameterize an instance. Never stored.
    ParamRequest,
    /// Pseudo-property carrying derived physical geometry. Never stored.
    DerivedGeometry,
    /// Application-defined kind.
    Other(u32),
}

/// Which property list a property belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyOwner {
    Cell(CellId),
    Object(ObjectId),
}

impl std::fmt::Display for PropertyOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyOwner::Cell(id) => write!(f, "{}", id),
            PropertyOwner::Object(id) => write!(f, "{}", id),
        }
    }
}

/// A typed key/value attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub kind: PropertyKind,
    pub text: String,
    pub location: Option<Point>,
}

impl Property {
    /// Numeric value of a flags property, decimal or `0x` hex.
    pub fn flags_value(&self) -> Option<u32> {
        let text = self.text.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        }
    }

    /// Text with rich-text `<...>` markup removed.
    pub fn plain_text(&self) -> String {
        strip_markup(&self.text)
    }

    /// True for a symbolic-view property that switches the view on.
    pub fn is_symbolic_on(&self) -> bool {
        self.kind == PropertyKind::Symbolic
            && !matches!(
                self.text.trim().to_ascii_lowercase().as_str(),
                "" | "0" | "off" | "false" | "no"
            )
    }
}

/// Removes `<tag>` runs from rich text.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}
