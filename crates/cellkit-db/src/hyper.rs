//! Hypertext links.
//!
//! Rich-text property values can embed links to other objects. A property's
//! link list is replaced wholesale, which is how undo snapshots restore it.

use crate::ids::ObjectId;
use serde::{Deserialize, Serialize};

/// One segment of a hypertext string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperLink {
    /// Literal text, or the display text of the link.
    pub text: String,
    /// Linked object, if this segment is a reference.
    pub target: Option<ObjectId>,
}

impl HyperLink {
    /// Plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: None,
        }
    }

    /// Reference to another object.
    pub fn reference(text: impl Into<String>, target: ObjectId) -> Self {
        Self {
            text: text.into(),
            target: Some(target),
        }
    }
}
