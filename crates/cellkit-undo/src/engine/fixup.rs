//! Parent-connection fix-up for schematic terminals.

use super::TransactionEngine;
use crate::operation::Operation;
use cellkit_core::Point;
use cellkit_db::{Database, PropertyId, PropertyKind};
use std::collections::BTreeMap;

/// Terminal name to position, from the node properties in `list`.
fn terminals(db: &Database, list: &[PropertyId]) -> BTreeMap<String, Point> {
    list.iter()
        .filter_map(|id| db.property(*id).ok())
        .filter(|p| p.kind == PropertyKind::Node)
        .map(|p| (p.text.clone(), p.location.unwrap_or_default()))
        .collect()
}

impl TransactionEngine {
    /// Compares the terminals of a non-symbolic electrical cell against the
    /// record's snapshot and tells the schematic collaborator about removed,
    /// moved and added ones. Returns whether any terminal changed.
    pub(super) fn parent_connection_fixup(&mut self, db: &mut Database, op: &Operation) -> bool {
        let Some(cell) = op.cell else {
            return false;
        };
        let live = match db.cell(cell) {
            Ok(c) if c.is_electrical() => c.properties.clone(),
            _ => return false,
        };
        if db.is_symbolic(cell) {
            return false;
        }

        let before = terminals(db, &op.prop_snapshot);
        let after = terminals(db, &live);
        let mut changed = false;

        if before.keys().any(|name| !after.contains_key(name)) {
            changed = true;
            for parent in db.instantiating_cells(cell) {
                self.collab.schematic.mark_dots_dirty(parent);
            }
        }

        for (name, at) in &after {
            if before.get(name) != Some(at) {
                changed = true;
                self.collab.schematic.add_parent_connection(db, cell, name, *at);
            }
        }

        if changed {
            tracing::debug!("Terminals of {} changed; refreshing parent connections", cell);
            if let Err(e) = db.recompute_bbox(cell) {
                tracing::warn!("Cannot recompute bounds of {}: {}", cell, e);
            }
            self.collab.instances.recompute_derived(db, cell);
            self.collab.schematic.refresh_dirty_dots(db);
        }
        changed
    }
}
