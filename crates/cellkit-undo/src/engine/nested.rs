//! Nested transactions opened from inside a running command.

use super::TransactionEngine;
use crate::operation::OperationGroup;
use cellkit_core::event_bus::DiagnosticKind;
use cellkit_db::{CellId, Database};

impl TransactionEngine {
    /// Parks the working record and opens a fresh one on `cell` (or the
    /// current cell).
    ///
    /// With `override_symbolic`, a symbolic view is redirected to the
    /// electrical cell it represents.
    pub fn push_nested(
        &mut self,
        db: &Database,
        command: &str,
        cell: Option<CellId>,
        override_symbolic: bool,
    ) {
        let mut target = cell.or_else(|| db.current());
        if override_symbolic {
            if let Some(owner) = target
                .and_then(|c| db.cell(c).ok())
                .and_then(|c| c.symbolic_of)
            {
                tracing::debug!("Nested '{}' redirected to owning cell {}", command, owner);
                target = Some(owner);
            }
        }
        let inner = OperationGroup::open(db, command, target);
        let outer = std::mem::replace(&mut self.working, inner);
        self.nested.push(outer);
    }

    /// Commits the nested record and restores the parked one. Returns whether
    /// the nested record committed anything.
    pub fn pop_nested(&mut self, db: &mut Database) -> bool {
        if self.nested.is_empty() {
            tracing::warn!("pop_nested without a matching push_nested");
            self.diagnostic(DiagnosticKind::Protocol, "Unbalanced nested transaction pop");
            return false;
        }
        let changed = self.commit(db, true, false);
        if let Some(outer) = self.nested.pop() {
            self.working = outer;
        }
        changed
    }
}
