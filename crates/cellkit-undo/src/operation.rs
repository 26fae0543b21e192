//! Operation records: the unit of undo and redo.
//!
//! While a transaction is open its object changes accumulate newest-first in
//! a push-only list that background recorders can append to. Commit freezes
//! the record: the list is drained into a plain vector in chronological order
//! and the record becomes immutable apart from the role swap done by replay.

use crate::change::{AtomicChangeList, ObjectChange, PropertyChange};
use bitflags::bitflags;
use cellkit_db::{CellFlags, CellId, Database, HyperLink, PropertyId};
use std::sync::Arc;

bitflags! {
    /// Bookkeeping flags of an operation record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpFlags: u8 {
        /// The command acted on the user's selection.
        const WAS_SELECTED = 1 << 0;
        /// Survived a save; modified-counter adjustments are inverted.
        const HOLDOVER = 1 << 1;
        /// Do not touch the cell's modified counter.
        const NO_INCREMENT = 1 << 2;
        /// Holds an object change recorded against a different cell.
        const MISATTRIBUTED = 1 << 3;
    }
}

/// Saved hypertext link list of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperSnapshot {
    pub property: PropertyId,
    pub links: Vec<HyperLink>,
}

/// Changes made to one cell by one command.
#[derive(Debug)]
pub struct Operation {
    pub(crate) command: String,
    pub(crate) cell: Option<CellId>,
    /// Cell-level property list on the other side of this record.
    pub(crate) prop_snapshot: Vec<PropertyId>,
    /// Persisted cell flags on the other side of this record.
    pub(crate) cell_flags: CellFlags,
    /// Open list; `None` once frozen.
    pub(crate) pending: Option<Arc<AtomicChangeList>>,
    pub(crate) objects: Vec<ObjectChange>,
    pub(crate) properties: Vec<PropertyChange>,
    pub(crate) hyper: Vec<HyperSnapshot>,
    pub(crate) flags: OpFlags,
}

impl Operation {
    /// An open record bound to `cell`, snapshotting its properties and flags.
    pub(crate) fn open(db: &Database, command: &str, cell: Option<CellId>) -> Self {
        let mut op = Self {
            command: command.to_string(),
            cell: None,
            prop_snapshot: Vec::new(),
            cell_flags: CellFlags::empty(),
            pending: Some(Arc::new(AtomicChangeList::new())),
            objects: Vec::new(),
            properties: Vec::new(),
            hyper: Vec::new(),
            flags: OpFlags::empty(),
        };
        if let Some(cell) = cell {
            op.bind(db, cell);
        }
        op
    }

    /// Binds the record to `cell` and snapshots its current state.
    pub(crate) fn bind(&mut self, db: &Database, cell: CellId) {
        match db.cell(cell) {
            Ok(c) => {
                self.cell = Some(cell);
                self.prop_snapshot = c.properties.clone();
                self.cell_flags = c.flags;
            }
            Err(e) => {
                tracing::warn!("Cannot bind transaction '{}': {}", self.command, e);
                self.cell = None;
                self.prop_snapshot.clear();
                self.cell_flags = CellFlags::empty();
            }
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    pub fn flags(&self) -> OpFlags {
        self.flags
    }

    /// Frozen object changes in chronological order.
    pub fn object_changes(&self) -> &[ObjectChange] {
        &self.objects
    }

    /// Property changes in chronological order.
    pub fn property_changes(&self) -> &[PropertyChange] {
        &self.properties
    }

    pub fn hyper_snapshots(&self) -> &[HyperSnapshot] {
        &self.hyper
    }

    pub fn is_frozen(&self) -> bool {
        self.pending.is_none()
    }

    /// Number of recorded changes, including unfrozen ones.
    pub fn change_count(&self) -> usize {
        let pending = self.pending.as_ref().map_or(0, |list| list.len());
        pending + self.objects.len() + self.properties.len() + self.hyper.len()
    }

    pub fn has_changes(&self) -> bool {
        self.pending.as_ref().is_some_and(|list| !list.is_empty())
            || !self.objects.is_empty()
            || !self.properties.is_empty()
            || !self.hyper.is_empty()
    }

    pub(crate) fn push_object(&self, entry: ObjectChange) {
        if let Some(list) = &self.pending {
            list.push(entry);
        }
    }

    /// Drains the open list into chronological order. Returns the deferred
    /// entries that still need their database state applied.
    pub(crate) fn freeze(&mut self) -> Vec<ObjectChange> {
        if let Some(list) = self.pending.take() {
            let mut entries = list.take_all();
            entries.reverse();
            self.objects.extend(entries);
        }
        let deferred = self.objects.iter().filter(|e| e.deferred).copied().collect();
        for entry in &mut self.objects {
            entry.deferred = false;
        }
        deferred
    }

    /// Unfrozen entries, newest first, leaving the list empty but open.
    pub(crate) fn drain_pending(&mut self) -> Vec<ObjectChange> {
        let mut entries: Vec<ObjectChange> = self
            .pending
            .as_ref()
            .map(|list| list.take_all())
            .unwrap_or_default();
        entries.extend(self.objects.drain(..).rev());
        entries
    }

    /// Turns the record into its own inverse.
    pub(crate) fn swap_roles(&mut self) {
        for entry in &mut self.objects {
            entry.swap();
        }
        for entry in &mut self.properties {
            entry.swap();
        }
    }

    pub(crate) fn pending_list(&self) -> Option<&Arc<AtomicChangeList>> {
        self.pending.as_ref()
    }
}

/// Records created by one user action, one per touched cell.
///
/// The first member is the primary record; further members are added when the
/// action spans several cells.
#[derive(Debug, Default)]
pub struct OperationGroup {
    pub(crate) members: Vec<Operation>,
}

impl OperationGroup {
    pub(crate) fn open(db: &Database, command: &str, cell: Option<CellId>) -> Self {
        Self {
            members: vec![Operation::open(db, command, cell)],
        }
    }

    pub fn members(&self) -> &[Operation] {
        &self.members
    }

    pub fn primary(&self) -> Option<&Operation> {
        self.members.first()
    }

    pub(crate) fn primary_mut(&mut self) -> Option<&mut Operation> {
        self.members.first_mut()
    }

    /// Command name of the primary record.
    pub fn command(&self) -> &str {
        self.primary().map_or("", Operation::command)
    }

    /// Cell of the primary record.
    pub fn cell(&self) -> Option<CellId> {
        self.primary().and_then(Operation::cell)
    }

    pub fn targets(&self, cell: CellId) -> bool {
        self.members.iter().any(|op| op.cell == Some(cell))
    }

    pub(crate) fn member_for(&self, cell: CellId) -> Option<usize> {
        self.members.iter().position(|op| op.cell == Some(cell))
    }

    pub fn has_changes(&self) -> bool {
        self.members.iter().any(Operation::has_changes)
    }

    pub fn change_count(&self) -> usize {
        self.members.iter().map(Operation::change_count).sum()
    }

    pub(crate) fn set_flag(&mut self, flag: OpFlags, on: bool) {
        for op in &mut self.members {
            op.flags.set(flag, on);
        }
    }
}
