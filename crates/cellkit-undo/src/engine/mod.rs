//! The transaction engine.
//!
//! A command opens a transaction, reports every database mutation as an
//! object or property change, and commits. Commit validates the record,
//! notifies collaborators and pushes it onto the undo stack. Undo and redo pop
//! a record and replay it with the add and delete roles exchanged.
//!
//! ```text
//! begin_transaction ─► record_*_change ... ─► commit ─► undo stack
//!                                                         │ undo ▲ redo
//!                                                         ▼      │
//!                                                       redo stack
//! ```
//!
//! Everything here runs on the command thread (`&mut self`). The only
//! concurrent entry point is [`ChangeRecorder`].

mod commit;
mod fixup;
mod nested;
mod record;
mod repair;
mod replay;

pub use repair::RepairReport;

use crate::collaborators::Collaborators;
use crate::history::HistoryStack;
use crate::operation::{HyperSnapshot, OpFlags, OperationGroup};
use crate::recorder::ChangeRecorder;
use crate::trash::TrashBin;
use cellkit_core::event_bus::{
    DiagnosticEvent, DiagnosticKind, EditorEvent, EventBus, HistoryEvent,
};
use cellkit_db::{CellId, Database, ObjectId, ObjectState, PropertyId};
use cellkit_settings::{Config, DisplaySettings, UndoSettings};
use std::collections::HashSet;
use std::sync::Arc;

/// Undo and redo history detached by [`TransactionEngine::push_state`].
#[derive(Debug)]
pub struct SavedState {
    cell_name: Option<String>,
    undo: HistoryStack,
    redo: HistoryStack,
}

impl SavedState {
    /// Name of the cell that was current when the state was saved.
    pub fn cell_name(&self) -> Option<&str> {
        self.cell_name.as_deref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

/// Owns the working record, the undo and redo stacks and the trash bin.
///
/// Construct one per editor and pass it (with the database) to every command.
pub struct TransactionEngine {
    working: OperationGroup,
    nested: Vec<OperationGroup>,
    undo: HistoryStack,
    redo: HistoryStack,
    trash: TrashBin,
    collab: Collaborators,
    events: Arc<EventBus>,
    settings: UndoSettings,
    display: DisplaySettings,
}

impl TransactionEngine {
    pub fn new(
        settings: UndoSettings,
        display: DisplaySettings,
        collab: Collaborators,
        events: Arc<EventBus>,
    ) -> Self {
        let limit = settings.history_length;
        Self {
            working: OperationGroup::default(),
            nested: Vec::new(),
            undo: HistoryStack::new(limit),
            redo: HistoryStack::new(limit),
            trash: TrashBin::new(),
            collab,
            events,
            settings,
            display,
        }
    }

    pub fn from_config(config: &Config, collab: Collaborators, events: Arc<EventBus>) -> Self {
        Self::new(config.undo.clone(), config.display.clone(), collab, events)
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn settings(&self) -> &UndoSettings {
        &self.settings
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collab
    }

    // ---- introspection ---------------------------------------------------

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Command names on the undo stack, newest first.
    pub fn undo_names(&self) -> Vec<String> {
        self.undo.names()
    }

    pub fn redo_names(&self) -> Vec<String> {
        self.redo.names()
    }

    pub fn undo_stack(&self) -> &HistoryStack {
        &self.undo
    }

    pub fn redo_stack(&self) -> &HistoryStack {
        &self.redo
    }

    /// The open working record.
    pub fn working(&self) -> &OperationGroup {
        &self.working
    }

    /// Does the working record hold uncommitted changes?
    pub fn is_open(&self) -> bool {
        self.working.has_changes()
    }

    pub fn nesting_depth(&self) -> usize {
        self.nested.len()
    }

    pub fn trash_bin(&self) -> &TrashBin {
        &self.trash
    }

    // ---- transaction lifecycle ---------------------------------------------

    /// Starts a fresh working record without touching the stacks.
    ///
    /// The record is rebound to the current cell when `reset_to_current` is
    /// set, otherwise to the cell it was already bound to. Pending changes are
    /// discarded (the objects they reference are left alone); with
    /// `debug_queue_check` enabled this is reported unless `skip_check` is set.
    pub fn reset_transaction(&mut self, db: &Database, reset_to_current: bool, skip_check: bool) {
        if self.settings.debug_queue_check && !skip_check && self.working.has_changes() {
            let message = format!(
                "Transaction '{}' still holds {} changes at begin; discarding them",
                self.working.command(),
                self.working.change_count()
            );
            tracing::warn!("{}", message);
            self.diagnostic(DiagnosticKind::Protocol, message);
        }

        let cell = if reset_to_current {
            db.current()
        } else {
            self.working.cell()
        };
        self.rebind(db, "", cell);
    }

    /// Opens a fresh working record. The was-selected flag only ever applies
    /// to the newest undo record, so it is cleared on the current head.
    fn rebind(&mut self, db: &Database, command: &str, cell: Option<CellId>) {
        self.reopen(db, command, cell);
        if let Some(head) = self.undo.peek_mut() {
            head.set_flag(OpFlags::WAS_SELECTED, false);
        }
    }

    /// Opens a fresh working record on the current cell, leaving the stacks
    /// alone.
    fn reopen(&mut self, db: &Database, command: &str, cell: Option<CellId>) {
        self.working = OperationGroup::open(db, command, cell);
    }

    /// Opens a transaction for a user command.
    ///
    /// Empties the trash bin, commits anything still open, discards the redo
    /// history and binds a fresh record to `cell` (or the current cell).
    pub fn begin_transaction(
        &mut self,
        db: &mut Database,
        command: &str,
        cell: Option<CellId>,
        preserve_selection: bool,
    ) {
        self.trash.drain(db);

        if self.working.has_changes() {
            tracing::warn!(
                "Transaction '{}' was still open when '{}' began; committing it",
                self.working.command(),
                command
            );
            self.commit(db, true, false);
        }

        let stale = self.redo.clear();
        self.reclaim(db, stale);

        let cell = cell.or_else(|| db.current());
        self.rebind(db, command, cell);
        if preserve_selection {
            self.working.set_flag(OpFlags::WAS_SELECTED, true);
        }
        tracing::debug!("Began transaction '{}'", command);
    }

    /// Returns a handle that worker threads can use to record object changes
    /// into the current working record.
    pub fn recorder(&self) -> ChangeRecorder {
        let primary = self.working.primary();
        ChangeRecorder::new(
            primary.and_then(|op| op.pending_list()),
            primary.and_then(|op| op.cell()),
        )
    }

    /// Saves the current link list of `property` before a command edits it.
    /// Only the first snapshot per property and transaction is kept.
    pub fn save_hyper_snapshot(&mut self, db: &Database, property: PropertyId) -> bool {
        if !db.contains_property(property) {
            tracing::warn!("Hyperlink snapshot of unknown property {}", property);
            return false;
        }
        let Some(op) = self.working.primary_mut() else {
            return false;
        };
        if op.hyper.iter().any(|s| s.property == property) {
            return false;
        }
        op.hyper.push(HyperSnapshot {
            property,
            links: db.hyperlinks(property).to_vec(),
        });
        true
    }

    /// Defers destruction of `object` until the next transaction begins.
    pub fn trash(&mut self, object: ObjectId) {
        self.trash.trash(object);
    }

    /// Ends an editing session.
    ///
    /// With `keep_undo` the undo records become holdover records and both
    /// stacks survive; otherwise both stacks are discarded.
    pub fn finalize(&mut self, db: &mut Database, keep_undo: bool) {
        self.trash.drain(db);
        if keep_undo {
            for group in self.undo.iter_mut() {
                group.set_flag(OpFlags::HOLDOVER, true);
            }
        } else {
            let mut discarded = self.undo.clear();
            discarded.extend(self.redo.clear());
            self.reclaim(db, discarded);
            self.publish(EditorEvent::History(HistoryEvent::Cleared));
        }
        self.publish(EditorEvent::History(HistoryEvent::Finalized { kept: keep_undo }));
        tracing::info!("Finalized undo history (kept: {})", keep_undo);
    }

    /// Detaches both stacks, scoped to the current cell.
    pub fn push_state(&mut self, db: &Database) -> SavedState {
        let cell_name = db
            .current()
            .and_then(|cell| db.cell(cell).ok())
            .map(|cell| cell.name.clone());
        SavedState {
            cell_name,
            undo: self.undo.take(),
            redo: self.redo.take(),
        }
    }

    /// Re-attaches a saved history if its cell is the current cell again;
    /// otherwise the saved history is discarded. Returns whether it was
    /// re-attached.
    pub fn pop_state(&mut self, db: &mut Database, saved: SavedState) -> bool {
        let current = db
            .current()
            .and_then(|cell| db.cell(cell).ok())
            .map(|cell| cell.name.clone());

        let SavedState {
            cell_name,
            mut undo,
            mut redo,
        } = saved;

        if cell_name.is_some() && cell_name == current {
            let mut replaced = self.undo.clear();
            replaced.extend(self.redo.clear());
            self.undo = undo;
            self.redo = redo;
            let limit = self.settings.history_length;
            replaced.extend(self.undo.set_limit(limit));
            replaced.extend(self.redo.set_limit(limit));
            self.reclaim(db, replaced);
            true
        } else {
            tracing::debug!(
                "Discarding saved history for {:?} (current cell {:?})",
                cell_name,
                current
            );
            let mut discarded = undo.clear();
            discarded.extend(redo.clear());
            self.reclaim(db, discarded);
            false
        }
    }

    /// Drops every record that targets `cell`.
    pub fn invalidate_cell(&mut self, db: &mut Database, cell: CellId) -> usize {
        let mut dropped = self.undo.remove_where(|g| g.targets(cell));
        dropped.extend(self.redo.remove_where(|g| g.targets(cell)));
        let count = dropped.len();
        self.reclaim(db, dropped);
        if count > 0 {
            tracing::debug!("Invalidated {} records of {}", count, cell);
        }
        count
    }

    /// Changes the history bound and trims both stacks immediately.
    pub fn set_history_length(&mut self, db: &mut Database, length: usize) {
        self.settings.history_length = length;
        let mut evicted = self.undo.set_limit(length);
        evicted.extend(self.redo.set_limit(length));
        self.reclaim(db, evicted);
    }

    // ---- helpers -----------------------------------------------------------

    fn publish(&self, event: EditorEvent) {
        self.events.publish(event);
    }

    fn diagnostic(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.publish(EditorEvent::Diagnostic(DiagnosticEvent::new(kind, message)));
    }

    fn cell_name(db: &Database, cell: Option<CellId>) -> String {
        cell.and_then(|c| db.cell(c).ok())
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "<no cell>".to_string())
    }

    /// Objects and properties still referenced by any live record.
    fn referenced(&self) -> (HashSet<ObjectId>, HashSet<PropertyId>) {
        let mut objects = HashSet::new();
        let mut properties = HashSet::new();
        let groups = self
            .undo
            .iter()
            .chain(self.redo.iter())
            .chain(self.nested.iter())
            .chain(std::iter::once(&self.working));
        for group in groups {
            for op in &group.members {
                objects.extend(op.objects.iter().flat_map(|e| e.objects()));
                for change in &op.properties {
                    properties.extend(change.delete.into_iter().chain(change.add));
                }
                properties.extend(op.prop_snapshot.iter().copied());
            }
        }
        (objects, properties)
    }

    /// Hard-deletes what discarded records kept alive for undo: delete-side
    /// objects and properties that are unlinked and referenced nowhere else.
    fn reclaim(&mut self, db: &mut Database, groups: Vec<OperationGroup>) {
        if groups.is_empty() {
            return;
        }
        let (live_objects, live_properties) = self.referenced();
        let mut objects = 0usize;
        let mut properties = 0usize;

        for op in groups.iter().flat_map(|g| g.members.iter()) {
            for object in op.objects.iter().filter_map(|e| e.delete) {
                let dead = db
                    .object(object)
                    .is_ok_and(|o| o.state == ObjectState::Deleted)
                    && !db.is_linked(object);
                if dead && !live_objects.contains(&object) && db.destroy_object(object).is_ok() {
                    objects += 1;
                }
            }
            for property in op.properties.iter().filter_map(|c| c.delete) {
                if db.contains_property(property)
                    && !db.is_property_linked_anywhere(property)
                    && !live_properties.contains(&property)
                    && db.destroy_property(property).is_ok()
                {
                    properties += 1;
                }
            }
        }

        tracing::debug!(
            "Reclaimed {} records ({} objects, {} properties)",
            groups.len(),
            objects,
            properties
        );
    }
}

impl std::fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("working", &self.working.command())
            .field("undo", &self.undo.len())
            .field("redo", &self.redo.len())
            .field("nested", &self.nested.len())
            .field("trash", &self.trash.len())
            .finish()
    }
}
