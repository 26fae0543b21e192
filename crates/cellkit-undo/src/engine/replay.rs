//! Undo, redo and the replay routine they share.
//!
//! Replay makes the delete side of every entry live and the add side dead,
//! then swaps the roles so that the record describes the opposite direction.
//! Undo and redo differ only in which stack they pop and push.

use super::commit::{instance_pairs, touches_instances};
use super::TransactionEngine;
use crate::collaborators::{DisplayMode, Redisplay};
use crate::operation::{OpFlags, Operation, OperationGroup};
use cellkit_core::event_bus::{EditorEvent, StatusEvent};
use cellkit_core::Bounds;
use cellkit_db::{CellFlags, Database, ObjectId, ObjectState, PropertyKind, PropertyOwner};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

struct Replayed {
    mode: DisplayMode,
    area: Bounds,
    symbolic_changed: bool,
    off_screen: bool,
}

impl TransactionEngine {
    /// Undoes the newest committed record. Returns false if there was nothing
    /// to undo.
    pub fn undo(&mut self, db: &mut Database) -> bool {
        let Some(mut group) = self.undo.pop() else {
            tracing::info!("Nothing to undo");
            self.publish(EditorEvent::Status(StatusEvent::NothingToUndo));
            return false;
        };
        self.warn_if_open("undo");
        self.collab.drc.cancel_pending();
        Self::adjust_modified(db, &group, Direction::Undo);
        for op in &group.members {
            if let Some(cell) = op.cell {
                self.collab.drc.erase_markers(db, cell, &op.objects);
            }
        }

        self.replay_guarded(db, &mut group, Direction::Undo);
        for op in &group.members {
            self.parent_connection_fixup(db, op);
        }

        let command = group.command().to_string();
        let cell = Self::cell_name(db, group.cell());
        let evicted = self.redo.push(group);
        self.reclaim(db, evicted);

        tracing::info!("Undid '{}' in {}", command, cell);
        self.publish(EditorEvent::Status(StatusEvent::Undone { command, cell }));
        self.refresh_working(db);
        true
    }

    /// Redoes the newest undone record. Returns false if there was nothing to
    /// redo.
    pub fn redo(&mut self, db: &mut Database) -> bool {
        let Some(mut group) = self.redo.pop() else {
            tracing::info!("Nothing to redo");
            self.publish(EditorEvent::Status(StatusEvent::NothingToRedo));
            return false;
        };
        self.warn_if_open("redo");
        self.collab.drc.cancel_pending();
        Self::adjust_modified(db, &group, Direction::Redo);

        self.replay_guarded(db, &mut group, Direction::Redo);
        for op in &group.members {
            self.parent_connection_fixup(db, op);
        }

        let command = group.command().to_string();
        let cell = Self::cell_name(db, group.cell());
        let evicted = self.undo.push(group);
        self.reclaim(db, evicted);

        tracing::info!("Redid '{}' in {}", command, cell);
        self.publish(EditorEvent::Status(StatusEvent::Redone { command, cell }));
        self.refresh_working(db);
        true
    }

    fn warn_if_open(&self, what: &str) {
        if self.working.has_changes() {
            tracing::warn!(
                "{} requested while '{}' holds {} uncommitted changes",
                what,
                self.working.command(),
                self.working.change_count()
            );
        }
    }

    /// Rebinds an idle working record so its snapshot reflects the replayed
    /// state. An open record is left alone.
    fn refresh_working(&mut self, db: &Database) {
        if !self.working.has_changes() {
            self.reopen(db, "", db.current());
        }
    }

    fn adjust_modified(db: &mut Database, group: &OperationGroup, direction: Direction) {
        for op in &group.members {
            if op.flags.contains(OpFlags::NO_INCREMENT) {
                continue;
            }
            let Some(cell) = op.cell else {
                continue;
            };
            let mut delta = match direction {
                Direction::Undo => -1,
                Direction::Redo => 1,
            };
            if op.flags.contains(OpFlags::HOLDOVER) {
                delta = -delta;
            }
            if let Ok(c) = db.cell_mut(cell) {
                c.modified += delta;
            }
            if let Err(e) = db.mark_unassociated(cell) {
                tracing::warn!("Cannot mark twin of {} unassociated: {}", cell, e);
            }
        }
    }

    /// Replays with the extraction immutability override relaxed, except for
    /// flatten, which manages that override itself.
    fn replay_guarded(&mut self, db: &mut Database, group: &mut OperationGroup, direction: Direction) {
        let relax = group.command() != "flatten";
        let previous = self.collab.extraction.immutability_override();
        if relax {
            self.collab.extraction.set_immutability_override(true);
        }
        self.replay(db, group, direction);
        if relax {
            self.collab.extraction.set_immutability_override(previous);
        }
    }

    fn replay(&mut self, db: &mut Database, group: &mut OperationGroup, direction: Direction) {
        let count = group.members.len();
        let order: Vec<usize> = match direction {
            Direction::Undo => (0..count).rev().collect(),
            Direction::Redo => (0..count).collect(),
        };

        let mut replayed = Vec::with_capacity(count);
        for index in order {
            if let Some(op) = group.members.get_mut(index) {
                if let Some(result) = self.replay_member(db, op) {
                    replayed.push(result);
                }
            }
        }

        self.collab.instances.refresh_parameters();
        self.collab.schematic.recompute_node_map(db);

        let symbolic_changed = replayed.iter().any(|r| r.symbolic_changed);
        let mut modes: Vec<(DisplayMode, Bounds, bool)> = Vec::new();
        for r in &replayed {
            let whole = symbolic_changed || r.off_screen;
            match modes.iter_mut().find(|(m, _, _)| *m == r.mode) {
                Some((_, area, w)) => {
                    area.add(&r.area);
                    *w |= whole;
                }
                None => modes.push((r.mode, r.area, whole)),
            }
        }
        for (mode, area, whole) in modes {
            if whole {
                self.collab.display.redisplay(&Redisplay::WholeMode(mode));
            } else if !area.is_empty() {
                self.collab.display.redisplay(&Redisplay::Boxes {
                    mode,
                    boxes: vec![area],
                });
            }
        }
    }

    fn replay_member(&mut self, db: &mut Database, op: &mut Operation) -> Option<Replayed> {
        let cell = op.cell?;
        let mode = match db.cell(cell) {
            Ok(c) => DisplayMode::from(c.kind),
            Err(e) => {
                tracing::warn!("Skipping replay of '{}': {}", op.command, e);
                return None;
            }
        };

        for snapshot in &mut op.hyper {
            match db.set_hyperlinks(snapshot.property, std::mem::take(&mut snapshot.links)) {
                Ok(current) => snapshot.links = current,
                Err(e) => tracing::debug!("Hyperlink snapshot not restored: {}", e),
            }
        }

        let was_symbolic = db.is_symbolic(cell);
        if let Ok(live) = db.replace_cell_properties(cell, std::mem::take(&mut op.prop_snapshot)) {
            op.prop_snapshot = live;
        }
        let is_symbolic = db.is_symbolic(cell);
        let symbolic_changed = was_symbolic != is_symbolic;
        if symbolic_changed {
            self.collab.schematic.assert_symbolic(cell, is_symbolic);
            self.collab.display.redisplay(&Redisplay::WholeMode(mode));
        }

        let pairs = instance_pairs(db, &op.objects, true);
        if !pairs.is_empty() {
            if let Err(e) = self.collab.instances.fix_labels(db, cell, &pairs, true) {
                self.collaborator_failed("label correction", &e);
            }
        }

        let names = op
            .properties
            .iter()
            .flat_map(|c| c.delete.into_iter().chain(c.add))
            .any(|p| db.property(p).is_ok_and(|p| p.kind == PropertyKind::Name));
        let terminals = names || touches_instances(db, &op.objects);
        if terminals {
            self.collab.display.erase_terminals(cell);
        }

        let selected = op.flags.contains(OpFlags::WAS_SELECTED);
        let restored: HashSet<ObjectId> = op.objects.iter().filter_map(|e| e.delete).collect();
        let mut area = Bounds::empty();

        for entry in &op.objects {
            let Some(object) = entry.delete else {
                continue;
            };
            let result = db
                .link_object(object)
                .and_then(|_| db.set_object_state(object, ObjectState::Normal));
            if let Err(e) = result {
                tracing::warn!("Cannot restore {}: {}", object, e);
                continue;
            }
            if let Ok(o) = db.object(object) {
                area.add(&o.bounds);
            }
            if let Some(replaced) = entry.add {
                self.collab.display.object_replaced(replaced, Some(object));
            }
            self.collab.scripting.update_object_identity(entry.add, Some(object));
            if selected {
                self.collab.selection.insert(cell, object);
            }
        }

        for entry in &op.objects {
            let Some(object) = entry.add else {
                continue;
            };
            if restored.contains(&object) {
                continue;
            }
            if let Ok(o) = db.object(object) {
                area.add(&o.bounds);
            }
            let result = db
                .unlink_object(object)
                .and_then(|_| db.set_object_state(object, ObjectState::Deleted));
            if let Err(e) = result {
                tracing::warn!("Cannot remove {}: {}", object, e);
                continue;
            }
            if entry.delete.is_none() {
                self.collab.display.object_replaced(object, None);
                self.collab.scripting.update_object_identity(Some(object), None);
            }
            if selected {
                self.collab.selection.remove(cell, object);
            }
        }
        if !selected {
            self.collab.selection.purge_deleted(db, cell);
        }

        for change in &op.properties {
            if let Some(old) = change.delete {
                match db.link_property(change.owner, old) {
                    Ok(_) => self.collab.display.show_property_text(change.owner, old),
                    Err(e) => tracing::debug!("Cannot relink {}: {}", old, e),
                }
            }
        }
        for change in &op.properties {
            if let Some(new) = change.add {
                if let Ok(true) = db.unlink_property(change.owner, new) {
                    self.collab.display.erase_property_text(change.owner, new);
                }
            }
            self.collab
                .scripting
                .update_property_identity(change.owner, change.add, change.delete);
            if let PropertyOwner::Object(owner) = change.owner {
                let symbolic = change
                    .delete
                    .into_iter()
                    .chain(change.add)
                    .any(|p| db.property(p).is_ok_and(|p| p.kind == PropertyKind::Symbolic));
                if symbolic && db.object(owner).is_ok_and(|o| o.is_instance()) {
                    self.collab.instances.recompute_instance(db, cell, owner);
                }
            }
        }

        let suppress = db.is_symbolic(cell);
        if suppress {
            self.collab.schematic.suppress_redisplay(true);
        }
        for entry in &op.objects {
            if let Some(object) = entry.delete {
                self.collab.schematic.install(db, cell, object);
                if db.object(object).is_ok_and(|o| o.kind.is_wire()) {
                    self.collab.schematic.update_dots(db, cell, object);
                }
            }
            if let Some(object) = entry.add.filter(|o| !restored.contains(o)) {
                self.collab.schematic.uninstall(db, cell, object);
            }
        }
        if suppress {
            self.collab.schematic.suppress_redisplay(false);
        }
        self.collab.extraction.invalidate_groups(cell);

        op.swap_roles();

        if terminals {
            self.collab.display.show_terminals(cell);
        }
        self.collab.instances.recompute_reflected(db, cell);

        if let Ok(c) = db.cell_mut(cell) {
            let live = c.flags;
            let saved = op.cell_flags;
            c.flags = (saved - CellFlags::KNOWN) | (saved & live & CellFlags::KNOWN);
            op.cell_flags = live;
        }
        if let Err(e) = db.recompute_bbox(cell) {
            tracing::warn!("Cannot recompute bounds of {}: {}", cell, e);
        }

        Some(Replayed {
            mode,
            area,
            symbolic_changed,
            off_screen: db.current() != Some(cell),
        })
    }
}
