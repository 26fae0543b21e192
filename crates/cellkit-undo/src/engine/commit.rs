//! Commit: freeze, validate and push the working record.

use super::repair::repair;
use super::TransactionEngine;
use crate::change::ObjectChange;
use crate::collaborators::{self, DisplayMode, Redisplay};
use crate::operation::{OpFlags, Operation, OperationGroup};
use cellkit_core::event_bus::{DiagnosticKind, EditorEvent, HistoryEvent};
use cellkit_core::Bounds;
use cellkit_db::{CellKind, Database, ObjectId, ObjectState, PropertyKind, PropertyOwner};

/// Replacement pairs where both sides are instances, as
/// `(replaced, replacement)`. `reversed` reads the entries backwards, as
/// replay does.
pub(super) fn instance_pairs(
    db: &Database,
    entries: &[ObjectChange],
    reversed: bool,
) -> Vec<(ObjectId, ObjectId)> {
    let is_instance = |o: ObjectId| db.object(o).is_ok_and(|o| o.is_instance());
    entries
        .iter()
        .filter_map(|e| match (e.delete, e.add) {
            (Some(d), Some(a)) if is_instance(d) && is_instance(a) => {
                Some(if reversed { (a, d) } else { (d, a) })
            }
            _ => None,
        })
        .collect()
}

pub(super) fn touches_instances(db: &Database, entries: &[ObjectChange]) -> bool {
    entries
        .iter()
        .flat_map(ObjectChange::objects)
        .any(|o| db.object(o).is_ok_and(|o| o.is_instance()))
}

/// Areas to repaint for a before/after pair. A single union box is used when
/// it is no larger than `ratio` times the two boxes combined.
pub(crate) fn redisplay_boxes(before: Bounds, after: Bounds, ratio: f64) -> Vec<Bounds> {
    match (before.is_empty(), after.is_empty()) {
        (true, true) => Vec::new(),
        (true, false) => vec![after],
        (false, true) => vec![before],
        (false, false) => {
            let union = before.union(&after);
            let separate = (before.area() + after.area()) as f64;
            if union.area() as f64 <= ratio * separate {
                vec![union]
            } else {
                vec![before, after]
            }
        }
    }
}

/// Before/after areas per display mode.
#[derive(Debug, Default)]
struct Damage {
    areas: Vec<(DisplayMode, Bounds, Bounds)>,
}

impl Damage {
    fn add(&mut self, mode: DisplayMode, before: Bounds, after: Bounds) {
        match self.areas.iter_mut().find(|(m, _, _)| *m == mode) {
            Some((_, b, a)) => {
                b.add(&before);
                a.add(&after);
            }
            None => self.areas.push((mode, before, after)),
        }
    }

    fn flush(self, display: &mut dyn collaborators::Display, ratio: f64) {
        for (mode, before, after) in self.areas {
            let boxes = redisplay_boxes(before, after, ratio);
            if !boxes.is_empty() {
                display.redisplay(&Redisplay::Boxes { mode, boxes });
            }
        }
    }
}

/// A record whose only effect cannot change what the cell looks like or
/// means: a symbolic-view toggle, or edits confined to internal layers of a
/// physical cell.
fn is_cosmetic(db: &Database, op: &Operation, kind: CellKind) -> bool {
    let symbolic_only = op.objects.is_empty()
        && !op.properties.is_empty()
        && op.properties.iter().all(|c| {
            matches!(c.owner, PropertyOwner::Cell(_))
                && c.delete
                    .into_iter()
                    .chain(c.add)
                    .all(|p| db.property(p).is_ok_and(|p| p.kind == PropertyKind::Symbolic))
        });
    let internal_only = kind == CellKind::Physical
        && op.properties.is_empty()
        && !op.objects.is_empty()
        && op
            .objects
            .iter()
            .flat_map(ObjectChange::objects)
            .all(|o| db.object(o).is_ok_and(|o| o.layer.internal));
    symbolic_only || internal_only
}

impl TransactionEngine {
    /// Commits the working record group.
    ///
    /// Every member is frozen, repaired and applied; members without changes
    /// are dropped. If anything changed the group is pushed onto the undo
    /// stack and the redo stack is cleared. A fresh working record is then
    /// opened on the current cell. Returns whether anything was committed.
    pub fn commit(&mut self, db: &mut Database, do_redisplay: bool, suppress_drc: bool) -> bool {
        let mut group = std::mem::take(&mut self.working);
        let mut damage = Damage::default();
        let mut kept = Vec::with_capacity(group.members.len());

        for mut op in group.members.drain(..) {
            if let Some((mode, before, after)) = self.commit_member(db, &mut op, suppress_drc) {
                damage.add(mode, before, after);
                kept.push(op);
            }
        }

        let changed = !kept.is_empty();
        if changed {
            let group = OperationGroup { members: kept };
            for op in &group.members {
                self.parent_connection_fixup(db, op);
            }

            let command = group.command().to_string();
            let cell = Self::cell_name(db, group.cell());
            let changes = group.change_count();

            let evicted = self.undo.push(group);
            self.reclaim(db, evicted);
            let stale = self.redo.clear();
            self.reclaim(db, stale);

            tracing::info!("Committed '{}' in {} ({} changes)", command, cell, changes);
            self.publish(EditorEvent::History(HistoryEvent::Committed {
                command,
                cell,
                changes,
            }));
        }

        self.reopen(db, "", db.current());

        if do_redisplay && changed {
            damage.flush(&mut *self.collab.display, self.display.redisplay_area_ratio);
        }
        changed
    }

    /// Applies one frozen member. Returns its display mode and before/after
    /// areas, or `None` if the member is dropped.
    fn commit_member(
        &mut self,
        db: &mut Database,
        op: &mut Operation,
        suppress_drc: bool,
    ) -> Option<(DisplayMode, Bounds, Bounds)> {
        for entry in op.freeze() {
            self.announce_object_change(entry.delete, entry.add);
            self.settle_object_change(db, op.cell, entry.delete, entry.add);
        }
        if !op.has_changes() {
            return None;
        }
        let Some(cell) = op.cell else {
            tracing::warn!(
                "Dropping {} changes of '{}' recorded outside any cell",
                op.change_count(),
                op.command
            );
            return None;
        };
        let kind = match db.cell(cell) {
            Ok(c) => c.kind,
            Err(e) => {
                tracing::warn!("Dropping changes of '{}': {}", op.command, e);
                return None;
            }
        };

        if is_cosmetic(db, op, kind) {
            op.flags.insert(OpFlags::NO_INCREMENT);
        }

        let pairs = instance_pairs(db, &op.objects, false);
        if !pairs.is_empty() {
            if let Err(e) = self.collab.instances.fix_labels(db, cell, &pairs, false) {
                self.collaborator_failed("label correction", &e);
            }
        }

        let instances = touches_instances(db, &op.objects);
        if instances {
            self.collab.display.erase_terminals(cell);
        }

        for change in &op.properties {
            if let Some(old) = change.delete {
                if let Ok(true) = db.unlink_property(change.owner, old) {
                    self.collab.display.erase_property_text(change.owner, old);
                }
            }
            if let Some(new) = change.add {
                match db.link_property(change.owner, new) {
                    Ok(_) => self.collab.display.show_property_text(change.owner, new),
                    Err(e) => tracing::warn!("Cannot link {} to {}: {}", new, change.owner, e),
                }
            }
        }

        let mut before = Bounds::empty();
        let mut after = Bounds::empty();
        for entry in &op.objects {
            if let Some(o) = entry.delete.and_then(|o| db.object(o).ok()) {
                before.add(&o.bounds);
            }
            if let Some(o) = entry.add.and_then(|o| db.object(o).ok()) {
                after.add(&o.bounds);
            }
        }

        let report = repair(db, &mut op.objects, self.settings.verbose_repair);
        if report.violations() > 0 {
            self.diagnostic(
                DiagnosticKind::Consistency,
                format!("Repaired '{}': {}", op.command, report),
            );
        }

        for object in op.objects.iter().filter_map(|e| e.delete) {
            if db.object(object).is_ok_and(|o| o.state == ObjectState::Deleted) {
                if let Err(e) = db.unlink_object(object) {
                    tracing::warn!("Cannot unlink deleted {}: {}", object, e);
                }
            }
        }
        if let Err(e) = db.recompute_bbox(cell) {
            tracing::warn!("Cannot recompute bounds of {}: {}", cell, e);
        }

        self.collab.drc.erase_markers(db, cell, &op.objects);
        if self.settings.incremental_drc && !suppress_drc {
            match self.collab.drc.run_incremental(db, cell, &op.objects) {
                Ok(Some(area)) => after.add(&area),
                Ok(None) => {}
                Err(e) => self.collaborator_failed("incremental design-rule check", &e),
            }
        }

        for entry in &op.objects {
            if let Some(old) = entry.delete {
                self.collab.schematic.uninstall(db, cell, old);
            }
            if let Some(new) = entry.add {
                self.collab.schematic.install(db, cell, new);
                if db.object(new).is_ok_and(|o| o.kind.is_wire()) {
                    self.collab.schematic.update_dots(db, cell, new);
                }
            }
        }
        self.collab.extraction.invalidate_groups(cell);

        if !op.flags.contains(OpFlags::NO_INCREMENT) {
            if let Ok(c) = db.cell_mut(cell) {
                c.modified += 1;
            }
            if let Err(e) = db.mark_unassociated(cell) {
                tracing::warn!("Cannot mark twin of {} unassociated: {}", cell, e);
            }
        }

        if instances {
            self.collab.display.show_terminals(cell);
        }

        Some((kind.into(), before, after))
    }
}
