//! Consistency repair of a frozen object-change list.
//!
//! Runs at commit before anything is unlinked. The list may contain
//! duplicates, stale object states, or objects created and removed within the
//! same transaction. Nothing here fails: every inconsistency is logged and
//! corrected so the list that comes out is safe to apply.

use crate::change::ObjectChange;
use cellkit_db::{Database, ObjectId, ObjectState};
use std::collections::{HashMap, HashSet};

/// What the repair pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Add references dropped because the object was already added.
    pub duplicate_adds: usize,
    /// Delete references dropped because the object was already deleted.
    pub duplicate_deletes: usize,
    /// Delete-side objects that were not in the deleted state.
    pub wrong_state: usize,
    /// References to objects that no longer exist.
    pub dangling: usize,
    /// Objects added and then deleted again; destroyed outright.
    pub transient: usize,
    /// Objects deleted and then added back; both references dropped.
    pub resurrected: usize,
    /// Added objects found deleted with no matching delete entry.
    pub unmatched: usize,
}

impl RepairReport {
    /// Repairs that point at a bug upstream rather than normal editing.
    pub fn violations(&self) -> usize {
        self.duplicate_adds + self.duplicate_deletes + self.wrong_state + self.dangling + self.unmatched
    }

    pub fn is_clean(&self) -> bool {
        self.violations() == 0 && self.transient == 0 && self.resurrected == 0
    }
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} duplicate adds, {} duplicate deletes, {} wrong states, {} dangling, \
             {} transient, {} resurrected, {} unmatched",
            self.duplicate_adds,
            self.duplicate_deletes,
            self.wrong_state,
            self.dangling,
            self.transient,
            self.resurrected,
            self.unmatched
        )
    }
}

fn note(verbose: bool, what: &str, object: ObjectId) {
    if verbose {
        tracing::debug!("Repair: {} {}", what, object);
    } else {
        tracing::trace!("Repair: {} {}", what, object);
    }
}

fn state(db: &Database, object: ObjectId) -> Option<ObjectState> {
    db.object(object).ok().map(|o| o.state)
}

/// Repairs `entries` (chronological order) in place.
pub(crate) fn repair(db: &mut Database, entries: &mut Vec<ObjectChange>, verbose: bool) -> RepairReport {
    let mut report = RepairReport::default();

    for entry in entries.iter_mut() {
        for side in [&mut entry.delete, &mut entry.add] {
            if let Some(object) = *side {
                if !db.contains_object(object) {
                    note(verbose, "dangling reference to", object);
                    *side = None;
                    report.dangling += 1;
                }
            }
        }
    }

    // Deleted, added back and deleted again: the re-add and the second delete
    // cancel, leaving the first delete.
    let mut deleted = HashSet::new();
    let mut readded: HashMap<ObjectId, usize> = HashMap::new();
    for i in 0..entries.len() {
        if let Some(object) = entries[i].delete {
            if let Some(j) = readded.remove(&object) {
                note(verbose, "re-add and delete of", object);
                entries[j].add = None;
                entries[i].delete = None;
                report.resurrected += 1;
            } else {
                deleted.insert(object);
            }
        }
        if let Some(object) = entries[i].add {
            if deleted.contains(&object) {
                readded.insert(object, i);
            }
        }
    }

    let mut seen = HashSet::new();
    for entry in entries.iter_mut() {
        if let Some(object) = entry.add {
            if !seen.insert(object) {
                note(verbose, "duplicate add of", object);
                entry.add = None;
                report.duplicate_adds += 1;
            }
        }
    }
    seen.clear();
    for entry in entries.iter_mut() {
        if let Some(object) = entry.delete {
            if !seen.insert(object) {
                note(verbose, "duplicate delete of", object);
                entry.delete = None;
                report.duplicate_deletes += 1;
            }
        }
    }

    let added_at: HashMap<ObjectId, usize> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.add.map(|o| (o, i)))
        .collect();

    // Deleted and later added back (or replaced by itself): a net no-op.
    for i in 0..entries.len() {
        let Some(object) = entries[i].delete else {
            continue;
        };
        let Some(&j) = added_at.get(&object) else {
            continue;
        };
        if j == i {
            if let Err(e) = db.set_object_state(object, ObjectState::Normal) {
                tracing::debug!("Repair could not restore {}: {}", object, e);
            }
        } else if j < i || state(db, object) == Some(ObjectState::Deleted) {
            continue;
        }
        note(verbose, "delete and re-add of", object);
        entries[i].delete = None;
        entries[j].add = None;
        report.resurrected += 1;
    }

    for entry in entries.iter() {
        if let Some(object) = entry.delete {
            if let Ok(o) = db.object_mut(object) {
                if o.state != ObjectState::Deleted {
                    o.state = ObjectState::Deleted;
                    note(verbose, "forced deleted state on", object);
                    report.wrong_state += 1;
                }
            }
        }
    }

    // Added objects that are already deleted again.
    let mut transient: HashMap<ObjectId, usize> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.add.map(|o| (o, i)))
        .filter(|(o, _)| state(db, *o) == Some(ObjectState::Deleted))
        .collect();

    for i in 0..entries.len() {
        let Some(object) = entries[i].delete else {
            continue;
        };
        let Some(&j) = transient.get(&object) else {
            continue;
        };
        if j >= i {
            continue;
        }
        transient.remove(&object);
        if let Err(e) = db.destroy_object(object) {
            tracing::debug!("Repair could not destroy transient {}: {}", object, e);
        }
        note(verbose, "destroyed transient", object);
        entries[j].add = None;
        entries[i].delete = None;
        report.transient += 1;
    }

    if !transient.is_empty() {
        tracing::warn!(
            "Additions and deletions don't match: {} added objects were deleted without a record",
            transient.len()
        );
        for (object, j) in transient {
            entries[j].add = None;
            if let Err(e) = db.unlink_object(object) {
                tracing::debug!("Repair could not unlink {}: {}", object, e);
            }
            report.unmatched += 1;
        }
    }

    entries.retain(|e| !e.is_empty());

    if !report.is_clean() {
        tracing::debug!("Repair pass: {}", report);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellkit_core::Bounds;
    use cellkit_db::{CellId, CellKind, Layer, ObjectKind};

    fn setup(n: usize) -> (Database, CellId, Vec<ObjectId>) {
        let mut db = Database::new();
        let cell = db.create_cell("a", CellKind::Physical).unwrap();
        let ids = (0..n)
            .map(|i| {
                let o = db
                    .create_object(
                        cell,
                        ObjectKind::Shape,
                        Layer::new("m1"),
                        Bounds::new(0, 0, i as i64 + 1, 1),
                    )
                    .unwrap();
                db.set_object_state(o, ObjectState::Normal).unwrap();
                o
            })
            .collect();
        (db, cell, ids)
    }

    #[test]
    fn test_clean_list_untouched() {
        let (mut db, _, ids) = setup(2);
        db.set_object_state(ids[0], ObjectState::Deleted).unwrap();
        let mut entries = vec![ObjectChange::new(Some(ids[0]), Some(ids[1]))];
        let report = repair(&mut db, &mut entries, true);
        assert!(report.is_clean());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_duplicates_dropped() {
        let (mut db, _, ids) = setup(2);
        db.set_object_state(ids[1], ObjectState::Deleted).unwrap();
        let mut entries = vec![
            ObjectChange::new(None, Some(ids[0])),
            ObjectChange::new(None, Some(ids[0])),
            ObjectChange::new(Some(ids[1]), None),
            ObjectChange::new(Some(ids[1]), None),
        ];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.duplicate_adds, 1);
        assert_eq!(report.duplicate_deletes, 1);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_wrong_state_forced() {
        let (mut db, _, ids) = setup(1);
        let mut entries = vec![ObjectChange::new(Some(ids[0]), None)];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.wrong_state, 1);
        assert_eq!(db.object(ids[0]).unwrap().state, ObjectState::Deleted);
    }

    #[test]
    fn test_transient_destroyed() {
        let (mut db, cell, ids) = setup(1);
        db.set_object_state(ids[0], ObjectState::Deleted).unwrap();
        let mut entries = vec![
            ObjectChange::new(None, Some(ids[0])),
            ObjectChange::new(Some(ids[0]), None),
        ];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.transient, 1);
        assert_eq!(report.violations(), 0);
        assert!(entries.is_empty());
        assert!(!db.contains_object(ids[0]));
        assert!(db.cell(cell).unwrap().objects.is_empty());
    }

    #[test]
    fn test_delete_then_readd_cancels() {
        let (mut db, _, ids) = setup(1);
        let mut entries = vec![
            ObjectChange::new(Some(ids[0]), None),
            ObjectChange::new(None, Some(ids[0])),
        ];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.resurrected, 1);
        assert!(entries.is_empty());
        assert_eq!(db.object(ids[0]).unwrap().state, ObjectState::Normal);
    }

    #[test]
    fn test_delete_readd_delete_keeps_first_delete() {
        let (mut db, cell, ids) = setup(1);
        db.set_object_state(ids[0], ObjectState::Deleted).unwrap();
        let mut entries = vec![
            ObjectChange::new(Some(ids[0]), None),
            ObjectChange::new(None, Some(ids[0])),
            ObjectChange::new(Some(ids[0]), None),
        ];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.resurrected, 1);
        assert_eq!(report.unmatched, 0);
        assert_eq!(report.violations(), 0);
        assert_eq!(entries, vec![ObjectChange::new(Some(ids[0]), None)]);
        assert!(db.contains_object(ids[0]));
        assert!(db.cell_contains(cell, ids[0]));
        assert_eq!(db.object(ids[0]).unwrap().state, ObjectState::Deleted);
    }

    #[test]
    fn test_unmatched_add_unlinked_not_destroyed() {
        let (mut db, cell, ids) = setup(1);
        db.set_object_state(ids[0], ObjectState::Deleted).unwrap();
        let mut entries = vec![ObjectChange::new(None, Some(ids[0]))];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.unmatched, 1);
        assert!(entries.is_empty());
        assert!(db.contains_object(ids[0]));
        assert!(!db.cell_contains(cell, ids[0]));
    }

    #[test]
    fn test_dangling_dropped() {
        let (mut db, _, ids) = setup(2);
        db.destroy_object(ids[0]).unwrap();
        let mut entries = vec![ObjectChange::new(Some(ids[0]), Some(ids[1]))];
        let report = repair(&mut db, &mut entries, false);
        assert_eq!(report.dangling, 1);
        assert_eq!(entries, vec![ObjectChange::new(None, Some(ids[1]))]);
    }
}
