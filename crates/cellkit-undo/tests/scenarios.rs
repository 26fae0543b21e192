mod common;

use cellkit_core::event_bus::{EditorEvent, HistoryEvent};
use cellkit_db::{CellKind, PropertyKind};
use cellkit_settings::UndoSettings;
use common::Harness;

#[test]
fn test_add_commit_undo_redo() {
    let mut h = Harness::new(CellKind::Physical);
    h.begin("place");
    let o1 = h.add(0);
    assert!(h.commit());
    assert!(h.contains(o1));
    assert_eq!(h.engine.undo_depth(), 1);

    assert!(h.engine.undo(&mut h.db));
    assert!(!h.contains(o1));
    assert_eq!(h.engine.redo_depth(), 1);

    assert!(h.engine.redo(&mut h.db));
    assert!(h.contains(o1));
    assert_eq!(h.engine.undo_depth(), 1);
    assert_eq!(h.engine.redo_depth(), 0);
}

#[test]
fn test_add_then_delete_in_one_transaction() {
    let mut h = Harness::new(CellKind::Physical);
    h.begin("scratch");
    let o1 = h.add(0);
    h.delete(o1);
    assert!(h.commit());

    assert!(!h.contains(o1));
    assert!(!h.db.contains_object(o1));
    let record = h.engine.undo_stack().peek().unwrap();
    assert!(record.members()[0].object_changes().is_empty());

    h.engine.undo(&mut h.db);
    assert!(!h.db.contains_object(o1));
    assert!(h.db.cell(h.cell).unwrap().objects.is_empty());
}

#[test]
fn test_symbolic_toggle_keeps_modified_count() {
    let mut h = Harness::new(CellKind::Electrical);
    h.begin("symbolic view");
    let toggle = h.db.create_property(PropertyKind::Symbolic, "on", None);
    assert!(h
        .engine
        .record_property_change(&mut h.db, h.cell, None, None, Some(toggle)));
    assert!(h.commit());

    assert_eq!(h.modified(), 0);
    assert!(h.db.is_symbolic(h.cell));
    assert_eq!(h.engine.undo_depth(), 1);

    assert!(h.engine.undo(&mut h.db));
    assert!(!h.db.is_symbolic(h.cell));
    assert_eq!(h.modified(), 0);
    assert!(h.engine.redo(&mut h.db));
    assert!(h.db.is_symbolic(h.cell));
}

#[test]
fn test_history_bound_keeps_newest() {
    let settings = UndoSettings {
        history_length: 4,
        ..UndoSettings::default()
    };
    let mut h = Harness::with_settings(CellKind::Physical, settings);
    for i in 0..9 {
        h.place(&format!("place {}", i), i * 20);
    }
    assert_eq!(h.engine.undo_depth(), 4);
    assert_eq!(
        h.engine.undo_names(),
        vec!["place 8", "place 7", "place 6", "place 5"]
    );
    for _ in 0..4 {
        assert!(h.engine.undo(&mut h.db));
    }
    assert!(!h.engine.undo(&mut h.db));
}

#[test]
fn test_evicted_records_are_reclaimed() {
    let settings = UndoSettings {
        history_length: 1,
        ..UndoSettings::default()
    };
    let mut h = Harness::with_settings(CellKind::Physical, settings);
    let o1 = h.place("place", 0);

    h.begin("delete");
    h.delete(o1);
    assert!(h.commit());
    assert!(h.db.contains_object(o1));

    h.place("place again", 40);
    assert!(!h.db.contains_object(o1));
}

#[test]
fn test_commit_clears_redo() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("first", 0);
    h.engine.undo(&mut h.db);
    assert_eq!(h.engine.redo_depth(), 1);

    h.engine.reset_transaction(&h.db, true, false);
    h.add(50);
    assert!(h.commit());
    assert_eq!(h.engine.redo_depth(), 0);
    assert!(!h.engine.can_redo());
}

#[test]
fn test_empty_nested_leaves_outer_untouched() {
    let mut h = Harness::new(CellKind::Physical);
    h.begin("outer");
    let o1 = h.add(0);
    let before = h.engine.working().change_count();

    h.engine.push_nested(&h.db, "inner", None, false);
    assert_eq!(h.engine.nesting_depth(), 1);
    assert!(!h.engine.pop_nested(&mut h.db));

    assert_eq!(h.engine.nesting_depth(), 0);
    assert_eq!(h.engine.working().command(), "outer");
    assert_eq!(h.engine.working().change_count(), before);
    assert_eq!(h.engine.undo_depth(), 0);

    assert!(h.commit());
    assert!(h.contains(o1));
    assert_eq!(h.engine.undo_names(), vec!["outer"]);
}

#[test]
fn test_commit_publishes_history_event() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    let events = h.events.lock().clone();
    assert!(events.iter().any(|e| matches!(
        e,
        EditorEvent::History(HistoryEvent::Committed { command, cell, changes })
            if command == "place" && cell == "top" && *changes == 1
    )));
}
