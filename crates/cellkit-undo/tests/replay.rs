mod common;

use cellkit_core::event_bus::StatusEvent;
use cellkit_core::{Bounds, Point};
use cellkit_db::{
    CellFlags, CellKind, HyperLink, Layer, ObjectKind, ObjectState, PropertyKind, PropertyOwner,
};
use cellkit_undo::{DisplayMode, OpFlags, Redisplay};
use common::{Call, Harness};

#[test]
fn test_modified_counter_follows_history() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.place("place", 20);
    assert_eq!(h.modified(), 2);

    h.engine.undo(&mut h.db);
    assert_eq!(h.modified(), 1);
    h.engine.undo(&mut h.db);
    assert_eq!(h.modified(), 0);
    h.engine.redo(&mut h.db);
    assert_eq!(h.modified(), 1);
}

#[test]
fn test_holdover_inverts_modified_delta() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.engine.finalize(&mut h.db, true);
    assert_eq!(h.engine.undo_depth(), 1);

    h.engine.undo(&mut h.db);
    assert_eq!(h.modified(), 2);
    h.engine.redo(&mut h.db);
    assert_eq!(h.modified(), 1);
}

#[test]
fn test_internal_object_round_trips_in_normal_state() {
    let mut h = Harness::new(CellKind::Physical);
    h.begin("place");
    let o = h.shape(0);
    h.db.set_object_state(o, ObjectState::Internal).unwrap();
    assert!(h
        .engine
        .record_object_change(&mut h.db, h.cell, None, Some(o)));
    assert!(h.commit());
    let committed = h.state(o);
    assert_eq!(committed, Some(ObjectState::Normal));

    h.engine.undo(&mut h.db);
    assert!(!h.contains(o));
    h.engine.redo(&mut h.db);
    assert!(h.contains(o));
    assert_eq!(h.state(o), committed);
}

#[test]
fn test_empty_stacks_report_status() {
    let mut h = Harness::new(CellKind::Physical);
    assert!(!h.engine.undo(&mut h.db));
    assert!(!h.engine.redo(&mut h.db));
    assert_eq!(
        h.statuses(),
        vec![StatusEvent::NothingToUndo, StatusEvent::NothingToRedo]
    );
}

#[test]
fn test_undo_reports_command_and_cell() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.engine.undo(&mut h.db);
    h.engine.redo(&mut h.db);
    assert_eq!(
        h.statuses(),
        vec![
            StatusEvent::Undone {
                command: "place".to_string(),
                cell: "top".to_string(),
            },
            StatusEvent::Redone {
                command: "place".to_string(),
                cell: "top".to_string(),
            },
        ]
    );
}

#[test]
fn test_extraction_override_relaxed_during_replay() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("move", 0);
    h.probe.clear();
    h.engine.undo(&mut h.db);

    let overrides: Vec<Call> = h
        .probe
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::SetOverride(_)))
        .collect();
    assert_eq!(overrides, vec![Call::SetOverride(true), Call::SetOverride(false)]);
    assert!(!*h.probe.immutability_override.lock());
}

#[test]
fn test_flatten_keeps_extraction_override() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("flatten", 0);
    h.probe.clear();
    h.engine.undo(&mut h.db);
    h.engine.redo(&mut h.db);
    assert_eq!(h.probe.count(|c| matches!(c, Call::SetOverride(_))), 0);
}

#[test]
fn test_undo_cancels_drc_and_erases_markers() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.probe.clear();
    h.engine.undo(&mut h.db);
    let calls = h.probe.calls();
    assert_eq!(calls.first(), Some(&Call::CancelPending));
    assert!(calls.contains(&Call::EraseMarkers(h.cell)));
    assert!(calls.contains(&Call::RefreshParameters));
    assert!(calls.contains(&Call::RecomputeNodeMap));
}

#[test]
fn test_replay_redisplays_changed_area() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert_eq!(
        h.probe.redisplays(),
        vec![Redisplay::Boxes {
            mode: DisplayMode::Physical,
            boxes: vec![Bounds::new(0, 0, 10, 10)],
        }]
    );
}

#[test]
fn test_replay_off_screen_redraws_whole_mode() {
    let mut h = Harness::new(CellKind::Physical);
    h.place("place", 0);
    h.db.set_current(None).unwrap();
    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert_eq!(
        h.probe.redisplays(),
        vec![Redisplay::WholeMode(DisplayMode::Physical)]
    );
}

#[test]
fn test_selection_restored_when_command_was_selected() {
    let mut h = Harness::new(CellKind::Physical);
    h.engine
        .begin_transaction(&mut h.db, "duplicate", Some(h.cell), true);
    let o = h.add(0);
    assert!(h.commit());
    let head = h.engine.undo_stack().peek().unwrap();
    assert!(head.members()[0].flags().contains(OpFlags::WAS_SELECTED));

    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert!(h.probe.calls().contains(&Call::SelectRemove(o)));
    assert_eq!(h.probe.count(|c| matches!(c, Call::PurgeDeleted(_))), 0);

    h.probe.clear();
    h.engine.redo(&mut h.db);
    assert!(h.probe.calls().contains(&Call::SelectInsert(o)));
}

#[test]
fn test_unselected_command_purges_selection() {
    let mut h = Harness::new(CellKind::Physical);
    let o = h.place("place", 0);
    h.probe.clear();
    h.engine.undo(&mut h.db);
    let calls = h.probe.calls();
    assert!(calls.contains(&Call::PurgeDeleted(h.cell)));
    assert!(!calls.contains(&Call::SelectRemove(o)));
}

#[test]
fn test_next_transaction_clears_was_selected() {
    let mut h = Harness::new(CellKind::Physical);
    h.engine
        .begin_transaction(&mut h.db, "duplicate", Some(h.cell), true);
    h.add(0);
    h.commit();
    h.begin("next");
    let head = h.engine.undo_stack().peek().unwrap();
    assert!(!head.members()[0].flags().contains(OpFlags::WAS_SELECTED));
}

#[test]
fn test_replace_round_trip_notifies_display() {
    let mut h = Harness::new(CellKind::Physical);
    let old = h.place("place", 0);
    h.begin("move");
    let new = h.shape(30);
    h.engine
        .record_object_change(&mut h.db, h.cell, Some(old), Some(new));
    h.commit();

    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert!(h.contains(old));
    assert!(!h.contains(new));
    let calls = h.probe.calls();
    assert!(calls.contains(&Call::ObjectReplaced(new, Some(old))));
    assert!(calls.contains(&Call::ObjectIdentity(Some(new), Some(old))));
    assert!(calls.contains(&Call::Install(old)));
    assert!(calls.contains(&Call::Uninstall(new)));

    h.engine.redo(&mut h.db);
    assert!(!h.contains(old));
    assert!(h.contains(new));
}

#[test]
fn test_terminal_changes_reach_parents() {
    let mut h = Harness::new(CellKind::Electrical);
    let parent = h.db.create_cell("parent", CellKind::Electrical).unwrap();
    h.db.create_object(
        parent,
        ObjectKind::Instance { master: h.cell },
        Layer::new("inst"),
        Bounds::new(0, 0, 10, 10),
    )
    .unwrap();

    h.begin("add export");
    let node = h
        .db
        .create_property(PropertyKind::Node, "a", Some(Point::new(0, 5)));
    assert!(h
        .engine
        .record_property_change(&mut h.db, h.cell, None, None, Some(node)));
    assert!(h.commit());

    let calls = h.probe.calls();
    assert!(calls.contains(&Call::AddParentConnection(
        h.cell,
        "a".to_string(),
        Point::new(0, 5)
    )));
    assert!(calls.contains(&Call::RecomputeDerived(h.cell)));
    assert!(calls.contains(&Call::RefreshDirtyDots));

    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert!(!h.db.is_property_linked(PropertyOwner::Cell(h.cell), node));
    assert!(h.probe.calls().contains(&Call::MarkDotsDirty(parent)));

    h.probe.clear();
    h.engine.redo(&mut h.db);
    assert!(h.db.is_property_linked(PropertyOwner::Cell(h.cell), node));
    assert_eq!(
        h.probe.count(|c| matches!(c, Call::AddParentConnection(..))),
        1
    );
}

#[test]
fn test_physical_cells_skip_terminal_fixup() {
    let mut h = Harness::new(CellKind::Physical);
    h.begin("add export");
    let node = h.db.create_property(PropertyKind::Node, "a", None);
    h.engine
        .record_property_change(&mut h.db, h.cell, None, None, Some(node));
    h.commit();
    assert_eq!(
        h.probe.count(|c| matches!(c, Call::AddParentConnection(..))),
        0
    );
}

#[test]
fn test_known_flags_survive_only_if_still_valid() {
    let mut h = Harness::new(CellKind::Electrical);
    h.db.cell_mut(h.cell).unwrap().flags =
        CellFlags::CONNECTIVITY_KNOWN | CellFlags::DERIVED_KNOWN | CellFlags::USER_2;

    h.begin("flags");
    let p = h.db.create_property(PropertyKind::Flags, "0", None);
    h.engine
        .record_property_change(&mut h.db, h.cell, None, None, Some(p));
    h.commit();
    assert!(!h.db.cell(h.cell).unwrap().flags.contains(CellFlags::USER_2));

    h.db.cell_mut(h.cell)
        .unwrap()
        .flags
        .remove(CellFlags::DERIVED_KNOWN);
    h.engine.undo(&mut h.db);
    assert_eq!(
        h.db.cell(h.cell).unwrap().flags,
        CellFlags::CONNECTIVITY_KNOWN | CellFlags::USER_2
    );
}

#[test]
fn test_hyperlink_snapshot_rotates() {
    let mut h = Harness::new(CellKind::Physical);
    let p = h.db.create_property(PropertyKind::Other(1), "see", None);
    h.db.set_hyperlinks(p, vec![HyperLink::text("a")]).unwrap();

    h.begin("edit text");
    assert!(h.engine.save_hyper_snapshot(&h.db, p));
    assert!(!h.engine.save_hyper_snapshot(&h.db, p));
    h.db.set_hyperlinks(p, vec![HyperLink::text("b")]).unwrap();
    assert!(h.commit());

    h.engine.undo(&mut h.db);
    assert_eq!(h.db.hyperlinks(p), &[HyperLink::text("a")]);
    h.engine.redo(&mut h.db);
    assert_eq!(h.db.hyperlinks(p), &[HyperLink::text("b")]);
}

#[test]
fn test_grouped_cells_undo_together() {
    let mut h = Harness::new(CellKind::Physical);
    let sub = h.db.create_cell("sub", CellKind::Physical).unwrap();

    h.begin("array");
    assert!(h.engine.add_group_cell(&h.db, sub));
    assert!(!h.engine.add_group_cell(&h.db, sub));
    let a = h.add(0);
    let b = h
        .db
        .create_object(sub, ObjectKind::Shape, Layer::new("m1"), Bounds::new(0, 0, 2, 2))
        .unwrap();
    assert!(h.engine.record_object_change(&mut h.db, sub, None, Some(b)));
    assert!(h.commit());

    assert_eq!(h.engine.undo_depth(), 1);
    let record = h.engine.undo_stack().peek().unwrap();
    assert_eq!(record.members().len(), 2);
    assert!(record.targets(sub));
    assert_eq!(h.db.cell(sub).unwrap().modified, 1);

    h.engine.undo(&mut h.db);
    assert!(!h.contains(a));
    assert!(!h.db.cell_contains(sub, b));
    assert_eq!(h.modified(), 0);
    assert_eq!(h.db.cell(sub).unwrap().modified, 0);

    h.engine.redo(&mut h.db);
    assert!(h.contains(a));
    assert!(h.db.cell_contains(sub, b));
}

#[test]
fn test_nested_override_targets_owning_cell() {
    let mut h = Harness::new(CellKind::Electrical);
    let symbol = h.db.create_cell("top.sym", CellKind::Electrical).unwrap();
    h.db.set_symbolic_of(symbol, Some(h.cell)).unwrap();

    h.begin("outer");
    h.engine.push_nested(&h.db, "inner", Some(symbol), true);
    assert_eq!(h.engine.working().cell(), Some(h.cell));
    h.engine.pop_nested(&mut h.db);

    h.engine.push_nested(&h.db, "inner", Some(symbol), false);
    assert_eq!(h.engine.working().cell(), Some(symbol));
    h.engine.pop_nested(&mut h.db);
}

#[test]
fn test_unbalanced_pop_is_reported() {
    let mut h = Harness::new(CellKind::Physical);
    assert!(!h.engine.pop_nested(&mut h.db));
    assert!(h.events.lock().iter().any(|e| matches!(
        e,
        cellkit_core::event_bus::EditorEvent::Diagnostic(d)
            if d.kind == cellkit_core::event_bus::DiagnosticKind::Protocol
    )));
}

#[test]
fn test_symbolic_property_on_instance_recomputes_it() {
    let mut h = Harness::new(CellKind::Electrical);
    let leaf = h.db.create_cell("leaf", CellKind::Electrical).unwrap();
    h.begin("place");
    let inst = h
        .db
        .create_object(
            h.cell,
            ObjectKind::Instance { master: leaf },
            Layer::new("inst"),
            Bounds::new(0, 0, 4, 4),
        )
        .unwrap();
    h.engine
        .record_object_change(&mut h.db, h.cell, None, Some(inst));
    h.commit();

    h.begin("show symbol");
    let p = h.db.create_property(PropertyKind::Symbolic, "on", None);
    assert!(h
        .engine
        .record_property_change(&mut h.db, h.cell, Some(inst), None, Some(p)));
    h.commit();
    assert!(h
        .db
        .is_property_linked(PropertyOwner::Object(inst), p));

    h.probe.clear();
    h.engine.undo(&mut h.db);
    assert!(!h.db.is_property_linked(PropertyOwner::Object(inst), p));
    assert!(h.probe.calls().contains(&Call::RecomputeInstance(inst)));
}
