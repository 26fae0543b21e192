//! Shared fixtures: a database with one cell, an engine wired to a
//! collaborator double that logs every call.

#![allow(dead_code)]

use cellkit_core::error::CollaboratorError;
use cellkit_core::event_bus::{EditorEvent, EventBus, EventFilter, StatusEvent};
use cellkit_core::types::{thread_safe_vec, ThreadSafe, ThreadSafeVec};
use cellkit_core::{Bounds, Point};
use cellkit_db::{
    CellId, CellKind, Database, Layer, ObjectId, ObjectKind, ObjectState, PropertyId,
    PropertyOwner,
};
use cellkit_settings::{DisplaySettings, UndoSettings};
use cellkit_undo::collaborators::Display;
use cellkit_undo::{
    Collaborators, DesignRuleCheck, InstanceServices, NetExtraction, ObjectChange, Redisplay,
    Schematic, Scripting, SelectionSet, TransactionEngine,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EraseMarkers(CellId),
    RunIncremental(CellId, usize),
    CancelPending,
    InvalidateGroups(CellId),
    SetOverride(bool),
    Install(ObjectId),
    Uninstall(ObjectId),
    UpdateDots(ObjectId),
    MarkDotsDirty(CellId),
    RefreshDirtyDots,
    RecomputeNodeMap,
    AssertSymbolic(CellId, bool),
    AddParentConnection(CellId, String, Point),
    SuppressRedisplay(bool),
    SelectInsert(ObjectId),
    SelectRemove(ObjectId),
    PurgeDeleted(CellId),
    Redisplay(Redisplay),
    ShowTerminals(CellId),
    EraseTerminals(CellId),
    EraseOrigin(ObjectId),
    ShowPropertyText(PropertyId),
    ErasePropertyText(PropertyId),
    ObjectReplaced(ObjectId, Option<ObjectId>),
    ObjectIdentity(Option<ObjectId>, Option<ObjectId>),
    PropertyIdentity(Option<PropertyId>, Option<PropertyId>),
    FixLabels(Vec<(ObjectId, ObjectId)>, bool),
    Regenerate(Option<ObjectId>, String),
    DerivedGeometry(String),
    Abutment(ObjectId),
    RecomputeInstance(ObjectId),
    RecomputeDerived(CellId),
    RecomputeReflected(CellId),
    RefreshParameters,
}

/// Collaborator double. Clones share the call log and configuration.
#[derive(Clone, Default)]
pub struct Probe {
    pub calls: ThreadSafeVec<Call>,
    pub immutability_override: ThreadSafe<bool>,
    pub drc_area: ThreadSafe<Option<Bounds>>,
    pub fail_labels: ThreadSafe<bool>,
}

impl Probe {
    fn log(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn redisplays(&self) -> Vec<Redisplay> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Redisplay(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::default()
            .with_drc(self.clone())
            .with_extraction(self.clone())
            .with_schematic(self.clone())
            .with_selection(self.clone())
            .with_display(self.clone())
            .with_scripting(self.clone())
            .with_instances(self.clone())
    }
}

impl DesignRuleCheck for Probe {
    fn erase_markers(&mut self, _db: &Database, cell: CellId, _changes: &[ObjectChange]) {
        self.log(Call::EraseMarkers(cell));
    }

    fn run_incremental(
        &mut self,
        _db: &Database,
        cell: CellId,
        changes: &[ObjectChange],
    ) -> Result<Option<Bounds>, CollaboratorError> {
        self.log(Call::RunIncremental(cell, changes.len()));
        Ok(*self.drc_area.lock())
    }

    fn cancel_pending(&mut self) {
        self.log(Call::CancelPending);
    }
}

impl NetExtraction for Probe {
    fn invalidate_groups(&mut self, cell: CellId) {
        self.log(Call::InvalidateGroups(cell));
    }

    fn set_immutability_override(&mut self, enabled: bool) {
        *self.immutability_override.lock() = enabled;
        self.log(Call::SetOverride(enabled));
    }

    fn immutability_override(&self) -> bool {
        *self.immutability_override.lock()
    }
}

impl Schematic for Probe {
    fn install(&mut self, _db: &Database, _cell: CellId, object: ObjectId) {
        self.log(Call::Install(object));
    }

    fn uninstall(&mut self, _db: &Database, _cell: CellId, object: ObjectId) {
        self.log(Call::Uninstall(object));
    }

    fn update_dots(&mut self, _db: &Database, _cell: CellId, object: ObjectId) {
        self.log(Call::UpdateDots(object));
    }

    fn mark_dots_dirty(&mut self, cell: CellId) {
        self.log(Call::MarkDotsDirty(cell));
    }

    fn refresh_dirty_dots(&mut self, _db: &Database) {
        self.log(Call::RefreshDirtyDots);
    }

    fn recompute_node_map(&mut self, _db: &Database) {
        self.log(Call::RecomputeNodeMap);
    }

    fn assert_symbolic(&mut self, cell: CellId, symbolic: bool) {
        self.log(Call::AssertSymbolic(cell, symbolic));
    }

    fn add_parent_connection(&mut self, _db: &Database, cell: CellId, terminal: &str, at: Point) {
        self.log(Call::AddParentConnection(cell, terminal.to_string(), at));
    }

    fn suppress_redisplay(&mut self, suppress: bool) {
        self.log(Call::SuppressRedisplay(suppress));
    }
}

impl SelectionSet for Probe {
    fn insert(&mut self, _cell: CellId, object: ObjectId) {
        self.log(Call::SelectInsert(object));
    }

    fn remove(&mut self, _cell: CellId, object: ObjectId) {
        self.log(Call::SelectRemove(object));
    }

    fn purge_deleted(&mut self, _db: &Database, cell: CellId) {
        self.log(Call::PurgeDeleted(cell));
    }
}

impl Display for Probe {
    fn redisplay(&mut self, request: &Redisplay) {
        self.log(Call::Redisplay(request.clone()));
    }

    fn show_terminals(&mut self, cell: CellId) {
        self.log(Call::ShowTerminals(cell));
    }

    fn erase_terminals(&mut self, cell: CellId) {
        self.log(Call::EraseTerminals(cell));
    }

    fn erase_origin_marker(&mut self, _cell: CellId, instance: ObjectId) {
        self.log(Call::EraseOrigin(instance));
    }

    fn show_property_text(&mut self, _owner: PropertyOwner, property: PropertyId) {
        self.log(Call::ShowPropertyText(property));
    }

    fn erase_property_text(&mut self, _owner: PropertyOwner, property: PropertyId) {
        self.log(Call::ErasePropertyText(property));
    }

    fn object_replaced(&mut self, old: ObjectId, new: Option<ObjectId>) {
        self.log(Call::ObjectReplaced(old, new));
    }
}

impl Scripting for Probe {
    fn update_object_identity(&mut self, old: Option<ObjectId>, new: Option<ObjectId>) {
        self.log(Call::ObjectIdentity(old, new));
    }

    fn update_property_identity(
        &mut self,
        _owner: PropertyOwner,
        old: Option<PropertyId>,
        new: Option<PropertyId>,
    ) {
        self.log(Call::PropertyIdentity(old, new));
    }
}

impl InstanceServices for Probe {
    fn fix_labels(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        pairs: &[(ObjectId, ObjectId)],
        reverse: bool,
    ) -> Result<(), CollaboratorError> {
        self.log(Call::FixLabels(pairs.to_vec(), reverse));
        if *self.fail_labels.lock() {
            return Err(CollaboratorError::CreateFailed {
                collaborator: "labels".to_string(),
                what: "instance label".to_string(),
            });
        }
        Ok(())
    }

    fn regenerate_instance(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        instance: Option<ObjectId>,
        request: &str,
    ) -> Result<(), CollaboratorError> {
        self.log(Call::Regenerate(instance, request.to_string()));
        Ok(())
    }

    fn derived_geometry(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        _owner: PropertyOwner,
        text: &str,
    ) -> Result<(), CollaboratorError> {
        self.log(Call::DerivedGeometry(text.to_string()));
        Ok(())
    }

    fn abutment_changed(&mut self, _db: &Database, _cell: CellId, instance: ObjectId) {
        self.log(Call::Abutment(instance));
    }

    fn recompute_instance(&mut self, _db: &mut Database, _cell: CellId, instance: ObjectId) {
        self.log(Call::RecomputeInstance(instance));
    }

    fn recompute_derived(&mut self, _db: &mut Database, cell: CellId) {
        self.log(Call::RecomputeDerived(cell));
    }

    fn recompute_reflected(&mut self, _db: &mut Database, cell: CellId) {
        self.log(Call::RecomputeReflected(cell));
    }

    fn refresh_parameters(&mut self) {
        self.log(Call::RefreshParameters);
    }
}

/// A database with one current cell named `top` and an engine wired to a
/// [`Probe`].
pub struct Harness {
    pub db: Database,
    pub engine: TransactionEngine,
    pub probe: Probe,
    pub events: ThreadSafeVec<EditorEvent>,
    pub cell: CellId,
}

impl Harness {
    pub fn new(kind: CellKind) -> Self {
        Self::with_settings(kind, UndoSettings::default())
    }

    pub fn with_settings(kind: CellKind, settings: UndoSettings) -> Self {
        let mut db = Database::new();
        let cell = db.create_cell("top", kind).unwrap();
        db.set_current(Some(cell)).unwrap();

        let bus = Arc::new(EventBus::new());
        let events = thread_safe_vec();
        let sink = Arc::clone(&events);
        bus.subscribe(EventFilter::All, move |event| sink.lock().push(event));

        let probe = Probe::default();
        let engine = TransactionEngine::new(
            settings,
            DisplaySettings::default(),
            probe.collaborators(),
            bus,
        );
        Self {
            db,
            engine,
            probe,
            events,
            cell,
        }
    }

    pub fn begin(&mut self, command: &str) {
        let cell = self.cell;
        self.engine
            .begin_transaction(&mut self.db, command, Some(cell), false);
    }

    pub fn commit(&mut self) -> bool {
        self.engine.commit(&mut self.db, true, false)
    }

    /// Creates a shape on `layer` without recording it.
    pub fn shape_on(&mut self, x: i64, layer: Layer) -> ObjectId {
        self.db
            .create_object(
                self.cell,
                ObjectKind::Shape,
                layer,
                Bounds::new(x, 0, x + 10, 10),
            )
            .unwrap()
    }

    pub fn shape(&mut self, x: i64) -> ObjectId {
        self.shape_on(x, Layer::new("metal1"))
    }

    /// Creates and records a new shape.
    pub fn add(&mut self, x: i64) -> ObjectId {
        let object = self.shape(x);
        assert!(self
            .engine
            .record_object_change(&mut self.db, self.cell, None, Some(object)));
        object
    }

    pub fn delete(&mut self, object: ObjectId) {
        assert!(self
            .engine
            .record_object_change(&mut self.db, self.cell, Some(object), None));
    }

    /// Commits a transaction that adds one shape.
    pub fn place(&mut self, command: &str, x: i64) -> ObjectId {
        self.begin(command);
        let object = self.add(x);
        assert!(self.commit());
        object
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.db.cell_contains(self.cell, object)
    }

    pub fn state(&self, object: ObjectId) -> Option<ObjectState> {
        self.db.object(object).ok().map(|o| o.state)
    }

    pub fn modified(&self) -> i64 {
        self.db.cell(self.cell).unwrap().modified
    }

    pub fn statuses(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EditorEvent::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}
