//! Recording changes into the working record, and rolling it back.

use super::TransactionEngine;
use crate::change::{ObjectChange, PropertyChange};
use crate::collaborators::report_failure;
use crate::operation::{OpFlags, Operation, OperationGroup};
use cellkit_core::event_bus::DiagnosticKind;
use cellkit_db::{
    CellFlags, CellId, Database, ObjectId, ObjectState, PropertyId, PropertyKind, PropertyOwner,
};

/// Database marking for a recorded object change: the new object is linked
/// and made normal, the old one is soft-deleted.
fn apply_marking(db: &mut Database, delete: Option<ObjectId>, add: Option<ObjectId>) {
    if let Some(new) = add {
        let result = db
            .link_object(new)
            .and_then(|_| db.set_object_state(new, ObjectState::Normal));
        if let Err(e) = result {
            tracing::warn!("Cannot mark {} live: {}", new, e);
        }
    }
    if let Some(old) = delete {
        if let Err(e) = db.set_object_state(old, ObjectState::Deleted) {
            tracing::warn!("Cannot mark {} deleted: {}", old, e);
        }
    }
}

fn is_instance(db: &Database, object: Option<ObjectId>) -> bool {
    object
        .and_then(|o| db.object(o).ok())
        .is_some_and(|o| o.is_instance())
}

impl TransactionEngine {
    /// Adds `cell` to the working group so that one action can span several
    /// cells. Returns false if it is already a member or unknown.
    pub fn add_group_cell(&mut self, db: &Database, cell: CellId) -> bool {
        if self.working.member_for(cell).is_some() {
            return false;
        }
        if let Err(e) = db.cell(cell) {
            tracing::warn!("Cannot group unknown cell: {}", e);
            return false;
        }
        if self.working.members.is_empty() {
            self.working = OperationGroup::open(db, "", None);
        }
        let command = self.working.command().to_string();
        match self.working.primary_mut() {
            Some(primary) if primary.cell.is_none() => primary.bind(db, cell),
            _ => self
                .working
                .members
                .push(Operation::open(db, &command, Some(cell))),
        }
        true
    }

    /// Index of the member recording changes for `cell`, adopting the cell if
    /// the record is not bound yet.
    fn route(&mut self, db: &Database, cell: CellId) -> Option<usize> {
        if self.working.members.is_empty() {
            self.working = OperationGroup::open(db, "", None);
        }
        if let Some(index) = self.working.member_for(cell) {
            return Some(index);
        }
        let primary = self.working.primary_mut()?;
        if primary.cell.is_none() {
            tracing::debug!("Transaction '{}' adopts cell {}", primary.command, cell);
            primary.bind(db, cell);
            return Some(0);
        }
        None
    }

    fn mismatch(&self, db: &Database, what: &str, cell: CellId) {
        let message = format!(
            "{} change in {} recorded against transaction '{}' on {}",
            what,
            Self::cell_name(db, Some(cell)),
            self.working.command(),
            Self::cell_name(db, self.working.cell())
        );
        tracing::warn!("{}", message);
        self.diagnostic(DiagnosticKind::Protocol, message);
    }

    /// Records that `old` was replaced by `new` in `cell`.
    ///
    /// Either side may be `None` for a pure add or delete, not both. The new
    /// object is linked and marked normal, the old one marked deleted.
    /// A change against a cell the transaction is not bound to is accepted
    /// into the primary record and flagged [`OpFlags::MISATTRIBUTED`].
    pub fn record_object_change(
        &mut self,
        db: &mut Database,
        cell: CellId,
        old: Option<ObjectId>,
        new: Option<ObjectId>,
    ) -> bool {
        if old.is_none() && new.is_none() {
            tracing::warn!("Object change in {} names neither an old nor a new object", cell);
            return false;
        }
        if old.is_some() && old == new {
            tracing::warn!("Object {:?} recorded as replacing itself", old);
            return false;
        }
        for object in old.into_iter().chain(new) {
            if let Err(e) = db.object(object) {
                tracing::warn!("Object change in {}: {}", cell, e);
                return false;
            }
        }

        let index = match self.route(db, cell) {
            Some(index) => index,
            None => {
                self.mismatch(db, "Object", cell);
                if let Some(primary) = self.working.primary_mut() {
                    primary.flags.insert(OpFlags::MISATTRIBUTED);
                }
                0
            }
        };

        self.announce_object_change(old, new);
        let Some(op) = self.working.members.get(index) else {
            return false;
        };
        op.push_object(ObjectChange::new(old, new));
        self.settle_object_change(db, Some(cell), old, new);
        true
    }

    /// Retargets script handles and property lists showing `old` before the
    /// change is appended.
    pub(super) fn announce_object_change(&mut self, old: Option<ObjectId>, new: Option<ObjectId>) {
        self.collab.scripting.update_object_identity(old, new);
        if let Some(old) = old {
            self.collab.display.object_replaced(old, new);
        }
    }

    /// Marks an appended change in the database and tells the display and
    /// instance services about instances it touched.
    pub(super) fn settle_object_change(
        &mut self,
        db: &mut Database,
        cell: Option<CellId>,
        old: Option<ObjectId>,
        new: Option<ObjectId>,
    ) {
        apply_marking(db, old, new);
        let Some(cell) = cell else {
            return;
        };
        if let (Some(old), true) = (old, is_instance(db, old)) {
            self.collab.display.erase_origin_marker(cell, old);
        }
        if let (Some(new), true) = (new, is_instance(db, new)) {
            self.collab.instances.abutment_changed(db, cell, new);
        }
    }

    /// Records that property `old` was replaced by `new` on `owner` (an
    /// object) or on the cell itself when `owner` is `None`.
    ///
    /// Re-parameterization requests and derived-geometry pseudo-properties are
    /// forwarded to [`InstanceServices`](crate::collaborators::InstanceServices)
    /// and not recorded. Returns whether the change was queued.
    pub fn record_property_change(
        &mut self,
        db: &mut Database,
        cell: CellId,
        owner: Option<ObjectId>,
        old: Option<PropertyId>,
        new: Option<PropertyId>,
    ) -> bool {
        if old.is_none() && new.is_none() {
            tracing::warn!("Property change in {} names neither an old nor a new property", cell);
            return false;
        }
        for property in old.into_iter().chain(new) {
            if let Err(e) = db.property(property) {
                tracing::warn!("Property change in {}: {}", cell, e);
                return false;
            }
        }

        let Some(index) = self.route(db, cell) else {
            self.mismatch(db, "Property", cell);
            return false;
        };
        let property_owner = owner.map_or(PropertyOwner::Cell(cell), PropertyOwner::Object);

        if let Some(property) = new.and_then(|p| db.property(p).ok()) {
            let kind = property.kind;
            let text = property.text.clone();
            let plain = property.plain_text();
            let value = property.flags_value();
            match kind {
                PropertyKind::ParamRequest => {
                    if let Err(e) = self
                        .collab
                        .instances
                        .regenerate_instance(db, cell, owner, &text)
                    {
                        self.collaborator_failed("instance regeneration", &e);
                    }
                    return false;
                }
                PropertyKind::DerivedGeometry => {
                    if let Err(e) =
                        self.collab
                            .instances
                            .derived_geometry(db, cell, property_owner, &plain)
                    {
                        self.collaborator_failed("derived geometry", &e);
                    }
                    return false;
                }
                PropertyKind::Flags if owner.is_none() => match value {
                    Some(value) => {
                        if let Ok(c) = db.cell_mut(cell) {
                            c.flags = (c.flags - CellFlags::USER) | CellFlags::from_user_value(value);
                        }
                    }
                    None => tracing::warn!("Ignoring malformed flags value {:?} on {}", text, cell),
                },
                PropertyKind::SubCellParams if owner.is_none() => {
                    if let Ok(c) = db.cell_mut(cell) {
                        c.flags.insert(CellFlags::SUB_MASTER);
                    }
                }
                _ => {}
            }
        }

        self.collab
            .scripting
            .update_property_identity(property_owner, old, new);
        match self.working.members.get_mut(index) {
            Some(op) => {
                op.properties.push(PropertyChange::new(property_owner, old, new));
                true
            }
            None => false,
        }
    }

    /// Rolls back the open working record, newest change first, and clears
    /// it. Objects and properties created only for this record are
    /// destroyed. Returns the number of changes undone.
    pub fn abort_transaction(&mut self, db: &mut Database) -> usize {
        let mut group = std::mem::take(&mut self.working);
        let mut undone = 0usize;
        let mut added_objects = Vec::new();
        let mut added_properties = Vec::new();

        for op in group.members.iter_mut().rev() {
            for entry in op.drain_pending() {
                if let Some(new) = entry.add {
                    let result = db
                        .unlink_object(new)
                        .and_then(|_| db.set_object_state(new, ObjectState::Deleted));
                    if let Err(e) = result {
                        tracing::debug!("Abort could not remove {}: {}", new, e);
                    }
                    added_objects.push(new);
                }
                if let Some(old) = entry.delete {
                    let result = db
                        .link_object(old)
                        .and_then(|_| db.set_object_state(old, ObjectState::Normal));
                    if let Err(e) = result {
                        tracing::debug!("Abort could not restore {}: {}", old, e);
                    }
                }
                undone += 1;
            }

            for change in op.properties.drain(..).rev() {
                if let PropertyOwner::Object(_) = change.owner {
                    if let Some(new) = change.add {
                        if let Err(e) = db.unlink_property(change.owner, new) {
                            tracing::debug!("Abort could not unlink {}: {}", new, e);
                        }
                    }
                    if let Some(old) = change.delete {
                        if let Err(e) = db.link_property(change.owner, old) {
                            tracing::debug!("Abort could not relink {}: {}", old, e);
                        }
                    }
                }
                added_properties.extend(change.add);
                undone += 1;
            }

            for snapshot in op.hyper.drain(..) {
                if let Err(e) = db.set_hyperlinks(snapshot.property, snapshot.links) {
                    tracing::debug!("Abort could not restore hyperlinks: {}", e);
                }
                undone += 1;
            }

            if let Some(cell) = op.cell {
                let snapshot = std::mem::take(&mut op.prop_snapshot);
                if let Err(e) = db.replace_cell_properties(cell, snapshot) {
                    tracing::debug!("Abort could not restore properties of {}: {}", cell, e);
                }
                if let Ok(c) = db.cell_mut(cell) {
                    c.flags = op.cell_flags;
                }
                if let Err(e) = db.recompute_bbox(cell) {
                    tracing::debug!("Abort could not recompute bounds of {}: {}", cell, e);
                }
            }
        }

        let (live_objects, live_properties) = self.referenced();
        for object in added_objects {
            if !live_objects.contains(&object) && db.contains_object(object) && !db.is_linked(object) {
                if let Err(e) = db.destroy_object(object) {
                    tracing::debug!("Abort could not destroy {}: {}", object, e);
                }
            }
        }
        for property in added_properties {
            if !live_properties.contains(&property)
                && db.contains_property(property)
                && !db.is_property_linked_anywhere(property)
            {
                if let Err(e) = db.destroy_property(property) {
                    tracing::debug!("Abort could not destroy {}: {}", property, e);
                }
            }
        }

        tracing::debug!("Aborted transaction '{}' ({} changes)", group.command(), undone);
        let cell = group.cell();
        self.rebind(db, "", cell);
        undone
    }

    pub(super) fn collaborator_failed(&self, step: &str, err: &cellkit_core::CollaboratorError) {
        report_failure(step, err);
        self.diagnostic(DiagnosticKind::Collaborator, format!("{} failed: {}", step, err));
    }
}
