//! The design database.
//!
//! An id-keyed store of cells, objects and properties. Objects and properties
//! are never destroyed as a side effect of unlinking; callers decide when a
//! hard delete is safe.

use crate::cell::{Cell, CellKind};
use crate::hyper::HyperLink;
use crate::ids::{CellId, ObjectId, PropertyId};
use crate::object::{DesignObject, Layer, ObjectKind, ObjectState};
use crate::property::{Property, PropertyKind, PropertyOwner};
use crate::DatabaseResult;
use cellkit_core::error::DatabaseError;
use cellkit_core::{Bounds, Point};
use std::collections::HashMap;

/// Store of all cells, objects and properties.
#[derive(Debug, Default)]
pub struct Database {
    cells: HashMap<CellId, Cell>,
    names: HashMap<String, CellId>,
    objects: HashMap<ObjectId, DesignObject>,
    properties: HashMap<PropertyId, Property>,
    hyperlinks: HashMap<PropertyId, Vec<HyperLink>>,
    next_id: u64,
    current: Option<CellId>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ---- cells -----------------------------------------------------------

    /// Creates an empty cell. Names are unique.
    pub fn create_cell(&mut self, name: impl Into<String>, kind: CellKind) -> DatabaseResult<CellId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(DatabaseError::DuplicateCellName { name });
        }
        let id = CellId(self.allocate());
        self.names.insert(name.clone(), id);
        self.cells.insert(id, Cell::new(id, name, kind));
        tracing::trace!("Created cell {}", id);
        Ok(id)
    }

    pub fn cell(&self, id: CellId) -> DatabaseResult<&Cell> {
        self.cells
            .get(&id)
            .ok_or(DatabaseError::UnknownCell { id: id.raw() })
    }

    pub fn cell_mut(&mut self, id: CellId) -> DatabaseResult<&mut Cell> {
        self.cells
            .get_mut(&id)
            .ok_or(DatabaseError::UnknownCell { id: id.raw() })
    }

    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Marks `cell` as the symbolic view of `owner`.
    pub fn set_symbolic_of(&mut self, cell: CellId, owner: Option<CellId>) -> DatabaseResult<()> {
        if let Some(owner) = owner {
            self.cell(owner)?;
        }
        self.cell_mut(cell)?.symbolic_of = owner;
        Ok(())
    }

    /// Pairs two cells as electrical/physical twins.
    pub fn set_twin(&mut self, a: CellId, b: CellId) -> DatabaseResult<()> {
        self.cell(b)?;
        let cell = self.cell_mut(a)?;
        cell.twin = Some(b);
        cell.associated = true;
        let cell = self.cell_mut(b)?;
        cell.twin = Some(a);
        cell.associated = true;
        Ok(())
    }

    /// Flags the twin of `cell` (if any) as needing re-association.
    pub fn mark_unassociated(&mut self, cell: CellId) -> DatabaseResult<()> {
        let twin = self.cell(cell)?.twin;
        self.cell_mut(cell)?.associated = false;
        if let Some(twin) = twin {
            if let Ok(twin) = self.cell_mut(twin) {
                twin.associated = false;
            }
        }
        Ok(())
    }

    pub fn current(&self) -> Option<CellId> {
        self.current
    }

    /// Sets the globally current (top-level) cell.
    pub fn set_current(&mut self, cell: Option<CellId>) -> DatabaseResult<()> {
        if let Some(cell) = cell {
            self.cell(cell)?;
        }
        self.current = cell;
        Ok(())
    }

    /// Is the cell's symbolic view active, either because it is a symbolic
    /// representation or because a symbolic property is switched on?
    pub fn is_symbolic(&self, cell: CellId) -> bool {
        match self.cells.get(&cell) {
            Some(c) => c.is_symbolic_view() || self.symbolic_state(&c.properties),
            None => false,
        }
    }

    /// Whether a property list switches the symbolic view on.
    pub fn symbolic_state(&self, list: &[PropertyId]) -> bool {
        list.iter()
            .filter_map(|id| self.properties.get(id))
            .any(Property::is_symbolic_on)
    }

    /// Cells holding a live instance of `cell`.
    pub fn instantiating_cells(&self, cell: CellId) -> Vec<CellId> {
        let mut parents: Vec<CellId> = self
            .cells
            .values()
            .filter(|parent| {
                parent.objects.iter().any(|oid| {
                    self.objects.get(oid).is_some_and(|o| {
                        o.kind.master() == Some(cell) && o.state != ObjectState::Deleted
                    })
                })
            })
            .map(|parent| parent.id)
            .collect();
        parents.sort();
        parents
    }

    /// Recomputes and caches the bounding box of the cell's live objects.
    pub fn recompute_bbox(&mut self, cell: CellId) -> DatabaseResult<Bounds> {
        let mut bbox = Bounds::empty();
        for oid in &self.cell(cell)?.objects {
            if let Some(object) = self.objects.get(oid) {
                if object.state != ObjectState::Deleted {
                    bbox.add(&object.bounds);
                }
            }
        }
        self.cell_mut(cell)?.bbox = bbox;
        Ok(bbox)
    }

    // ---- objects ---------------------------------------------------------

    /// Creates an object linked into `cell` in the incomplete state.
    pub fn create_object(
        &mut self,
        cell: CellId,
        kind: ObjectKind,
        layer: Layer,
        bounds: Bounds,
    ) -> DatabaseResult<ObjectId> {
        if let ObjectKind::Instance { master } = &kind {
            self.cell(*master)?;
        }
        self.cell(cell)?;
        let id = ObjectId(self.allocate());
        self.objects.insert(
            id,
            DesignObject {
                id,
                cell,
                kind,
                layer,
                bounds,
                state: ObjectState::Incomplete,
                properties: Vec::new(),
            },
        );
        self.cell_mut(cell)?.objects.push(id);
        Ok(id)
    }

    pub fn object(&self, id: ObjectId) -> DatabaseResult<&DesignObject> {
        self.objects
            .get(&id)
            .ok_or(DatabaseError::UnknownObject { id: id.raw() })
    }

    pub fn object_mut(&mut self, id: ObjectId) -> DatabaseResult<&mut DesignObject> {
        self.objects
            .get_mut(&id)
            .ok_or(DatabaseError::UnknownObject { id: id.raw() })
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn set_object_state(&mut self, id: ObjectId, state: ObjectState) -> DatabaseResult<()> {
        self.object_mut(id)?.state = state;
        Ok(())
    }

    /// Links the object into its cell's live list. Returns false if it was
    /// already linked.
    pub fn link_object(&mut self, id: ObjectId) -> DatabaseResult<bool> {
        let cell = self.object(id)?.cell;
        let cell = self.cell_mut(cell)?;
        if cell.objects.contains(&id) {
            return Ok(false);
        }
        cell.objects.push(id);
        Ok(true)
    }

    /// Removes the object from its cell's live list. Returns false if it was
    /// not linked.
    pub fn unlink_object(&mut self, id: ObjectId) -> DatabaseResult<bool> {
        let cell = self.object(id)?.cell;
        let cell = self.cell_mut(cell)?;
        let before = cell.objects.len();
        cell.objects.retain(|o| *o != id);
        Ok(cell.objects.len() != before)
    }

    pub fn is_linked(&self, id: ObjectId) -> bool {
        self.objects
            .get(&id)
            .and_then(|o| self.cells.get(&o.cell))
            .is_some_and(|c| c.objects.contains(&id))
    }

    /// Is the object linked into `cell`?
    pub fn cell_contains(&self, cell: CellId, id: ObjectId) -> bool {
        self.cells.get(&cell).is_some_and(|c| c.objects.contains(&id))
    }

    /// Hard-deletes an object together with its attached properties.
    pub fn destroy_object(&mut self, id: ObjectId) -> DatabaseResult<DesignObject> {
        self.unlink_object(id)?;
        let object = self
            .objects
            .remove(&id)
            .ok_or(DatabaseError::UnknownObject { id: id.raw() })?;
        for pid in &object.properties {
            self.properties.remove(pid);
            self.hyperlinks.remove(pid);
        }
        tracing::trace!("Destroyed object {}", id);
        Ok(object)
    }

    /// Linked objects of a cell that are not deleted.
    pub fn live_objects(&self, cell: CellId) -> Vec<&DesignObject> {
        self.cells
            .get(&cell)
            .map(|c| {
                c.objects
                    .iter()
                    .filter_map(|oid| self.objects.get(oid))
                    .filter(|o| o.state != ObjectState::Deleted)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ---- properties ------------------------------------------------------

    /// Creates a property. It is not linked to any owner yet.
    pub fn create_property(
        &mut self,
        kind: PropertyKind,
        text: impl Into<String>,
        location: Option<Point>,
    ) -> PropertyId {
        let id = PropertyId(self.allocate());
        self.properties.insert(
            id,
            Property {
                id,
                kind,
                text: text.into(),
                location,
            },
        );
        id
    }

    pub fn property(&self, id: PropertyId) -> DatabaseResult<&Property> {
        self.properties
            .get(&id)
            .ok_or(DatabaseError::UnknownProperty { id: id.raw() })
    }

    pub fn contains_property(&self, id: PropertyId) -> bool {
        self.properties.contains_key(&id)
    }

    /// The live property list of an owner.
    pub fn property_list(&self, owner: PropertyOwner) -> DatabaseResult<&[PropertyId]> {
        match owner {
            PropertyOwner::Cell(cell) => Ok(&self.cell(cell)?.properties),
            PropertyOwner::Object(object) => Ok(&self.object(object)?.properties),
        }
    }

    fn property_list_mut(&mut self, owner: PropertyOwner) -> DatabaseResult<&mut Vec<PropertyId>> {
        match owner {
            PropertyOwner::Cell(cell) => Ok(&mut self.cell_mut(cell)?.properties),
            PropertyOwner::Object(object) => Ok(&mut self.object_mut(object)?.properties),
        }
    }

    /// Links a property into an owner's list. Returns false if already linked.
    pub fn link_property(&mut self, owner: PropertyOwner, id: PropertyId) -> DatabaseResult<bool> {
        self.property(id)?;
        let list = self.property_list_mut(owner)?;
        if list.contains(&id) {
            return Ok(false);
        }
        list.push(id);
        Ok(true)
    }

    /// Unlinks a property from an owner's list. Returns false if not linked.
    pub fn unlink_property(&mut self, owner: PropertyOwner, id: PropertyId) -> DatabaseResult<bool> {
        let list = self.property_list_mut(owner)?;
        let before = list.len();
        list.retain(|p| *p != id);
        Ok(list.len() != before)
    }

    pub fn is_property_linked(&self, owner: PropertyOwner, id: PropertyId) -> bool {
        self.property_list(owner)
            .map(|list| list.contains(&id))
            .unwrap_or(false)
    }

    /// Is the property linked into any owner at all?
    pub fn is_property_linked_anywhere(&self, id: PropertyId) -> bool {
        self.cells.values().any(|c| c.properties.contains(&id))
            || self.objects.values().any(|o| o.properties.contains(&id))
    }

    /// Swaps in a new cell-level property list, returning the old one.
    pub fn replace_cell_properties(
        &mut self,
        cell: CellId,
        list: Vec<PropertyId>,
    ) -> DatabaseResult<Vec<PropertyId>> {
        Ok(std::mem::replace(&mut self.cell_mut(cell)?.properties, list))
    }

    /// Hard-deletes a property, unlinking it from every owner.
    pub fn destroy_property(&mut self, id: PropertyId) -> DatabaseResult<Property> {
        let property = self
            .properties
            .remove(&id)
            .ok_or(DatabaseError::UnknownProperty { id: id.raw() })?;
        for cell in self.cells.values_mut() {
            cell.properties.retain(|p| *p != id);
        }
        for object in self.objects.values_mut() {
            object.properties.retain(|p| *p != id);
        }
        self.hyperlinks.remove(&id);
        Ok(property)
    }

    /// First live property of the given kind on an owner.
    pub fn find_property(&self, owner: PropertyOwner, kind: PropertyKind) -> Option<&Property> {
        self.property_list(owner)
            .ok()?
            .iter()
            .filter_map(|id| self.properties.get(id))
            .find(|p| p.kind == kind)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    // ---- hypertext -------------------------------------------------------

    pub fn hyperlinks(&self, id: PropertyId) -> &[HyperLink] {
        self.hyperlinks.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces a property's link list, returning the previous one.
    pub fn set_hyperlinks(
        &mut self,
        id: PropertyId,
        links: Vec<HyperLink>,
    ) -> DatabaseResult<Vec<HyperLink>> {
        self.property(id)?;
        let old = if links.is_empty() {
            self.hyperlinks.remove(&id)
        } else {
            self.hyperlinks.insert(id, links)
        };
        Ok(old.unwrap_or_default())
    }
}
