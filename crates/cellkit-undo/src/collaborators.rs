//! Capability interfaces to the subsystems the engine keeps consistent.
//!
//! The engine never owns design-rule checking, extraction, schematic
//! connectivity, selection, display or scripting. It calls them through these
//! traits. Every method has a do-nothing default, so a host only implements
//! what it actually has, and [`Noop`] stands in for a missing subsystem.
//!
//! ```rust
//! use cellkit_undo::collaborators::{Collaborators, Display, Redisplay};
//!
//! struct Screen;
//! impl Display for Screen {
//!     fn redisplay(&mut self, request: &Redisplay) {
//!         println!("repaint {:?}", request);
//!     }
//! }
//!
//! let collab = Collaborators::default().with_display(Screen);
//! # let _ = collab;
//! ```

use crate::change::ObjectChange;
use cellkit_core::error::CollaboratorError;
use cellkit_core::{Bounds, Point};
use cellkit_db::{CellId, CellKind, Database, ObjectId, PropertyId, PropertyOwner};

/// Which display the redisplay request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    Physical,
    Electrical,
}

impl From<CellKind> for DisplayMode {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Physical => DisplayMode::Physical,
            CellKind::Electrical => DisplayMode::Electrical,
        }
    }
}

/// A repaint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redisplay {
    /// Repaint the given areas.
    Boxes { mode: DisplayMode, boxes: Vec<Bounds> },
    /// Repaint everything shown in this mode.
    WholeMode(DisplayMode),
}

/// Design-rule-check error tracking.
pub trait DesignRuleCheck: Send {
    /// Removes error markers made stale by the given changes.
    fn erase_markers(&mut self, _db: &Database, _cell: CellId, _changes: &[ObjectChange]) {}

    /// Checks newly committed objects. Returns the area of any new markers.
    fn run_incremental(
        &mut self,
        _db: &Database,
        _cell: CellId,
        _changes: &[ObjectChange],
    ) -> Result<Option<Bounds>, CollaboratorError> {
        Ok(None)
    }

    /// Abandons any check that is waiting to run.
    fn cancel_pending(&mut self) {}
}

/// Net extraction.
pub trait NetExtraction: Send {
    fn invalidate_groups(&mut self, _cell: CellId) {}

    /// Allows edits to cells extraction would otherwise treat as immutable.
    fn set_immutability_override(&mut self, _enabled: bool) {}

    fn immutability_override(&self) -> bool {
        false
    }
}

/// Schematic connectivity and connection dots.
pub trait Schematic: Send {
    fn install(&mut self, _db: &Database, _cell: CellId, _object: ObjectId) {}
    fn uninstall(&mut self, _db: &Database, _cell: CellId, _object: ObjectId) {}
    fn update_dots(&mut self, _db: &Database, _cell: CellId, _object: ObjectId) {}
    fn mark_dots_dirty(&mut self, _cell: CellId) {}
    fn refresh_dirty_dots(&mut self, _db: &Database) {}
    fn recompute_node_map(&mut self, _db: &Database) {}
    fn assert_symbolic(&mut self, _cell: CellId, _symbolic: bool) {}
    /// A terminal of `cell` appeared or moved to `at`.
    fn add_parent_connection(&mut self, _db: &Database, _cell: CellId, _terminal: &str, _at: Point) {}
    fn suppress_redisplay(&mut self, _suppress: bool) {}
}

/// The on-screen selection.
pub trait SelectionSet: Send {
    fn insert(&mut self, _cell: CellId, _object: ObjectId) {}
    fn remove(&mut self, _cell: CellId, _object: ObjectId) {}
    /// Drops every selected object of `cell` that is no longer live.
    fn purge_deleted(&mut self, _db: &Database, _cell: CellId) {}
}

/// Screen repaint and overlays.
pub trait Display: Send {
    fn redisplay(&mut self, _request: &Redisplay) {}
    fn show_terminals(&mut self, _cell: CellId) {}
    fn erase_terminals(&mut self, _cell: CellId) {}
    fn erase_origin_marker(&mut self, _cell: CellId, _instance: ObjectId) {}
    fn show_property_text(&mut self, _owner: PropertyOwner, _property: PropertyId) {}
    fn erase_property_text(&mut self, _owner: PropertyOwner, _property: PropertyId) {}
    /// An object shown in a property list was replaced by `new` (or removed).
    fn object_replaced(&mut self, _old: ObjectId, _new: Option<ObjectId>) {}
}

/// Live script handles.
pub trait Scripting: Send {
    fn update_object_identity(&mut self, _old: Option<ObjectId>, _new: Option<ObjectId>) {}
    fn update_property_identity(
        &mut self,
        _owner: PropertyOwner,
        _old: Option<PropertyId>,
        _new: Option<PropertyId>,
    ) {
    }
}

/// Instance-level services: labels, parametrized instances, derived geometry.
pub trait InstanceServices: Send {
    /// Keeps dual-representation labels aligned for replaced instances.
    /// Pairs are `(replaced, replacement)`; `reverse` is set during replay.
    fn fix_labels(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        _pairs: &[(ObjectId, ObjectId)],
        _reverse: bool,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Rebuilds a parametrized instance from a re-parameterization request.
    fn regenerate_instance(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        _instance: Option<ObjectId>,
        _request: &str,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    /// Receives derived physical geometry as plain text.
    fn derived_geometry(
        &mut self,
        _db: &mut Database,
        _cell: CellId,
        _owner: PropertyOwner,
        _text: &str,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn abutment_changed(&mut self, _db: &Database, _cell: CellId, _instance: ObjectId) {}

    /// Recomputes an instance's box and terminals.
    fn recompute_instance(&mut self, _db: &mut Database, _cell: CellId, _instance: ObjectId) {}

    /// Recomputes derived geometry after a terminal change.
    fn recompute_derived(&mut self, _db: &mut Database, _cell: CellId) {}

    /// Recomputes node-dependent reflected geometry.
    fn recompute_reflected(&mut self, _db: &mut Database, _cell: CellId) {}

    fn refresh_parameters(&mut self) {}
}

/// Stand-in for an absent subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl DesignRuleCheck for Noop {}
impl NetExtraction for Noop {}
impl Schematic for Noop {}
impl SelectionSet for Noop {}
impl Display for Noop {}
impl Scripting for Noop {}
impl InstanceServices for Noop {}

/// The full set of collaborators handed to the engine.
pub struct Collaborators {
    pub drc: Box<dyn DesignRuleCheck>,
    pub extraction: Box<dyn NetExtraction>,
    pub schematic: Box<dyn Schematic>,
    pub selection: Box<dyn SelectionSet>,
    pub display: Box<dyn Display>,
    pub scripting: Box<dyn Scripting>,
    pub instances: Box<dyn InstanceServices>,
}

impl Collaborators {
    pub fn with_drc(mut self, drc: impl DesignRuleCheck + 'static) -> Self {
        self.drc = Box::new(drc);
        self
    }

    pub fn with_extraction(mut self, extraction: impl NetExtraction + 'static) -> Self {
        self.extraction = Box::new(extraction);
        self
    }

    pub fn with_schematic(mut self, schematic: impl Schematic + 'static) -> Self {
        self.schematic = Box::new(schematic);
        self
    }

    pub fn with_selection(mut self, selection: impl SelectionSet + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn with_display(mut self, display: impl Display + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_scripting(mut self, scripting: impl Scripting + 'static) -> Self {
        self.scripting = Box::new(scripting);
        self
    }

    pub fn with_instances(mut self, instances: impl InstanceServices + 'static) -> Self {
        self.instances = Box::new(instances);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            drc: Box::new(Noop),
            extraction: Box::new(Noop),
            schematic: Box::new(Noop),
            selection: Box::new(Noop),
            display: Box::new(Noop),
            scripting: Box::new(Noop),
            instances: Box::new(Noop),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Logs a collaborator failure. The enclosing step is skipped by the caller.
pub(crate) fn report_failure(step: &str, err: &CollaboratorError) {
    tracing::warn!(
        target: "cellkit::collab",
        collaborator = err.collaborator(),
        "{} failed: {}",
        step,
        err
    );
}
