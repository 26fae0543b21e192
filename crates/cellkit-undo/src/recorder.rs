//! Recording object changes from worker threads.

use crate::change::{AtomicChangeList, ObjectChange};
use cellkit_db::{CellId, ObjectId};
use std::sync::{Arc, Weak};

/// Appends object changes to the transaction that was open when it was
/// created.
///
/// The recorder only appends. Marking the objects normal or deleted, and the
/// collaborator notices a recorded change triggers, are done by the engine on
/// the command thread when the transaction commits, so neither the database
/// nor a collaborator is touched from the worker. Once that transaction is
/// committed or aborted the recorder detaches and [`record`](Self::record)
/// returns `false`. Workers must finish before the command commits.
#[derive(Debug, Clone)]
pub struct ChangeRecorder {
    list: Weak<AtomicChangeList>,
    cell: Option<CellId>,
}

impl ChangeRecorder {
    pub(crate) fn new(list: Option<&Arc<AtomicChangeList>>, cell: Option<CellId>) -> Self {
        Self {
            list: list.map(Arc::downgrade).unwrap_or_default(),
            cell,
        }
    }

    /// Records a replace, pure add (`old == None`) or pure delete
    /// (`new == None`). Returns whether the entry was queued.
    pub fn record(&self, old: Option<ObjectId>, new: Option<ObjectId>) -> bool {
        if old.is_none() && new.is_none() {
            return false;
        }
        match self.list.upgrade() {
            Some(list) => {
                list.push(ObjectChange::deferred(old, new));
                true
            }
            None => {
                tracing::debug!("Recorder detached, dropping change {:?} -> {:?}", old, new);
                false
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.list.strong_count() > 0
    }

    /// Cell the transaction was bound to when the recorder was created.
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }
}
