//! Change entries.
//!
//! An entry pairs the object (or property) that stopped existing with the one
//! that started existing. Either side may be absent: a pure add has no
//! `delete`, a pure delete has no `add`. Undo and redo turn an entry into its
//! own inverse with [`ObjectChange::swap`].

use cellkit_db::{ObjectId, PropertyId, PropertyOwner};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// One object add/delete pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectChange {
    pub delete: Option<ObjectId>,
    pub add: Option<ObjectId>,
    /// Appended from a background recorder; database state marking happens
    /// when the record is frozen.
    pub(crate) deferred: bool,
}

impl ObjectChange {
    pub fn new(delete: Option<ObjectId>, add: Option<ObjectId>) -> Self {
        Self {
            delete,
            add,
            deferred: false,
        }
    }

    pub(crate) fn deferred(delete: Option<ObjectId>, add: Option<ObjectId>) -> Self {
        Self {
            delete,
            add,
            deferred: true,
        }
    }

    /// Exchanges the add and delete roles.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.delete, &mut self.add);
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_none() && self.add.is_none()
    }

    /// Both sides, delete first.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> {
        self.delete.into_iter().chain(self.add)
    }
}

/// One property add/delete pair on a property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChange {
    pub owner: PropertyOwner,
    pub delete: Option<PropertyId>,
    pub add: Option<PropertyId>,
}

impl PropertyChange {
    pub fn new(owner: PropertyOwner, delete: Option<PropertyId>, add: Option<PropertyId>) -> Self {
        Self { owner, delete, add }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.delete, &mut self.add);
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_none() && self.add.is_none()
    }
}

struct Node {
    entry: ObjectChange,
    next: *mut Node,
}

/// Push-only list of object changes, newest first.
///
/// Any thread may push. Nodes are only ever detached as a whole chain with
/// [`take_all`](Self::take_all), so a pusher never dereferences a node it did
/// not allocate and there is no ABA hazard.
pub(crate) struct AtomicChangeList {
    head: AtomicPtr<Node>,
    len: AtomicUsize,
}

impl AtomicChangeList {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            len: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, entry: ObjectChange) {
        let node = Box::into_raw(Box::new(Node {
            entry,
            next: ptr::null_mut(),
        }));
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            // SAFETY: `node` is not published until the exchange succeeds, so
            // this thread has exclusive access to it.
            unsafe { (*node).next = head };
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(current) => head = current,
            }
        }
        self.len.fetch_add(1, Ordering::Relaxed);
    }

    /// Detaches every entry, newest first.
    pub(crate) fn take_all(&self) -> Vec<ObjectChange> {
        let mut cursor = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        self.len.store(0, Ordering::Relaxed);
        let mut entries = Vec::new();
        while !cursor.is_null() {
            // SAFETY: the swap unlinked the whole chain. Every node in it was
            // created by `Box::into_raw` in `push` and is now reachable only
            // from this thread.
            let node = unsafe { Box::from_raw(cursor) };
            cursor = node.next;
            entries.push(node.entry);
        }
        entries
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Approximate while pushers are active.
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl Drop for AtomicChangeList {
    fn drop(&mut self) {
        self.take_all();
    }
}

impl std::fmt::Debug for AtomicChangeList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicChangeList")
            .field("len", &self.len())
            .finish()
    }
}
