//! Deferred hard deletions.
//!
//! Objects that must be destroyed while some list elsewhere may still be
//! walking them are parked here and destroyed when the next transaction
//! begins.

use cellkit_db::{Database, ObjectId};

#[derive(Debug, Default)]
pub struct TrashBin {
    objects: Vec<ObjectId>,
}

impl TrashBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an object for destruction. Queuing twice is harmless.
    pub fn trash(&mut self, object: ObjectId) {
        if !self.objects.contains(&object) {
            self.objects.push(object);
        }
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Destroys every queued object that still exists. Returns how many were
    /// destroyed.
    pub fn drain(&mut self, db: &mut Database) -> usize {
        let mut destroyed = 0;
        for object in self.objects.drain(..) {
            if !db.contains_object(object) {
                continue;
            }
            match db.destroy_object(object) {
                Ok(_) => destroyed += 1,
                Err(e) => tracing::debug!("Trash bin skipped {}: {}", object, e),
            }
        }
        if destroyed > 0 {
            tracing::debug!("Emptied trash bin ({} objects)", destroyed);
        }
        destroyed
    }
}
