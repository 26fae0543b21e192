//! Type aliases for commonly used shared-ownership types.
//!
//! Collaborators are handed to the transaction engine as boxed trait objects,
//! so any state they want to expose to the host (recorded calls, counters,
//! dirty flags) has to live behind a thread-safe shared handle. These aliases
//! name those handles.
//!
//! ## Usage
//!
//! ```rust
//! use cellkit_core::types::*;
//!
//! let calls: ThreadSafeVec<String> = thread_safe_vec();
//! calls.lock().push("redisplay".to_string());
//! assert_eq!(calls.lock().len(), 1);
//! ```

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` for better performance than `std::sync::Mutex`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe vector for cross-thread collection management.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// A thread-safe, read-optimized hash map.
///
/// Used where reads vastly outnumber writes (event subscriptions).
pub type ThreadSafeRwMap<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// Creates a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Creates a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Creates a new empty `ThreadSafeRwMap<K, V>`.
#[inline]
pub fn thread_safe_rw_map<K, V>() -> ThreadSafeRwMap<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_shared_between_clones() {
        let counter = thread_safe(0u32);
        let other = counter.clone();
        *other.lock() += 2;
        assert_eq!(*counter.lock(), 2);
    }

    #[test]
    fn test_rw_map() {
        let map: ThreadSafeRwMap<u32, &str> = thread_safe_rw_map();
        map.write().insert(1, "one");
        assert_eq!(map.read().get(&1), Some(&"one"));
    }
}
