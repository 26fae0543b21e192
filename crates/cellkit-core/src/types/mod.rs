//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for the `Arc<Mutex<T>>` / `Arc<RwLock<T>>` shapes used
//!   by the event bus and by collaborator test doubles.

pub mod aliases;

pub use aliases::*;
