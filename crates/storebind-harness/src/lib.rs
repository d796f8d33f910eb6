#![forbid(unsafe_code)]

//! Reference stores for exercising storebind bindings.
//!
//! These are fixtures, not a store library: each one implements the
//! [`Store`](storebind_core::Store) capability set with just enough behavior
//! to observe a binding's lifecycle from the outside (listener counts,
//! dependency attachment, clear calls).
//!
//! - [`MemoryStore`]: a plain value container.
//! - [`ComputedStore`]: a value derived from another store, attached to its
//!   source only while it has listeners.
//! - [`FetchedStore`]: a manually driven asynchronous resource with loading
//!   and error channels.

pub mod computed;
pub mod fetched;
pub mod memory;

pub use computed::ComputedStore;
pub use fetched::{FetchError, FetchedStore};
pub use memory::MemoryStore;
