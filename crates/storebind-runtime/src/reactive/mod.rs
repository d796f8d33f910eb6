#![forbid(unsafe_code)]

//! Reactive store bindings for UI components.
//!
//! This module mirrors an external [`Store`](storebind_core::Store) into
//! component-local state:
//!
//! - [`ValueBinding`] / [`use_store`]: the store's current value.
//! - [`FetchedBinding`] / [`use_fetched`]: value plus loading flag and error,
//!   each driven by its own channel, read as a [`Fetched`] record.
//!
//! # Lifecycle
//!
//! ```text
//! new()            mount()                 unmount() / drop
//!  │ read get()     │ listen(keys)           │ deactivate callbacks
//!  ▼                ▼ load(), catch()        ▼ unsubscribe, store.clear()
//! Created ───────▶ Mounted ──────────────▶ Unmounted
//! ```
//!
//! # Invariants
//!
//! 1. The first observed value equals `store.get()` at creation.
//! 2. At most one value listener, one loading and one error registration
//!    exist per binding.
//! 3. After unmount no callback changes observed state or invalidates the
//!    host, whatever the store does.
//! 4. `store.clear()` runs exactly once per binding, on teardown.
//! 5. Bindings never mutate the store.

pub mod fetched;
mod observed;
pub mod value;

pub use fetched::{Fetched, FetchedBinding, use_fetched};
pub use value::{ValueBinding, use_store};

/// Lifecycle phase of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initial value read; no listener attached.
    Created,
    /// Listener(s) attached.
    Mounted,
    /// Torn down. Terminal: mounting again is ignored.
    Unmounted,
}
