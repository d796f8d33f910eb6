#![forbid(unsafe_code)]

//! In-memory store with change notification and version tracking.
//!
//! # Design
//!
//! [`MemoryStore<T>`] wraps a value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). When the value changes (by `PartialEq`), listeners
//! are notified in registration order through a
//! [`ListenerSet`](storebind_core::ListenerSet), which applies each
//! listener's key filter.
//!
//! # Failure Modes
//!
//! - **Re-entrant access**: touching the store from inside an `update()`
//!   closure panics (RefCell borrow rules). Listeners run after the borrow
//!   is released and may read or set the store freely.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use storebind_core::{Callback, KeyFilter, ListenerHandle, ListenerSet, Record, Store};

struct MemoryInner<T> {
    value: T,
    version: u64,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning a `MemoryStore` creates a new handle to the **same** state.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. `clear()` has no dependencies to release; it only counts calls.
pub struct MemoryStore<T> {
    inner: Rc<RefCell<MemoryInner<T>>>,
    listeners: ListenerSet<T>,
    clears: Rc<Cell<u64>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            listeners: self.listeners.clone(),
            clears: Rc::clone(&self.clears),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MemoryStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryStore")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl<T: Clone + Record + 'static> MemoryStore<T> {
    /// Create a store with the given initial value at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryInner { value, version: 0 })),
            listeners: ListenerSet::new(),
            clears: Rc::new(Cell::new(0)),
        }
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying listeners if it changed.
    pub fn set(&self, value: T) {
        let prev = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.version += 1;
            std::mem::replace(&mut inner.value, value)
        };
        self.notify(&prev);
    }

    /// Modify the value in place, notifying listeners if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let prev = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value == old {
                return;
            }
            inner.version += 1;
            old
        };
        self.notify(&prev);
    }

    /// Current version. Increments by 1 per value-changing mutation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered value listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// How many times `clear()` was called.
    #[must_use]
    pub fn clear_count(&self) -> u64 {
        self.clears.get()
    }

    fn notify(&self, prev: &T) {
        let next = self.inner.borrow().value.clone();
        tracing::trace!(
            listeners = self.listeners.len(),
            version = self.version(),
            "memory store changed"
        );
        self.listeners.emit_change(prev, &next);
    }
}

impl<T: Clone + Record + 'static> Store for MemoryStore<T> {
    type Value = T;

    fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    fn listen(&self, callback: Callback<T>, keys: Option<&KeyFilter>) -> ListenerHandle {
        self.listeners.add(callback, keys)
    }

    fn clear(&self) {
        self.clears.set(self.clears.get() + 1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
