#![forbid(unsafe_code)]

//! Derived store that tracks a source store.
//!
//! # Design
//!
//! [`ComputedStore<S, T>`] maps the value of a source [`Store`] through a
//! pure function. It attaches one listener to the source lazily, when its
//! own first listener registers, and keeps the derived value cached while
//! attached. Without an upstream listener, `get()` recomputes from the
//! source every time, so reads are never stale.
//!
//! [`clear()`](Store::clear) detaches from the source once the computed
//! store has no listeners of its own, then cascades `clear()` to the source.
//! A binding that unsubscribes and then clears therefore leaves no listener
//! behind anywhere in the dependency chain.
//!
//! # Invariants
//!
//! 1. At most one upstream listener exists at any time.
//! 2. Own listeners are notified only when the derived value changes.
//! 3. `version` increments by 1 each time the cached value changes.
//!
//! # Failure Modes
//!
//! - **Map function panics**: the cached value remains from the last
//!   successful computation.
//! - **Source dropped**: the store handle keeps its source alive; there is
//!   no dangling case.

use std::cell::RefCell;
use std::rc::Rc;

use storebind_core::{Callback, KeyFilter, ListenerHandle, ListenerSet, Record, Store};

struct ComputedInner<S: Store, T> {
    source: S,
    map: Box<dyn Fn(&S::Value) -> T>,
    cached: Option<T>,
    version: u64,
    /// Listener on `source`, present only while this store has listeners.
    upstream: Option<ListenerHandle>,
}

impl<S: Store, T: Clone + PartialEq> ComputedInner<S, T> {
    /// Store `next` as the cached value. Returns the previous value when it
    /// differed.
    fn replace(&mut self, next: T) -> Option<Option<T>> {
        if self.cached.as_ref() == Some(&next) {
            return None;
        }
        self.version += 1;
        Some(self.cached.replace(next))
    }
}

/// A value derived from another store.
///
/// Cloning a `ComputedStore` creates a new handle to the **same** state.
pub struct ComputedStore<S: Store, T> {
    inner: Rc<RefCell<ComputedInner<S, T>>>,
    listeners: ListenerSet<T>,
}

impl<S: Store, T> Clone for ComputedStore<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            listeners: self.listeners.clone(),
        }
    }
}

impl<S: Store, T: std::fmt::Debug> std::fmt::Debug for ComputedStore<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ComputedStore")
            .field("cached", &inner.cached)
            .field("version", &inner.version)
            .field("attached", &inner.upstream.is_some())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl<S, T> ComputedStore<S, T>
where
    S: Store + 'static,
    T: Clone + Record + 'static,
{
    /// Derive a store from `source` through `map`.
    ///
    /// Nothing is computed and no listener is attached until first use.
    pub fn new(source: S, map: impl Fn(&S::Value) -> T + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                source,
                map: Box::new(map),
                cached: None,
                version: 0,
                upstream: None,
            })),
            listeners: ListenerSet::new(),
        }
    }

    /// Whether the store currently listens to its source.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().upstream.is_some()
    }

    /// Number of listeners registered on this store.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Current version. Increments each time the cached value changes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    fn compute(&self) -> T {
        let inner = self.inner.borrow();
        let source_value = inner.source.get();
        (inner.map)(&source_value)
    }

    fn attach(&self) {
        if self.is_attached() {
            return;
        }
        let current = self.compute();
        self.inner.borrow_mut().replace(current);

        let weak = Rc::downgrade(&self.inner);
        let listeners = self.listeners.clone();
        let on_source: Callback<S::Value> = Rc::new(move |source_value: &S::Value| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let change = {
                let mut inner = inner.borrow_mut();
                let next = (inner.map)(source_value);
                inner.replace(next.clone()).map(|prev| (prev, next))
            };
            match change {
                Some((Some(prev), next)) => listeners.emit_change(&prev, &next),
                Some((None, next)) => listeners.emit(&next),
                None => {}
            }
        });

        let handle = self.inner.borrow().source.listen(on_source, None);
        self.inner.borrow_mut().upstream = Some(handle);
        tracing::trace!("computed store attached to source");
    }
}

impl<S, T> Store for ComputedStore<S, T>
where
    S: Store + 'static,
    T: Clone + Record + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        {
            let inner = self.inner.borrow();
            if let (Some(_), Some(cached)) = (&inner.upstream, &inner.cached) {
                return cached.clone();
            }
        }
        let value = self.compute();
        self.inner.borrow_mut().replace(value.clone());
        value
    }

    fn listen(&self, callback: Callback<T>, keys: Option<&KeyFilter>) -> ListenerHandle {
        self.attach();
        self.listeners.add(callback, keys)
    }

    fn clear(&self) {
        if self.listeners.is_empty() {
            let upstream = self.inner.borrow_mut().upstream.take();
            if let Some(mut handle) = upstream {
                handle.unsubscribe();
                tracing::trace!("computed store detached from source");
            }
        }
        self.inner.borrow().source.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::cell::Cell;

    fn evens(items: &Vec<i32>) -> Vec<i32> {
        items.iter().copied().filter(|n| n % 2 == 0).collect()
    }

    #[test]
    fn derives_from_source() {
        let items = MemoryStore::new(vec![1, 2, 3]);
        let even = ComputedStore::new(items.clone(), evens);
        assert_eq!(even.get().len(), 1);

        items.set(vec![1, 2, 3, 4]);
        assert_eq!(even.get().len(), 2);
    }

    #[test]
    fn lazy_until_listened() {
        let items = MemoryStore::new(vec![2]);
        let even = ComputedStore::new(items.clone(), evens);
        let _ = even.get();
        assert!(!even.is_attached());
        assert_eq!(items.listener_count(), 0);
    }

    #[test]
    fn listen_attaches_once() {
        let items = MemoryStore::new(vec![2]);
        let even = ComputedStore::new(items.clone(), evens);

        let _a = even.listen(Rc::new(|_: &Vec<i32>| {}), None);
        let _b = even.listen(Rc::new(|_: &Vec<i32>| {}), None);
        assert!(even.is_attached());
        assert_eq!(items.listener_count(), 1);
        assert_eq!(even.listener_count(), 2);
    }

    #[test]
    fn notifies_only_on_derived_change() {
        let items = MemoryStore::new(vec![1, 2]);
        let even = ComputedStore::new(items.clone(), evens);
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _h = even.listen(
            Rc::new(move |_: &Vec<i32>| hits_clone.set(hits_clone.get() + 1)),
            None,
        );

        // Odd numbers do not change the derived value.
        items.set(vec![1, 2, 3]);
        assert_eq!(hits.get(), 0);

        items.set(vec![1, 2, 3, 4]);
        assert_eq!(hits.get(), 1);
        assert_eq!(even.get(), vec![2, 4]);
    }

    #[test]
    fn clear_detaches_when_unlistened() {
        let items = MemoryStore::new(vec![2]);
        let even = ComputedStore::new(items.clone(), evens);

        let handle = even.listen(Rc::new(|_: &Vec<i32>| {}), None);
        assert_eq!(items.listener_count(), 1);

        drop(handle);
        even.clear();
        assert!(!even.is_attached());
        assert_eq!(items.listener_count(), 0);
        assert_eq!(items.clear_count(), 1);
    }

    #[test]
    fn clear_keeps_upstream_while_listened() {
        let items = MemoryStore::new(vec![2]);
        let even = ComputedStore::new(items.clone(), evens);

        let _keep = even.listen(Rc::new(|_: &Vec<i32>| {}), None);
        even.clear();
        assert!(even.is_attached());
        assert_eq!(items.listener_count(), 1);
    }

    #[test]
    fn chained_computed_releases_whole_chain() {
        let items = MemoryStore::new(vec![1, 2, 3, 4]);
        let even = ComputedStore::new(items.clone(), evens);
        let count = ComputedStore::new(even.clone(), |v: &Vec<i32>| v.len());

        let handle = count.listen(Rc::new(|_: &usize| {}), None);
        assert_eq!(count.get(), 2);
        assert_eq!(even.listener_count(), 1);
        assert_eq!(items.listener_count(), 1);

        drop(handle);
        count.clear();
        assert_eq!(even.listener_count(), 0);
        assert_eq!(items.listener_count(), 0);
    }

    #[test]
    fn version_tracks_cached_changes() {
        let items = MemoryStore::new(vec![2]);
        let even = ComputedStore::new(items.clone(), evens);
        let _h = even.listen(Rc::new(|_: &Vec<i32>| {}), None);
        assert_eq!(even.version(), 1);

        items.set(vec![2, 3]);
        assert_eq!(even.version(), 1);
        items.set(vec![2, 4]);
        assert_eq!(even.version(), 2);
    }
}
