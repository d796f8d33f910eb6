#![forbid(unsafe_code)]

//! Listener registry and RAII subscription handles.
//!
//! # Design
//!
//! [`ListenerSet<T>`] stores callbacks in shared, reference-counted storage
//! (`Rc<RefCell<..>>`). Two registration kinds exist:
//!
//! - **Owned** ([`ListenerSet::add`]): the set holds the callback strongly and
//!   hands back a [`ListenerHandle`]. Unsubscribing (or dropping) the handle
//!   removes the entry immediately, so the listener count drops at once.
//! - **Weak** ([`ListenerSet::add_weak`]): the caller keeps the strong `Rc`;
//!   the set holds a `Weak`. Dead entries are skipped during emission and
//!   removed by [`ListenerSet::prune`].
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Callbacks run outside the registry borrow, so a callback may add or
//!    remove listeners on the same set.
//! 3. A handle releases its entry at most once; further `unsubscribe` calls
//!    are no-ops.
//!
//! # Failure Modes
//!
//! - **Re-entrant emission**: emitting from inside a callback of the same set
//!   is allowed but delivers the nested emission first (depth-first).
//! - **Registry dropped first**: a handle outliving its set releases nothing;
//!   `unsubscribe` stays a no-op.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::filter::{KeyFilter, Record};

/// A notification callback.
///
/// Shared (`Rc`) so a registry can clone it out of its borrow before calling.
pub type Callback<T> = Rc<dyn Fn(&T)>;

type WeakCallback<T> = Weak<dyn Fn(&T)>;

/// Identifier of one registration within a [`ListenerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// RAII guard for one subscription.
///
/// The only operation is [`unsubscribe`](ListenerHandle::unsubscribe), which
/// is idempotent. Dropping the handle unsubscribes.
pub struct ListenerHandle {
    id: ListenerId,
    release: Option<Box<dyn FnOnce()>>,
}

impl ListenerHandle {
    /// Create a handle that runs `release` on the first unsubscribe.
    pub fn new(id: ListenerId, release: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    /// Whether `unsubscribe` still has work to do.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Remove the registration. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

enum Slot<T> {
    Owned(Callback<T>),
    Weak(WeakCallback<T>),
}

impl<T> Slot<T> {
    fn live(&self) -> Option<Callback<T>> {
        match self {
            Self::Owned(cb) => Some(Rc::clone(cb)),
            Self::Weak(weak) => weak.upgrade(),
        }
    }

    fn is_dead(&self) -> bool {
        matches!(self, Self::Weak(weak) if weak.strong_count() == 0)
    }
}

struct Entry<T> {
    id: ListenerId,
    slot: Slot<T>,
    keys: Option<KeyFilter>,
}

struct SetInner<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> SetInner<T> {
    fn push(&mut self, slot: Slot<T>, keys: Option<KeyFilter>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, slot, keys });
        id
    }
}

/// An ordered registry of change listeners.
///
/// Cloning a `ListenerSet` creates a new handle to the **same** registry.
pub struct ListenerSet<T> {
    inner: Rc<RefCell<SetInner<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ListenerSet")
            .field("len", &inner.entries.len())
            .field("next_id", &inner.next_id)
            .finish()
    }
}

impl<T: 'static> ListenerSet<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SetInner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register an owned listener, optionally scoped to `keys`.
    ///
    /// An empty key filter is stored as no filter.
    pub fn add(&self, callback: Callback<T>, keys: Option<&KeyFilter>) -> ListenerHandle {
        let keys = keys.filter(|k| !k.is_empty()).cloned();
        let id = self.inner.borrow_mut().push(Slot::Owned(callback), keys);
        let weak = Rc::downgrade(&self.inner);
        ListenerHandle::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().entries.retain(|e| e.id != id);
            }
        })
    }

    /// Register a weakly held listener. The caller owns `callback`; once it
    /// is dropped the entry goes dead and is removed by [`prune`](Self::prune).
    pub fn add_weak(&self, callback: &Callback<T>) -> ListenerId {
        self.inner
            .borrow_mut()
            .push(Slot::Weak(Rc::downgrade(callback)), None)
    }

    /// Drop weak entries whose callback no longer exists. Returns how many
    /// entries were removed.
    pub fn prune(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.entries.len();
        inner.entries.retain(|e| !e.slot.is_dead());
        let removed = before - inner.entries.len();
        #[cfg(feature = "tracing")]
        if removed > 0 {
            tracing::trace!(
                removed,
                remaining = inner.entries.len(),
                "pruned dead listener registrations"
            );
        }
        removed
    }

    /// Number of registrations, including dead weak entries not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no registrations exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Deliver `value` to every live listener, ignoring key filters.
    ///
    /// Intended for channels whose values have no keyed structure (loading
    /// flags, errors).
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter_map(|e| e.slot.live())
            .collect();
        for cb in &callbacks {
            cb(value);
        }
    }

    /// Deliver `next` to every live listener whose key filter matches the
    /// change from `prev` to `next`. Unfiltered listeners always receive it.
    pub fn emit_change(&self, prev: &T, next: &T)
    where
        T: Record,
    {
        let callbacks: Vec<Callback<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.keys.as_ref().is_none_or(|k| k.should_notify(prev, next)))
            .filter_map(|e| e.slot.live())
            .collect();
        for cb in &callbacks {
            cb(next);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    fn counter() -> (Rc<Cell<u32>>, Callback<i32>) {
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let cb: Callback<i32> = Rc::new(move |_: &i32| count_clone.set(count_clone.get() + 1));
        (count, cb)
    }

    #[test]
    fn emit_reaches_owned_listener() {
        let set = ListenerSet::new();
        let (count, cb) = counter();
        let _handle = set.add(cb, None);

        set.emit(&1);
        set.emit(&2);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn unsubscribe_removes_entry_immediately() {
        let set = ListenerSet::new();
        let (count, cb) = counter();
        let mut handle = set.add(cb, None);
        assert_eq!(set.len(), 1);

        handle.unsubscribe();
        assert_eq!(set.len(), 0);
        assert!(!handle.is_active());

        set.emit(&1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let set = ListenerSet::new();
        let (_count, cb1) = counter();
        let (_count2, cb2) = counter();
        let mut first = set.add(cb1, None);
        let _second = set.add(cb2, None);

        first.unsubscribe();
        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn drop_handle_unsubscribes() {
        let set = ListenerSet::new();
        let (count, cb) = counter();
        let handle = set.add(cb, None);
        drop(handle);

        assert!(set.is_empty());
        set.emit(&5);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn handle_outlives_set() {
        let set = ListenerSet::<i32>::new();
        let (_count, cb) = counter();
        let mut handle = set.add(cb, None);
        drop(set);
        handle.unsubscribe();
        assert!(!handle.is_active());
    }

    #[test]
    fn weak_entry_dies_with_callback() {
        let set = ListenerSet::new();
        let (count, cb) = counter();
        set.add_weak(&cb);

        set.emit(&1);
        assert_eq!(count.get(), 1);

        drop(cb);
        set.emit(&2);
        assert_eq!(count.get(), 1);
        // Dead entry lingers until pruned.
        assert_eq!(set.len(), 1);
        assert_eq!(set.prune(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn prune_keeps_live_entries() {
        let set = ListenerSet::new();
        let (_a, cb_a) = counter();
        let (_b, cb_b) = counter();
        set.add_weak(&cb_a);
        let _owned = set.add(Rc::clone(&cb_b), None);

        assert_eq!(set.prune(), 0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn notification_order_is_registration_order() {
        let set = ListenerSet::<i32>::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _h1 = set.add(Rc::new(move |_: &i32| log1.borrow_mut().push('A')), None);
        let log2 = Rc::clone(&log);
        let _h2 = set.add(Rc::new(move |_: &i32| log2.borrow_mut().push('B')), None);
        let log3 = Rc::clone(&log);
        let _h3 = set.add(Rc::new(move |_: &i32| log3.borrow_mut().push('C')), None);

        set.emit(&1);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let set = ListenerSet::<i32>::new();
        let slot: Rc<RefCell<Option<ListenerHandle>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let handle = set.add(
            Rc::new(move |_: &i32| {
                if let Some(mut h) = slot_clone.borrow_mut().take() {
                    h.unsubscribe();
                }
            }),
            None,
        );
        *slot.borrow_mut() = Some(handle);

        set.emit(&1);
        assert!(set.is_empty());
    }

    #[test]
    fn emit_change_honors_key_filter() {
        let set = ListenerSet::<BTreeMap<String, i32>>::new();
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let keys = KeyFilter::new(["b"]);
        let _h = set.add(
            Rc::new(move |_: &BTreeMap<String, i32>| hits_clone.set(hits_clone.get() + 1)),
            Some(&keys),
        );

        let prev = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 1)]);
        let only_a = BTreeMap::from([("a".to_string(), 2), ("b".to_string(), 1)]);
        let b_too = BTreeMap::from([("a".to_string(), 2), ("b".to_string(), 3)]);

        set.emit_change(&prev, &only_a);
        assert_eq!(hits.get(), 0);

        set.emit_change(&only_a, &b_too);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn empty_key_filter_is_unfiltered() {
        let set = ListenerSet::<BTreeMap<String, i32>>::new();
        let hits = Rc::new(Cell::new(0u32));
        let hits_clone = Rc::clone(&hits);
        let _h = set.add(
            Rc::new(move |_: &BTreeMap<String, i32>| hits_clone.set(hits_clone.get() + 1)),
            Some(&KeyFilter::default()),
        );

        let prev = BTreeMap::from([("a".to_string(), 1)]);
        let next = BTreeMap::from([("a".to_string(), 2)]);
        set.emit_change(&prev, &next);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn debug_format() {
        let set = ListenerSet::<i32>::new();
        let dbg = format!("{set:?}");
        assert!(dbg.contains("ListenerSet"));
        assert!(dbg.contains("len"));

        let (_count, cb) = counter();
        let handle = set.add(cb, None);
        let dbg = format!("{handle:?}");
        assert!(dbg.contains("ListenerId(0)"));
        assert!(dbg.contains("active: true"));
    }
}
