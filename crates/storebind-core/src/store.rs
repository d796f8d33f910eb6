#![forbid(unsafe_code)]

//! Store capability traits.
//!
//! A store is modelled as a capability set rather than a type hierarchy:
//! anything that can report its current value, register change listeners,
//! and release dependency resources is a [`Store`]. Stores that wrap an
//! asynchronous activity additionally expose a loading flag and an error
//! value through [`AsyncStore`].
//!
//! All methods take `&self`. Stores are shared, single-threaded handles
//! (typically `Rc<RefCell<..>>` inside) and mutate through interior
//! mutability.

use std::rc::Rc;

use crate::filter::KeyFilter;
use crate::listener::{Callback, ListenerHandle};

/// An observable value container.
///
/// # Contract
///
/// - [`get`](Store::get) returns the current value synchronously and has no
///   side effects.
/// - [`listen`](Store::listen) registers `callback`; it is invoked with the
///   new value on every change. With `Some(keys)`, the store invokes it only
///   when at least one listed top-level key changed (see [`Record`]).
///   Dropping or unsubscribing the returned handle removes the registration.
/// - [`clear`](Store::clear) releases listeners the store registered on
///   upstream dependency stores that are no longer needed. It must be safe
///   to call at any time and any number of times.
///
/// [`Record`]: crate::Record
pub trait Store {
    /// The observed value.
    type Value: Clone + PartialEq + 'static;

    /// Current value.
    fn get(&self) -> Self::Value;

    /// Register a change listener, optionally scoped to `keys`.
    fn listen(&self, callback: Callback<Self::Value>, keys: Option<&KeyFilter>) -> ListenerHandle;

    /// Release dependency subscriptions that no longer serve any listener.
    fn clear(&self);
}

/// A store backed by an asynchronous activity (e.g. a fetch).
///
/// Loading and error registrations carry no handle. The store holds them
/// weakly: a registration lives as long as the caller keeps its callback
/// alive, and [`Store::clear`] prunes registrations whose callback is gone.
pub trait AsyncStore: Store {
    /// Opaque error reported by the underlying activity.
    type Error: Clone + 'static;

    /// Whether the activity is in flight.
    fn loading(&self) -> bool;

    /// Last reported error, if any.
    fn error(&self) -> Option<Self::Error>;

    /// Register a callback for loading-flag changes.
    fn load(&self, callback: &Callback<bool>);

    /// Register a callback for error changes. `None` means the error cleared.
    fn catch(&self, callback: &Callback<Option<Self::Error>>);
}

impl<S: Store + ?Sized> Store for &S {
    type Value = S::Value;

    fn get(&self) -> Self::Value {
        (**self).get()
    }

    fn listen(&self, callback: Callback<Self::Value>, keys: Option<&KeyFilter>) -> ListenerHandle {
        (**self).listen(callback, keys)
    }

    fn clear(&self) {
        (**self).clear();
    }
}

impl<S: AsyncStore + ?Sized> AsyncStore for &S {
    type Error = S::Error;

    fn loading(&self) -> bool {
        (**self).loading()
    }

    fn error(&self) -> Option<Self::Error> {
        (**self).error()
    }

    fn load(&self, callback: &Callback<bool>) {
        (**self).load(callback);
    }

    fn catch(&self, callback: &Callback<Option<Self::Error>>) {
        (**self).catch(callback);
    }
}

impl<S: Store + ?Sized> Store for Rc<S> {
    type Value = S::Value;

    fn get(&self) -> Self::Value {
        (**self).get()
    }

    fn listen(&self, callback: Callback<Self::Value>, keys: Option<&KeyFilter>) -> ListenerHandle {
        (**self).listen(callback, keys)
    }

    fn clear(&self) {
        (**self).clear();
    }
}

impl<S: AsyncStore + ?Sized> AsyncStore for Rc<S> {
    type Error = S::Error;

    fn loading(&self) -> bool {
        (**self).loading()
    }

    fn error(&self) -> Option<Self::Error> {
        (**self).error()
    }

    fn load(&self, callback: &Callback<bool>) {
        (**self).load(callback);
    }

    fn catch(&self, callback: &Callback<Option<Self::Error>>) {
        (**self).catch(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenerSet;
    use std::cell::{Cell, RefCell};

    /// Minimal store used to exercise the forwarding impls.
    struct Counter {
        value: RefCell<u32>,
        listeners: ListenerSet<u32>,
        clears: Cell<u32>,
    }

    impl Counter {
        fn new(value: u32) -> Self {
            Self {
                value: RefCell::new(value),
                listeners: ListenerSet::new(),
                clears: Cell::new(0),
            }
        }

        fn set(&self, value: u32) {
            let prev = self.value.replace(value);
            if prev != value {
                self.listeners.emit_change(&prev, &value);
            }
        }
    }

    impl Store for Counter {
        type Value = u32;

        fn get(&self) -> u32 {
            *self.value.borrow()
        }

        fn listen(&self, callback: Callback<u32>, keys: Option<&KeyFilter>) -> ListenerHandle {
            self.listeners.add(callback, keys)
        }

        fn clear(&self) {
            self.clears.set(self.clears.get() + 1);
        }
    }

    fn read_through<S: Store<Value = u32>>(store: S) -> u32 {
        store.get()
    }

    #[test]
    fn reference_forwards() {
        let counter = Counter::new(7);
        assert_eq!(read_through(&counter), 7);
        (&counter).clear();
        assert_eq!(counter.clears.get(), 1);
    }

    #[test]
    fn rc_forwards_listen() {
        let counter = Rc::new(Counter::new(0));
        let seen = Rc::new(Cell::new(0));
        let seen_clone = Rc::clone(&seen);

        let _handle = Store::listen(&counter, Rc::new(move |v: &u32| seen_clone.set(*v)), None);
        counter.set(3);
        assert_eq!(seen.get(), 3);
        assert_eq!(read_through(Rc::clone(&counter)), 3);
    }
}
