#![forbid(unsafe_code)]

//! State shared between a binding and the callbacks it hands to a store.
//!
//! Callbacks hold only a `Weak` to their [`Observed`] slot, and the slot
//! carries an `active` flag cleared on teardown. Either guard alone turns a
//! late notification into a no-op.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use storebind_core::Callback;
use tracing::{debug, trace};

use crate::config::BindingConfig;
use crate::host::Invalidator;

pub(crate) struct Observed<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    active: Cell<bool>,
}

impl<T: Clone> Observed<T> {
    pub(crate) fn new(value: T) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
            version: Cell::new(0),
            active: Cell::new(true),
        })
    }

    pub(crate) fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.borrow())
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.get()
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }

    /// Adopt `next` unless `same(current, next)`. Returns whether the
    /// observed state changed.
    fn accept(&self, next: &T, same: &dyn Fn(&T, &T) -> bool) -> bool {
        {
            let current = self.value.borrow();
            if same(&*current, next) {
                return false;
            }
        }
        *self.value.borrow_mut() = next.clone();
        self.version.set(self.version.get() + 1);
        true
    }
}

/// What a callback needs besides its slot.
#[derive(Clone)]
pub(crate) struct Notifier {
    invalidator: Invalidator,
    trace: bool,
    label: Rc<str>,
    channel: &'static str,
}

impl Notifier {
    pub(crate) fn new(
        config: &BindingConfig,
        invalidator: &Invalidator,
        channel: &'static str,
    ) -> Self {
        Self {
            invalidator: invalidator.clone(),
            trace: config.trace_notifications,
            label: Rc::from(config.label_or_default()),
            channel,
        }
    }
}

/// Build a store callback writing into `slot`.
///
/// `same` decides whether an incoming value is indistinguishable from the
/// observed one; such notifications neither bump the version nor
/// invalidate the host.
pub(crate) fn callback<T: Clone + 'static>(
    slot: &Rc<Observed<T>>,
    notifier: Notifier,
    same: impl Fn(&T, &T) -> bool + 'static,
) -> Callback<T> {
    let weak = Rc::downgrade(slot);
    Rc::new(move |next: &T| {
        let Some(slot) = weak.upgrade() else {
            debug!(
                label = %notifier.label,
                channel = notifier.channel,
                "notification for dropped binding ignored"
            );
            return;
        };
        if !slot.active.get() {
            debug!(
                label = %notifier.label,
                channel = notifier.channel,
                "notification after unmount ignored"
            );
            return;
        }
        if !slot.accept(next, &same) {
            return;
        }
        if notifier.trace {
            trace!(
                label = %notifier.label,
                channel = notifier.channel,
                version = slot.version(),
                "binding observed change"
            );
        }
        notifier.invalidator.invalidate();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DirtyFlag;

    fn notifier(flag: &DirtyFlag) -> Notifier {
        Notifier::new(&BindingConfig::default(), &flag.invalidator(), "value")
    }

    #[test]
    fn accepts_and_invalidates() {
        let flag = DirtyFlag::new();
        let slot = Observed::new(1);
        let cb = callback(&slot, notifier(&flag), |a: &i32, b: &i32| a == b);

        cb(&2);
        assert_eq!(slot.get(), 2);
        assert_eq!(slot.version(), 1);
        assert!(flag.take());
    }

    #[test]
    fn equal_value_is_skipped() {
        let flag = DirtyFlag::new();
        let slot = Observed::new(1);
        let cb = callback(&slot, notifier(&flag), |a: &i32, b: &i32| a == b);

        cb(&1);
        assert_eq!(slot.version(), 0);
        assert!(!flag.is_dirty());
    }

    #[test]
    fn inactive_slot_ignores_notifications() {
        let flag = DirtyFlag::new();
        let slot = Observed::new(1);
        let cb = callback(&slot, notifier(&flag), |_: &i32, _: &i32| false);

        slot.deactivate();
        cb(&5);
        assert_eq!(slot.get(), 1);
        assert_eq!(flag.invalidations(), 0);
    }

    #[test]
    fn dropped_slot_ignores_notifications() {
        let flag = DirtyFlag::new();
        let slot = Observed::new(1);
        let cb = callback(&slot, notifier(&flag), |_: &i32, _: &i32| false);

        drop(slot);
        cb(&5);
        assert_eq!(flag.invalidations(), 0);
    }

    #[test]
    fn with_reads_in_place() {
        let slot = Observed::new(vec![1, 2, 3]);
        assert_eq!(slot.with(|v| v.len()), 3);
    }
}
