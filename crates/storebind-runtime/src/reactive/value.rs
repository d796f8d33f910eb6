#![forbid(unsafe_code)]

//! Plain value binding.
//!
//! [`ValueBinding<S>`] mirrors a store's current value into component state.
//! It reads `store.get()` at creation (no empty first frame), registers one
//! listener on mount, and on teardown unsubscribes that listener and calls
//! `store.clear()` so the store can drop dependency listeners it was keeping
//! alive for this binding.
//!
//! # Example
//!
//! ```
//! use storebind_core::Store;
//! use storebind_runtime::host::DirtyFlag;
//! use storebind_runtime::reactive::use_store;
//! # use std::cell::RefCell;
//! # use storebind_core::{Callback, KeyFilter, ListenerHandle, ListenerSet};
//! # struct Counter { value: RefCell<u32>, listeners: ListenerSet<u32> }
//! # impl Store for Counter {
//! #     type Value = u32;
//! #     fn get(&self) -> u32 { *self.value.borrow() }
//! #     fn listen(&self, cb: Callback<u32>, keys: Option<&KeyFilter>) -> ListenerHandle {
//! #         self.listeners.add(cb, keys)
//! #     }
//! #     fn clear(&self) {}
//! # }
//! # let counter = Counter { value: RefCell::new(0), listeners: ListenerSet::new() };
//!
//! let frame = DirtyFlag::new();
//! let binding = use_store(&counter, None, frame.invalidator());
//! assert_eq!(binding.value(), 0);
//! ```

use std::any::type_name;
use std::rc::Rc;

use storebind_core::{KeyFilter, ListenerHandle, Store};
use tracing::debug;

use super::Phase;
use super::observed::{Notifier, Observed, callback};
use crate::config::BindingConfig;
use crate::host::Invalidator;

/// Mirrors a store's value into component-local state.
///
/// Dropping the binding unmounts it.
pub struct ValueBinding<S: Store> {
    store: S,
    keys: Option<KeyFilter>,
    config: BindingConfig,
    invalidator: Invalidator,
    value: Rc<Observed<S::Value>>,
    handle: Option<ListenerHandle>,
    phase: Phase,
}

impl<S: Store> ValueBinding<S> {
    /// Create a binding and read the store's current value.
    ///
    /// No listener is attached until [`mount`](Self::mount).
    pub fn new(store: S, keys: Option<KeyFilter>) -> Self {
        let initial = store.get();
        Self {
            store,
            keys,
            config: BindingConfig::default(),
            invalidator: Invalidator::noop(),
            value: Observed::new(initial),
            handle: None,
            phase: Phase::Created,
        }
    }

    /// Replace the configuration. Takes effect at mount.
    ///
    /// Without this call the binding uses [`BindingConfig::default`]; pass
    /// [`BindingConfig::from_env`] to honor the `STOREBIND_*` variables.
    #[must_use]
    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the host re-render hook. Takes effect at mount.
    #[must_use]
    pub fn on_change(mut self, invalidator: Invalidator) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Attach the value listener. Idempotent; ignored after unmount.
    pub fn mount(&mut self) {
        match self.phase {
            Phase::Created => {}
            Phase::Mounted => return,
            Phase::Unmounted => {
                debug!(
                    label = self.config.label_or_default(),
                    "mount ignored: binding already unmounted"
                );
                return;
            }
        }

        let dedupe = self.config.dedupe;
        let cb = callback(
            &self.value,
            Notifier::new(&self.config, &self.invalidator, "value"),
            move |current: &S::Value, next: &S::Value| dedupe && current == next,
        );
        self.handle = Some(self.store.listen(cb, self.keys.as_ref()));
        self.phase = Phase::Mounted;

        debug!(
            label = self.config.label_or_default(),
            store = type_name::<S>(),
            keys = self.keys.as_ref().map_or(0, KeyFilter::len),
            "value binding mounted"
        );
    }

    /// Detach the listener and release store-held dependencies.
    ///
    /// Idempotent. Never panics on its own account; `store.clear()` runs
    /// on every first call, even if the binding was never mounted.
    pub fn unmount(&mut self) {
        if self.phase == Phase::Unmounted {
            return;
        }
        let was_mounted = self.phase == Phase::Mounted;
        self.phase = Phase::Unmounted;

        self.value.deactivate();
        if let Some(mut handle) = self.handle.take() {
            handle.unsubscribe();
        }
        self.store.clear();

        debug!(
            label = self.config.label_or_default(),
            store = type_name::<S>(),
            was_mounted,
            changes = self.value.version(),
            "value binding unmounted"
        );
    }

    /// Last observed value.
    pub fn value(&self) -> S::Value {
        self.value.get()
    }

    /// Read the last observed value without cloning.
    pub fn with_value<R>(&self, f: impl FnOnce(&S::Value) -> R) -> R {
        self.value.with(f)
    }

    /// Number of observed changes since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.value.version()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.phase == Phase::Mounted
    }

    #[must_use]
    pub fn keys(&self) -> Option<&KeyFilter> {
        self.keys.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// The bound store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: Store> Drop for ValueBinding<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<S: Store> std::fmt::Debug for ValueBinding<S>
where
    S::Value: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueBinding")
            .field("value", &self.value.with(|v| format!("{v:?}")))
            .field("version", &self.version())
            .field("phase", &self.phase)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// Bind `store` to a component: read its value now and listen for changes.
///
/// `keys` restricts re-renders to changes of those top-level keys. The
/// returned binding stays subscribed until it is unmounted or dropped.
pub fn use_store<S: Store>(
    store: S,
    keys: Option<KeyFilter>,
    invalidator: Invalidator,
) -> ValueBinding<S> {
    let mut binding = ValueBinding::new(store, keys).on_change(invalidator);
    binding.mount();
    binding
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
