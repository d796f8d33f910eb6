#![forbid(unsafe_code)]

//! Binding for fetch-backed stores.
//!
//! [`FetchedBinding<S>`] observes three independent channels of an
//! [`AsyncStore`]:
//!
//! | Field     | Initial          | Updated by         |
//! |-----------|------------------|--------------------|
//! | `data`    | `store.get()`    | `listen(keys)`     |
//! | `loading` | `store.loading()`| `load(callback)`   |
//! | `error`   | `store.error()`  | `catch(callback)`  |
//!
//! No ordering between channels is assumed. The binding owns the strong
//! `load`/`catch` callbacks; the store may keep only weak references and
//! prune them in `clear()`.

use std::any::type_name;
use std::rc::Rc;

use storebind_core::{AsyncStore, Callback, KeyFilter, ListenerHandle};
use tracing::debug;

use super::Phase;
use super::observed::{Notifier, Observed, callback};
use crate::config::BindingConfig;
use crate::host::Invalidator;

/// Snapshot of a fetched binding's three fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T, E> {
    pub data: T,
    pub loading: bool,
    pub error: Option<E>,
}

impl<T, E> Fetched<T, E> {
    /// Neither loading nor failed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.loading && self.error.is_none()
    }
}

/// Mirrors an async store's value, loading flag and error.
///
/// Dropping the binding unmounts it.
pub struct FetchedBinding<S: AsyncStore> {
    store: S,
    keys: Option<KeyFilter>,
    config: BindingConfig,
    invalidator: Invalidator,
    data: Rc<Observed<S::Value>>,
    loading: Rc<Observed<bool>>,
    error: Rc<Observed<Option<S::Error>>>,
    handle: Option<ListenerHandle>,
    load_cb: Option<Callback<bool>>,
    catch_cb: Option<Callback<Option<S::Error>>>,
    phase: Phase,
}

impl<S: AsyncStore> FetchedBinding<S> {
    /// Create a binding and read all three fields from the store.
    pub fn new(store: S, keys: Option<KeyFilter>) -> Self {
        let data = Observed::new(store.get());
        let loading = Observed::new(store.loading());
        let error = Observed::new(store.error());
        Self {
            store,
            keys,
            config: BindingConfig::default(),
            invalidator: Invalidator::noop(),
            data,
            loading,
            error,
            handle: None,
            load_cb: None,
            catch_cb: None,
            phase: Phase::Created,
        }
    }

    /// Replace the configuration. Defaults to [`BindingConfig::default`].
    #[must_use]
    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn on_change(mut self, invalidator: Invalidator) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Register the value listener and the loading/error callbacks, once.
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
        let on_data = callback(
            &self.data,
            Notifier::new(&self.config, &self.invalidator, "data"),
            move |current: &S::Value, next: &S::Value| dedupe && current == next,
        );
        let on_loading = callback(
            &self.loading,
            Notifier::new(&self.config, &self.invalidator, "loading"),
            move |current: &bool, next: &bool| dedupe && current == next,
        );
        // Errors carry no equality; every delivery is a change.
        let on_error = callback(
            &self.error,
            Notifier::new(&self.config, &self.invalidator, "error"),
            |_: &Option<S::Error>, _: &Option<S::Error>| false,
        );

        self.handle = Some(self.store.listen(on_data, self.keys.as_ref()));
        self.store.load(&on_loading);
        self.store.catch(&on_error);
        self.load_cb = Some(on_loading);
        self.catch_cb = Some(on_error);
        self.phase = Phase::Mounted;

        debug!(
            label = self.config.label_or_default(),
            store = type_name::<S>(),
            keys = self.keys.as_ref().map_or(0, KeyFilter::len),
            loading = self.loading.get(),
            "fetched binding mounted"
        );
    }

    /// Detach everything and release store-held dependencies. Idempotent.
    pub fn unmount(&mut self) {
        if self.phase == Phase::Unmounted {
            return;
        }
        let was_mounted = self.phase == Phase::Mounted;
        self.phase = Phase::Unmounted;

        self.data.deactivate();
        self.loading.deactivate();
        self.error.deactivate();
        if let Some(mut handle) = self.handle.take() {
            handle.unsubscribe();
        }
        self.load_cb = None;
        self.catch_cb = None;
        self.store.clear();

        debug!(
            label = self.config.label_or_default(),
            store = type_name::<S>(),
            was_mounted,
            changes = self.version(),
            "fetched binding unmounted"
        );
    }

    /// All three fields at once.
    pub fn snapshot(&self) -> Fetched<S::Value, S::Error> {
        Fetched {
            data: self.data.get(),
            loading: self.loading.get(),
            error: self.error.get(),
        }
    }

    pub fn data(&self) -> S::Value {
        self.data.get()
    }

    pub fn with_data<R>(&self, f: impl FnOnce(&S::Value) -> R) -> R {
        self.data.with(f)
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading.get()
    }

    pub fn error(&self) -> Option<S::Error> {
        self.error.get()
    }

    /// Total observed changes across all three channels.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.data.version() + self.loading.version() + self.error.version()
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

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: AsyncStore> Drop for FetchedBinding<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl<S: AsyncStore> std::fmt::Debug for FetchedBinding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBinding")
            .field("loading", &self.loading.get())
            .field("failed", &self.error.with(Option::is_some))
            .field("version", &self.version())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Bind an async store: read value, loading flag and error now, and follow
/// each of them afterwards.
pub fn use_fetched<S: AsyncStore>(
    store: S,
    keys: Option<KeyFilter>,
    invalidator: Invalidator,
) -> FetchedBinding<S> {
    let mut binding = FetchedBinding::new(store, keys).on_change(invalidator);
    binding.mount();
    binding
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
