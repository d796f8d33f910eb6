#![forbid(unsafe_code)]

//! Manually driven asynchronous resource.
//!
//! [`FetchedStore<T, E>`] stands in for a fetch-backed store without any
//! network: the test decides when the "request" resolves or fails. Its value
//! is `Option<T>` (no data until the first success), and it exposes the
//! loading and error channels of [`AsyncStore`].
//!
//! Loading and error registrations are held weakly and pruned by
//! [`clear()`](Store::clear), which is how a binding releases them on
//! teardown.
//!
//! # Lifecycle
//!
//! ```text
//! pending ──resolve──▶ loaded (data=Some, loading=false, error=None)
//!    │
//!    └────reject───▶ failed (loading=false, error=Some)
//!
//! loaded/failed ──refetch──▶ pending (error cleared)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use storebind_core::{AsyncStore, Callback, KeyFilter, ListenerHandle, ListenerSet, Record, Store};

/// Error reported by a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// HTTP-like status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl FetchError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "fetch failed with status {}", self.status)
        } else {
            write!(f, "fetch failed with status {}: {}", self.status, self.body)
        }
    }
}

impl std::error::Error for FetchError {}

struct FetchedInner<T, E> {
    data: Option<T>,
    loading: bool,
    error: Option<E>,
}

/// A fetch-backed store whose outcome is driven by the caller.
///
/// Cloning a `FetchedStore` creates a new handle to the **same** state.
pub struct FetchedStore<T, E = FetchError> {
    inner: Rc<RefCell<FetchedInner<T, E>>>,
    values: ListenerSet<Option<T>>,
    loading_listeners: ListenerSet<bool>,
    error_listeners: ListenerSet<Option<E>>,
}

impl<T, E> Clone for FetchedStore<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            values: self.values.clone(),
            loading_listeners: self.loading_listeners.clone(),
            error_listeners: self.error_listeners.clone(),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for FetchedStore<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FetchedStore")
            .field("data", &inner.data)
            .field("loading", &inner.loading)
            .field("error", &inner.error)
            .finish()
    }
}

impl<T, E> FetchedStore<T, E>
where
    T: Clone + Record + 'static,
    E: Clone + 'static,
{
    fn with_state(loading: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FetchedInner {
                data: None,
                loading,
                error: None,
            })),
            values: ListenerSet::new(),
            loading_listeners: ListenerSet::new(),
            error_listeners: ListenerSet::new(),
        }
    }

    /// A store whose request is already in flight.
    #[must_use]
    pub fn pending() -> Self {
        Self::with_state(true)
    }

    /// A store that has not started a request.
    #[must_use]
    pub fn idle() -> Self {
        Self::with_state(false)
    }

    /// Complete the request successfully.
    pub fn resolve(&self, data: T) {
        self.set_data(Some(data));
        self.set_error(None);
        self.set_loading(false);
    }

    /// Fail the request. Existing data is kept.
    pub fn reject(&self, error: E) {
        self.set_error(Some(error));
        self.set_loading(false);
    }

    /// Start a new request, clearing any previous error.
    pub fn refetch(&self) {
        self.set_loading(true);
        self.set_error(None);
    }

    /// Number of value listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.values.len()
    }

    /// Number of loading registrations, including dead ones not yet pruned.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loading_listeners.len()
    }

    /// Number of error registrations, including dead ones not yet pruned.
    #[must_use]
    pub fn catch_count(&self) -> usize {
        self.error_listeners.len()
    }

    fn set_data(&self, next: Option<T>) {
        let prev = {
            let mut inner = self.inner.borrow_mut();
            if inner.data == next {
                return;
            }
            std::mem::replace(&mut inner.data, next.clone())
        };
        self.values.emit_change(&prev, &next);
    }

    fn set_loading(&self, next: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.loading == next {
                return;
            }
            inner.loading = next;
        }
        tracing::trace!(loading = next, "fetched store loading changed");
        self.loading_listeners.emit(&next);
    }

    fn set_error(&self, next: Option<E>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.error.is_none() && next.is_none() {
                return;
            }
            inner.error.clone_from(&next);
        }
        tracing::trace!(failed = next.is_some(), "fetched store error changed");
        self.error_listeners.emit(&next);
    }
}

impl<T, E> Store for FetchedStore<T, E>
where
    T: Clone + Record + 'static,
    E: Clone + 'static,
{
    type Value = Option<T>;

    fn get(&self) -> Option<T> {
        self.inner.borrow().data.clone()
    }

    fn listen(&self, callback: Callback<Option<T>>, keys: Option<&KeyFilter>) -> ListenerHandle {
        self.values.add(callback, keys)
    }

    fn clear(&self) {
        let pruned = self.loading_listeners.prune() + self.error_listeners.prune();
        tracing::trace!(pruned, "fetched store cleared");
    }
}

impl<T, E> AsyncStore for FetchedStore<T, E>
where
    T: Clone + Record + 'static,
    E: Clone + 'static,
{
    type Error = E;

    fn loading(&self) -> bool {
        self.inner.borrow().loading
    }

    fn error(&self) -> Option<E> {
        self.inner.borrow().error.clone()
    }

    fn load(&self, callback: &Callback<bool>) {
        self.loading_listeners.add_weak(callback);
    }

    fn catch(&self, callback: &Callback<Option<E>>) {
        self.error_listeners.add_weak(callback);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
