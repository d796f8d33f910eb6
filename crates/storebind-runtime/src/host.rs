#![forbid(unsafe_code)]

//! Hooks through which a binding asks its host to re-render.
//!
//! A binding never renders anything itself. When one of its observed fields
//! changes it calls its [`Invalidator`], and the host decides what a
//! re-render means: schedule a frame, flip a dirty bit, send a message.
//!
//! [`DirtyFlag`] is the immediate-mode variant: the render loop polls
//! [`DirtyFlag::take`] once per frame and redraws when it returns `true`.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Re-render request hook handed to a binding.
///
/// Cloning shares the same hook.
#[derive(Clone, Default)]
pub struct Invalidator {
    hook: Option<Rc<dyn Fn()>>,
}

impl Invalidator {
    /// Wrap a host callback.
    pub fn new(hook: impl Fn() + 'static) -> Self {
        Self {
            hook: Some(Rc::new(hook)),
        }
    }

    /// An invalidator that does nothing. Useful when the host re-reads the
    /// binding on its own schedule.
    #[must_use]
    pub fn noop() -> Self {
        Self { hook: None }
    }

    /// Ask the host to re-render.
    pub fn invalidate(&self) {
        if let Some(hook) = &self.hook {
            hook();
        }
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.hook.is_none()
    }
}

impl fmt::Debug for Invalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidator")
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Poll-style invalidation sink.
///
/// Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag {
    dirty: Rc<Cell<bool>>,
    invalidations: Rc<Cell<u64>>,
}

impl DirtyFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An [`Invalidator`] that sets this flag.
    #[must_use]
    pub fn invalidator(&self) -> Invalidator {
        let flag = self.clone();
        Invalidator::new(move || flag.mark())
    }

    /// Set the flag directly.
    pub fn mark(&self) {
        self.dirty.set(true);
        self.invalidations.set(self.invalidations.get() + 1);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Return whether a re-render is due and reset the flag.
    pub fn take(&self) -> bool {
        self.dirty.replace(false)
    }

    /// Total invalidation requests since creation. Never reset.
    #[must_use]
    pub fn invalidations(&self) -> u64 {
        self.invalidations.get()
    }
}
