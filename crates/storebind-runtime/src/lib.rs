#![forbid(unsafe_code)]

//! Runtime: bindings between stores and UI components.
//!
//! # Role in storebind
//! `storebind-runtime` turns any [`Store`](storebind_core::Store) into
//! component-local state. A binding reads the store once at creation, keeps
//! one subscription while mounted, asks the host to re-render through an
//! [`Invalidator`] when an observed field changes, and releases everything
//! on unmount.
//!
//! # Primary responsibilities
//! - **[`ValueBinding`] / [`use_store`]**: mirror a store's value, optionally
//!   narrowed to a set of top-level keys.
//! - **[`FetchedBinding`] / [`use_fetched`]**: mirror an
//!   [`AsyncStore`](storebind_core::AsyncStore)'s value, loading flag and
//!   error.
//! - **[`BindingConfig`]**: deterministic defaults with environment
//!   overrides.
//! - **[`host`]**: the re-render hooks a host hands to its bindings.
//!
//! # Threading
//! Bindings are single-threaded (`!Send`). They share state with their
//! callbacks through `Rc`, matching a UI thread that owns both the stores and
//! the component tree.

pub mod config;
pub mod host;
pub mod reactive;

pub use config::{BindingConfig, BindingConfigError, BindingConfigParse};
pub use host::{DirtyFlag, Invalidator};
pub use reactive::{
    Fetched, FetchedBinding, Phase, ValueBinding, use_fetched, use_store,
};
