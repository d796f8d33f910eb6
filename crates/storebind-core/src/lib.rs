#![forbid(unsafe_code)]

//! Core: the store capability set and subscription primitives.
//!
//! # Role in storebind
//! `storebind-core` describes what a store must offer for a UI binding to
//! consume it. It owns no store implementation. The runtime crate
//! (`storebind-runtime`) builds the bindings on top of these traits, and any
//! concrete store (plain, derived, fetch-backed) plugs in by implementing
//! them.
//!
//! # Primary responsibilities
//! - **[`Store`] / [`AsyncStore`]**: the capability set `{get, listen, clear}`
//!   plus `{loading, error, load, catch}` for asynchronous stores.
//! - **[`ListenerHandle`]**: RAII subscription guard; unsubscribes on drop.
//! - **[`ListenerSet`]**: a reusable listener registry for store implementers.
//! - **[`KeyFilter`] / [`Record`]**: shallow, one-level key-scoped change
//!   detection.

pub mod filter;
pub mod listener;
pub mod store;

pub use filter::{KeyFilter, Record};
pub use listener::{Callback, ListenerHandle, ListenerId, ListenerSet};
pub use store::{AsyncStore, Store};
