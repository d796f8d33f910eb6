#![forbid(unsafe_code)]

//! storebind public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.
//!
//! ```
//! use storebind::prelude::*;
//! use storebind_harness::MemoryStore;
//!
//! let count = MemoryStore::new(0);
//! let frame = DirtyFlag::new();
//! let binding = use_store(count.clone(), None, frame.invalidator());
//!
//! count.set(1);
//! assert_eq!(binding.value(), 1);
//! assert!(frame.take());
//! ```

pub use storebind_core as core;
#[cfg(feature = "harness")]
pub use storebind_harness as harness;
#[cfg(feature = "runtime")]
pub use storebind_runtime as runtime;

pub mod prelude {
    pub use storebind_core::{AsyncStore, Callback, KeyFilter, ListenerHandle, Record, Store};
    #[cfg(feature = "runtime")]
    pub use storebind_runtime::{
        BindingConfig, DirtyFlag, Fetched, FetchedBinding, Invalidator, ValueBinding,
        use_fetched, use_store,
    };
}
