//! Scoped store lookup.
//!
//! Code far from where a store was built (view helpers, controllers) can ask
//! for it by state type instead of threading a handle through every call.
//! The store must be made available with [`provide`] first; asking outside of
//! such a scope is an error, never a silent default.
//!
//! ```
//! use slicekit::{provide, use_store, Store};
//!
//! let store = Store::new(0u32);
//! provide(&store, || {
//!     let found = use_store::<u32>().unwrap();
//!     found.update(|n| *n += 1);
//! });
//! assert_eq!(*store.get(), 1);
//! assert!(use_store::<u32>().is_err());
//! ```

use crate::error::{SliceError, SliceResult};
use crate::store::Store;
use std::any::{self, Any};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

// Thread-local stack of provided stores, innermost last.
thread_local! {
    static PROVIDED: RefCell<Vec<Box<dyn Any>>> = RefCell::new(Vec::new());
}

/// Run `f` with `store` available to [`use_store`] on this thread.
///
/// Scopes nest; an inner scope for the same state type shadows the outer one
/// until it returns.
pub fn provide<S, F, R>(store: &Store<S>, f: F) -> R
where
    S: Clone + Send + Sync + 'static,
    F: FnOnce() -> R,
{
    PROVIDED.with(|stack| {
        stack.borrow_mut().push(Box::new(store.clone()));
    });

    let result = panic::catch_unwind(AssertUnwindSafe(f));

    PROVIDED.with(|stack| {
        stack.borrow_mut().pop();
    });

    match result {
        Ok(r) => r,
        Err(e) => panic::resume_unwind(e),
    }
}

/// Get the innermost provided store for state `S`.
pub fn use_store<S>() -> SliceResult<Store<S>>
where
    S: Clone + Send + Sync + 'static,
{
    let found = PROVIDED.with(|stack| {
        stack
            .borrow()
            .iter()
            .rev()
            .find_map(|entry| entry.downcast_ref::<Store<S>>().cloned())
    });

    found.ok_or_else(|| {
        let state = any::type_name::<S>();
        debug!(state, "store requested outside of its provider");
        SliceError::MissingProvider { state }
    })
}
