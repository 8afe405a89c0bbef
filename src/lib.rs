//! # Slicekit
//!
//! Small, composable state slices over a copy-on-write store.
//!
//! ## Store
//!
//! [`Store<S>`] holds immutable `Arc<S>` snapshots. Every update runs against
//! a draft, untouched fields stay pointer-identical, and subscribers are
//! notified once per committed update.
//!
//! ## Slices
//!
//! A slice is a state type plus a handle of actions:
//! - [`DataSlice`] and its [`MutableDataSlice`], [`RestorableDataSlice`] and
//!   [`RefreshableDataSlice`] variants hold one nullable value
//! - [`ListSlice`] and [`MutableListSlice`] hold a keyed collection and track
//!   added and deleted ids
//! - [`ReorderableListSlice`] holds the order of ids
//!
//! Slices are composed by embedding their states in one struct and attaching
//! each handle through a [`Lens`]:
//!
//! ```
//! use slicekit::{lens, ListChanges, ListSlice, ListState, MutableListSlice, Store};
//!
//! #[derive(Clone, Default)]
//! struct App {
//!     todos: ListState<u32, String>,
//!     changes: ListChanges<u32>,
//! }
//!
//! let store = Store::new(App::default());
//! let list = ListSlice::attach(&store, lens!(App, todos))?;
//! let todos = MutableListSlice::attach(&list, lens!(App, changes))?;
//!
//! todos.add(1, "write docs".to_string());
//! assert_eq!(*todos.added(), vec![1]);
//! # Ok::<(), slicekit::SliceError>(())
//! ```

pub mod cow;
mod error;
pub mod lens;
pub mod provider;
pub mod slice;
pub mod store;

pub use error::{SliceError, SliceResult};
pub use lens::Lens;
pub use provider::{provide, use_store};
pub use slice::{
    Collection, DataSlice, DataState, HoldsBaseline, HoldsData, HoldsFreshData, ListChanges,
    ListSlice, ListState, MutableDataSlice, MutableListSlice, OrderState, RefreshableDataSlice,
    RefreshableState, ReorderableListSlice, RestorableDataSlice, RestorableState,
};
pub use store::{Store, StoreConfig, Subscription};
