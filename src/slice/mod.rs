//! The slice catalog.
//!
//! Each slice is a state type (created with an optional initial value) plus an
//! action handle attached to a [`Store`](crate::Store) through a
//! [`Lens`](crate::Lens):
//!
//! - Data: [`DataSlice`], [`MutableDataSlice`], [`RestorableDataSlice`],
//!   [`RefreshableDataSlice`]
//! - Lists: [`ListSlice`], [`MutableListSlice`]
//! - Order: [`ReorderableListSlice`]

mod data;
mod list;
mod order;

pub use data::{
    DataSlice, DataState, HoldsBaseline, HoldsData, HoldsFreshData, MutableDataSlice,
    RefreshableDataSlice, RefreshableState, RestorableDataSlice, RestorableState,
};
pub use list::{Collection, ListChanges, ListSlice, ListState, MutableListSlice};
pub use order::{OrderState, ReorderableListSlice};

/// Slice kinds, as reported in field collisions.
pub(crate) mod kind {
    pub const DATA: &str = "data";
    pub const MUTABLE_DATA: &str = "mutable data";
    pub const RESTORABLE_DATA: &str = "restorable data";
    pub const REFRESHABLE_DATA: &str = "refreshable data";
    pub const LIST: &str = "list";
    pub const MUTABLE_LIST: &str = "mutable list";
    pub const REORDERABLE_LIST: &str = "reorderable list";
}
