//! The store container shared by every slice.
//!
//! A store owns one immutable snapshot of its state at a time. Updates run a
//! recipe against a copy-on-write draft, swap the snapshot atomically and
//! notify subscribers once per committed update.

pub mod equality;
mod store;

pub use store::{Store, StoreConfig, Subscription};
pub(crate) use store::Binding;
