//! Comparison strategies for selector subscriptions.
//!
//! A selector subscription only fires when the selected value changes
//! according to the chosen strategy. [`identical`] is the default and
//! compares `Arc` identity, which is what copy-on-write updates preserve for
//! untouched fields. [`shallow`] falls back to `PartialEq`.

use std::sync::Arc;

/// Values that can be compared by reference identity.
pub trait Identity {
    fn identical(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identity for Arc<T> {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Identity> Identity for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A: Identity, B: Identity> Identity for (A, B) {
    fn identical(&self, other: &Self) -> bool {
        self.0.identical(&other.0) && self.1.identical(&other.1)
    }
}

/// Reference equality.
pub fn identical<U: Identity>(a: &U, b: &U) -> bool {
    a.identical(b)
}

/// Value equality.
pub fn shallow<U: PartialEq>(a: &U, b: &U) -> bool {
    a == b
}
