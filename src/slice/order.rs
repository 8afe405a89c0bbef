//! A slice holding the display order of ids.
//!
//! The order is independent of any keyed collection: ids may be listed here
//! without existing in a [`ListState`](super::ListState) and vice versa.
//! Keeping the two in step is up to the caller.

use super::kind;
use crate::cow;
use crate::error::SliceResult;
use crate::lens::Lens;
use crate::store::{Binding, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// State of a reorderable list slice.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderState<K> {
    pub order: Arc<Vec<K>>,
}

impl<K> OrderState<K> {
    pub fn new(initial: Option<Vec<K>>) -> Self {
        Self {
            order: Arc::new(initial.unwrap_or_default()),
        }
    }
}

impl<K> Clone for OrderState<K> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
        }
    }
}

impl<K> Default for OrderState<K> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Actions that relocate single ids within an ordered sequence.
///
/// Every move keeps the relative order of all other ids. Moves of unknown
/// ids, or moves that would not change anything, leave the store untouched
/// and return `false`.
pub struct ReorderableListSlice<S, K> {
    store: Store<S>,
    lens: Lens<S, OrderState<K>>,
    _binding: Arc<Binding>,
}

impl<S, K> ReorderableListSlice<S, K>
where
    S: Clone + Send + Sync + 'static,
    K: PartialEq + Clone + Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, OrderState<K>>) -> SliceResult<Self> {
        let binding = store.bind(lens.name(), kind::REORDERABLE_LIST)?;
        Ok(Self {
            store: store.clone(),
            lens,
            _binding: binding,
        })
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn order(&self) -> Arc<Vec<K>> {
        self.store.read(|state| self.lens.get(state).order.clone())
    }

    pub fn position(&self, id: &K) -> Option<usize> {
        self.store
            .read(|state| self.lens.get(state).order.iter().position(|k| k == id))
    }

    pub fn set_order(&self, order: Vec<K>) {
        let lens = self.lens;
        self.store.update(move |state| {
            lens.get_mut(state).order = Arc::new(order);
        });
    }

    /// Move `id` to `target`, clamped to the bounds of the sequence.
    pub fn move_to(&self, id: &K, target: isize) -> bool {
        self.relocate(id, |_, len| Some(clamp(target, len)))
    }

    pub fn move_to_top(&self, id: &K) -> bool {
        self.relocate(id, |_, _| Some(0))
    }

    pub fn move_to_bottom(&self, id: &K) -> bool {
        self.relocate(id, |_, len| Some(len - 1))
    }

    /// Swap `id` with its predecessor.
    pub fn move_up(&self, id: &K) -> bool {
        self.relocate(id, |from, _| from.checked_sub(1))
    }

    /// Swap `id` with its successor.
    pub fn move_down(&self, id: &K) -> bool {
        self.relocate(id, |from, len| (from + 1 < len).then_some(from + 1))
    }

    // `target` maps (current index, length) to the destination index.
    fn relocate<F>(&self, id: &K, target: F) -> bool
    where
        F: FnOnce(usize, usize) -> Option<usize>,
    {
        let lens = self.lens;
        let moved = self.store.update_if(|state| {
            let state = lens.get_mut(state);
            let Some(from) = state.order.iter().position(|k| k == id) else {
                return false;
            };
            match target(from, state.order.len()) {
                Some(to) if to != from => {
                    relocate_within(cow::write(&mut state.order), from, to);
                    true
                }
                _ => false,
            }
        });
        if !moved {
            trace!(field = lens.name(), "reorder left the sequence unchanged");
        }
        moved
    }
}

impl<S, K> Clone for ReorderableListSlice<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            lens: self.lens,
            _binding: Arc::clone(&self._binding),
        }
    }
}

fn clamp(target: isize, len: usize) -> usize {
    let last = len.saturating_sub(1);
    if target <= 0 {
        0
    } else {
        (target as usize).min(last)
    }
}

fn relocate_within<K>(order: &mut Vec<K>, from: usize, to: usize) {
    let id = order.remove(from);
    order.insert(to, id);
}
