//! Slices holding a keyed collection.
//!
//! [`ListSlice`] replaces the whole collection at once. [`MutableListSlice`]
//! adds per-item `add`/`remove` and records which ids were added or deleted
//! since the last reconciliation with the source of truth.

use super::kind;
use crate::cow;
use crate::error::SliceResult;
use crate::lens::Lens;
use crate::store::{Binding, Store};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Items keyed by id, in insertion order.
pub type Collection<K, V> = IndexMap<K, Arc<V>>;

/// State of a list slice.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Eq + Hash, V: Serialize",
    deserialize = "K: Deserialize<'de> + Eq + Hash, V: Deserialize<'de>"
))]
pub struct ListState<K: Eq + Hash, V> {
    pub data: Option<Arc<Collection<K, V>>>,
}

impl<K: Eq + Hash, V> ListState<K, V> {
    pub fn new(initial: Option<IndexMap<K, V>>) -> Self {
        Self {
            data: initial.map(|items| Arc::new(share_items(items))),
        }
    }
}

impl<K: Eq + Hash, V> Clone for ListState<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<K: Eq + Hash, V> Default for ListState<K, V> {
    fn default() -> Self {
        Self { data: None }
    }
}

/// Pending changes of a mutable list slice.
///
/// An id is never in both `added` and `deleted`.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChanges<K> {
    pub added: Arc<Vec<K>>,
    pub deleted: Arc<Vec<K>>,
}

impl<K> ListChanges<K> {
    pub fn new() -> Self {
        Self {
            added: Arc::new(Vec::new()),
            deleted: Arc::new(Vec::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

impl<K> Clone for ListChanges<K> {
    fn clone(&self) -> Self {
        Self {
            added: self.added.clone(),
            deleted: self.deleted.clone(),
        }
    }
}

impl<K> Default for ListChanges<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn share_items<K: Eq + Hash, V>(items: IndexMap<K, V>) -> Collection<K, V> {
    items
        .into_iter()
        .map(|(id, item)| (id, Arc::new(item)))
        .collect()
}

/// Actions over a keyed collection.
pub struct ListSlice<S, K: Eq + Hash, V> {
    store: Store<S>,
    lens: Lens<S, ListState<K, V>>,
    _binding: Arc<Binding>,
}

impl<S, K, V> ListSlice<S, K, V>
where
    S: Clone + Send + Sync + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, ListState<K, V>>) -> SliceResult<Self> {
        let binding = store.bind(lens.name(), kind::LIST)?;
        Ok(Self {
            store: store.clone(),
            lens,
            _binding: binding,
        })
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn data(&self) -> Option<Arc<Collection<K, V>>> {
        self.store.read(|state| self.lens.get(state).data.clone())
    }

    pub fn get(&self, id: &K) -> Option<Arc<V>> {
        self.store.read(|state| {
            self.lens
                .get(state)
                .data
                .as_ref()
                .and_then(|items| items.get(id).cloned())
        })
    }

    pub fn contains(&self, id: &K) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.store
            .read(|state| self.lens.get(state).data.as_ref().map_or(0, |items| items.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole collection.
    pub fn set_data(&self, items: Option<IndexMap<K, V>>) {
        self.set_data_shared(items.map(|items| Arc::new(share_items(items))));
    }

    pub fn set_data_shared(&self, items: Option<Arc<Collection<K, V>>>) {
        let lens = self.lens;
        self.store.update(move |state| {
            lens.get_mut(state).data = items;
        });
    }
}

impl<S, K: Eq + Hash, V> Clone for ListSlice<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            lens: self.lens,
            _binding: Arc::clone(&self._binding),
        }
    }
}

/// A list slice with per-item edits and change tracking.
///
/// Built on top of an attached [`ListSlice`]; it has no state of its own
/// beyond the [`ListChanges`] it records.
pub struct MutableListSlice<S, K: Eq + Hash, V> {
    list: ListSlice<S, K, V>,
    changes: Lens<S, ListChanges<K>>,
    _binding: Arc<Binding>,
}

impl<S, K, V> MutableListSlice<S, K, V>
where
    S: Clone + Send + Sync + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn attach(
        list: &ListSlice<S, K, V>,
        changes: Lens<S, ListChanges<K>>,
    ) -> SliceResult<Self> {
        let binding = list.store.bind(changes.name(), kind::MUTABLE_LIST)?;
        Ok(Self {
            list: list.clone(),
            changes,
            _binding: binding,
        })
    }

    pub fn added(&self) -> Arc<Vec<K>> {
        self.list
            .store
            .read(|state| self.changes.get(state).added.clone())
    }

    pub fn deleted(&self) -> Arc<Vec<K>> {
        self.list
            .store
            .read(|state| self.changes.get(state).deleted.clone())
    }

    pub fn has_changes(&self) -> bool {
        self.list
            .store
            .read(|state| !self.changes.get(state).is_empty())
    }

    /// Insert or overwrite `id`, recording it as added.
    ///
    /// A pending deletion of the same id is cancelled.
    pub fn add(&self, id: K, item: V) {
        let item = Arc::new(item);
        let (lens, changes) = (self.list.lens, self.changes);
        self.list.store.update(move |state| {
            let items = lens.get_mut(state).data.get_or_insert_with(Default::default);
            cow::write(items).insert(id.clone(), item);

            let changes = changes.get_mut(state);
            if !changes.added.contains(&id) {
                cow::write(&mut changes.added).push(id.clone());
            }
            if changes.deleted.contains(&id) {
                cow::write(&mut changes.deleted).retain(|deleted| *deleted != id);
            }
        });
    }

    /// Delete `id`, recording it as deleted.
    ///
    /// A pending addition of the same id is cancelled. The deletion is
    /// recorded even if the id is not in the collection.
    pub fn remove(&self, id: &K) {
        let id = id.clone();
        let (lens, changes) = (self.list.lens, self.changes);
        self.list.store.update(move |state| {
            match lens.get_mut(state).data.as_mut() {
                Some(items) if items.contains_key(&id) => {
                    cow::write(items).shift_remove(&id);
                }
                _ => trace!(field = lens.name(), "removing an id that is not in the list"),
            }

            let changes = changes.get_mut(state);
            if !changes.deleted.contains(&id) {
                cow::write(&mut changes.deleted).push(id.clone());
            }
            if changes.added.contains(&id) {
                cow::write(&mut changes.added).retain(|added| *added != id);
            }
        });
    }

    /// Forget all recorded changes, e.g. once they have been synced.
    pub fn clear_changes(&self) {
        let changes = self.changes;
        self.list.store.update_if(move |state| {
            let changes = changes.get_mut(state);
            if changes.is_empty() {
                return false;
            }
            *changes = ListChanges::new();
            true
        });
    }
}

impl<S, K: Eq + Hash, V> Deref for MutableListSlice<S, K, V> {
    type Target = ListSlice<S, K, V>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl<S, K: Eq + Hash, V> Clone for MutableListSlice<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            changes: self.changes,
            _binding: Arc::clone(&self._binding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens;
    use crate::store::equality::identical;
    use crate::SliceError;

    #[derive(Clone, Debug, PartialEq)]
    struct Todo {
        id: &'static str,
        done: bool,
    }

    fn todo(id: &'static str) -> Todo {
        Todo { id, done: false }
    }

    #[derive(Clone, Default)]
    struct App {
        todos: ListState<&'static str, Todo>,
        changes: ListChanges<&'static str>,
    }

    fn slices() -> (Store<App>, MutableListSlice<App, &'static str, Todo>) {
        let store = Store::new(App::default());
        let list = ListSlice::attach(&store, lens!(App, todos)).unwrap();
        let mutable = MutableListSlice::attach(&list, lens!(App, changes)).unwrap();
        (store, mutable)
    }

    #[test]
    fn set_data_replaces_collection() {
        let (_, todos) = slices();
        assert!(todos.data().is_none());
        assert!(todos.is_empty());

        let mut items = IndexMap::new();
        items.insert("a", todo("a"));
        items.insert("b", todo("b"));
        todos.set_data(Some(items));

        assert_eq!(todos.len(), 2);
        assert_eq!(todos.get(&"b").unwrap().id, "b");

        todos.set_data(None);
        assert!(todos.data().is_none());
    }

    #[test]
    fn add_then_remove_tracks_changes() {
        let (_, todos) = slices();

        todos.add("a", todo("a"));
        assert!(todos.contains(&"a"));
        assert_eq!(*todos.added(), vec!["a"]);
        assert!(todos.deleted().is_empty());

        todos.add("b", todo("b"));
        assert_eq!(*todos.added(), vec!["a", "b"]);

        todos.remove(&"a");
        assert!(!todos.contains(&"a"));
        assert!(todos.contains(&"b"));
        assert_eq!(*todos.added(), vec!["b"]);
        assert_eq!(*todos.deleted(), vec!["a"]);
    }

    #[test]
    fn add_overwrites_without_duplicating_tracking() {
        let (_, todos) = slices();
        todos.add("a", todo("a"));
        todos.add("a", Todo { id: "a", done: true });

        assert!(todos.get(&"a").unwrap().done);
        assert_eq!(*todos.added(), vec!["a"]);
    }

    #[test]
    fn add_cancels_pending_deletion() {
        let (_, todos) = slices();
        todos.remove(&"x");
        assert_eq!(*todos.deleted(), vec!["x"]);
        assert!(todos.data().is_none());

        todos.add("x", todo("x"));
        assert_eq!(*todos.added(), vec!["x"]);
        assert!(todos.deleted().is_empty());
        assert!(todos.contains(&"x"));
    }

    #[test]
    fn remove_keeps_other_items_shared() {
        let (store, todos) = slices();
        todos.add("a", todo("a"));
        todos.add("b", todo("b"));

        let before = todos.get(&"b").unwrap();
        todos.remove(&"a");
        assert!(Arc::ptr_eq(&before, &todos.get(&"b").unwrap()));

        // Nothing in `added` to cancel and `deleted` already holds it.
        let snapshot = store.get();
        todos.remove(&"a");
        assert!(identical(&snapshot.changes.deleted, &store.get().changes.deleted));
    }

    #[test]
    fn clear_changes_empties_tracking() {
        let (store, todos) = slices();
        todos.add("a", todo("a"));
        todos.remove(&"b");
        assert!(todos.has_changes());

        todos.clear_changes();
        assert!(!todos.has_changes());
        assert!(todos.contains(&"a"));

        let snapshot = store.get();
        todos.clear_changes();
        assert!(Arc::ptr_eq(&snapshot, &store.get()));
    }

    #[test]
    fn changes_field_cannot_be_bound_twice() {
        let store = Store::new(App::default());
        let list = ListSlice::attach(&store, lens!(App, todos)).unwrap();
        let _first = MutableListSlice::attach(&list, lens!(App, changes)).unwrap();

        let err = MutableListSlice::attach(&list, lens!(App, changes)).err().unwrap();
        assert!(matches!(err, SliceError::FieldCollision { field: "changes", .. }));
    }
}
