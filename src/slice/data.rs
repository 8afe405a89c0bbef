//! Slices holding a single nullable value.
//!
//! The family layers by delegation: a [`MutableDataSlice`],
//! [`RestorableDataSlice`] or [`RefreshableDataSlice`] wraps the handle below
//! it and dereferences to it, so every variant still has `data` and
//! `set_data`.

use super::kind;
use crate::cow;
use crate::error::SliceResult;
use crate::lens::Lens;
use crate::store::equality::identical;
use crate::store::{Binding, Store};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// State types carrying a `data` field.
pub trait HoldsData {
    type Item;

    fn data(&self) -> &Option<Arc<Self::Item>>;
    fn data_mut(&mut self) -> &mut Option<Arc<Self::Item>>;
}

/// State types carrying a baseline to reset to.
pub trait HoldsBaseline: HoldsData {
    fn initial_data(&self) -> &Option<Arc<Self::Item>>;
    fn initial_data_mut(&mut self) -> &mut Option<Arc<Self::Item>>;
}

/// State types carrying the last copy received from the source of truth.
pub trait HoldsFreshData: HoldsBaseline {
    fn fresh_data(&self) -> &Option<Arc<Self::Item>>;
    fn fresh_data_mut(&mut self) -> &mut Option<Arc<Self::Item>>;
}

/// State of a plain or mutable data slice.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DataState<T> {
    pub data: Option<Arc<T>>,
}

impl<T> DataState<T> {
    pub fn new(initial: Option<T>) -> Self {
        Self {
            data: initial.map(Arc::new),
        }
    }
}

/// State of a restorable data slice.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RestorableState<T> {
    pub data: Option<Arc<T>>,
    pub initial_data: Option<Arc<T>>,
}

impl<T> RestorableState<T> {
    /// `data` and `initial_data` start out as the same value.
    pub fn new(initial: Option<T>) -> Self {
        let initial = initial.map(Arc::new);
        Self {
            data: initial.clone(),
            initial_data: initial,
        }
    }
}

/// State of a refreshable data slice.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshableState<T> {
    pub data: Option<Arc<T>>,
    pub initial_data: Option<Arc<T>>,
    pub fresh_data: Option<Arc<T>>,
}

impl<T> RefreshableState<T> {
    pub fn new(initial: Option<T>) -> Self {
        let initial = initial.map(Arc::new);
        Self {
            data: initial.clone(),
            initial_data: initial.clone(),
            fresh_data: initial,
        }
    }
}

macro_rules! impl_state_traits {
    ($state:ident { $($field:ident),* }) => {
        impl<T> Clone for $state<T> {
            fn clone(&self) -> Self {
                Self {
                    $($field: self.$field.clone()),*
                }
            }
        }

        impl<T> Default for $state<T> {
            fn default() -> Self {
                Self {
                    $($field: None),*
                }
            }
        }

        impl<T> HoldsData for $state<T> {
            type Item = T;

            fn data(&self) -> &Option<Arc<T>> {
                &self.data
            }

            fn data_mut(&mut self) -> &mut Option<Arc<T>> {
                &mut self.data
            }
        }
    };
}

impl_state_traits!(DataState { data });
impl_state_traits!(RestorableState { data, initial_data });
impl_state_traits!(RefreshableState { data, initial_data, fresh_data });

impl<T> HoldsBaseline for RestorableState<T> {
    fn initial_data(&self) -> &Option<Arc<T>> {
        &self.initial_data
    }

    fn initial_data_mut(&mut self) -> &mut Option<Arc<T>> {
        &mut self.initial_data
    }
}

impl<T> HoldsBaseline for RefreshableState<T> {
    fn initial_data(&self) -> &Option<Arc<T>> {
        &self.initial_data
    }

    fn initial_data_mut(&mut self) -> &mut Option<Arc<T>> {
        &mut self.initial_data
    }
}

impl<T> HoldsFreshData for RefreshableState<T> {
    fn fresh_data(&self) -> &Option<Arc<T>> {
        &self.fresh_data
    }

    fn fresh_data_mut(&mut self) -> &mut Option<Arc<T>> {
        &mut self.fresh_data
    }
}

/// Actions over a single nullable value.
pub struct DataSlice<S, D> {
    store: Store<S>,
    lens: Lens<S, D>,
    _binding: Arc<Binding>,
}

impl<S, D> DataSlice<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: HoldsData,
    D::Item: Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, D>) -> SliceResult<Self> {
        Self::bound(store, lens, kind::DATA)
    }

    fn bound(store: &Store<S>, lens: Lens<S, D>, kind: &'static str) -> SliceResult<Self> {
        let binding = store.bind(lens.name(), kind)?;
        Ok(Self {
            store: store.clone(),
            lens,
            _binding: binding,
        })
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn data(&self) -> Option<Arc<D::Item>> {
        self.store.read(|state| self.lens.get(state).data().clone())
    }

    /// Replace the held value outright.
    pub fn set_data(&self, value: Option<D::Item>) {
        self.set_data_shared(value.map(Arc::new));
    }

    /// Replace the held value with an already shared one, keeping its identity.
    pub fn set_data_shared(&self, value: Option<Arc<D::Item>>) {
        let lens = self.lens;
        self.store.update(move |state| {
            *lens.get_mut(state).data_mut() = value;
        });
    }
}

impl<S, D> Clone for DataSlice<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            lens: self.lens,
            _binding: Arc::clone(&self._binding),
        }
    }
}

/// A data slice whose value can be edited in place.
pub struct MutableDataSlice<S, D> {
    base: DataSlice<S, D>,
}

impl<S, D> MutableDataSlice<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: HoldsData,
    D::Item: Clone + Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, D>) -> SliceResult<Self> {
        Ok(Self {
            base: DataSlice::bound(store, lens, kind::MUTABLE_DATA)?,
        })
    }

    /// Edit the held value through a copy-on-write draft.
    ///
    /// Does nothing when there is no value. Returns whether an update was
    /// committed.
    pub fn update_data<F>(&self, mutator: F) -> bool
    where
        F: FnOnce(&mut D::Item),
    {
        edit_data(&self.base, mutator)
    }
}

fn edit_data<S, D, F>(slice: &DataSlice<S, D>, mutator: F) -> bool
where
    S: Clone + Send + Sync + 'static,
    D: HoldsData,
    D::Item: Clone,
    F: FnOnce(&mut D::Item),
{
    let lens = slice.lens;
    let applied = slice.store.update_if(move |state| {
        match lens.get_mut(state).data_mut() {
            Some(data) => {
                mutator(cow::write(data));
                true
            }
            None => false,
        }
    });
    if !applied {
        trace!(field = lens.name(), "update_data on absent value ignored");
    }
    applied
}

impl<S, D> Deref for MutableDataSlice<S, D> {
    type Target = DataSlice<S, D>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<S, D> Clone for MutableDataSlice<S, D> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

/// A data slice that remembers a baseline it can be reset to.
pub struct RestorableDataSlice<S, D> {
    base: DataSlice<S, D>,
}

impl<S, D> RestorableDataSlice<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: HoldsBaseline,
    D::Item: Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, D>) -> SliceResult<Self> {
        Self::bound(store, lens, kind::RESTORABLE_DATA)
    }

    fn bound(store: &Store<S>, lens: Lens<S, D>, kind: &'static str) -> SliceResult<Self> {
        Ok(Self {
            base: DataSlice::bound(store, lens, kind)?,
        })
    }

    pub fn initial_data(&self) -> Option<Arc<D::Item>> {
        self.base
            .store
            .read(|state| self.base.lens.get(state).initial_data().clone())
    }

    /// Edit the current value in place, leaving the baseline untouched.
    ///
    /// Same rules as [`MutableDataSlice::update_data`].
    pub fn update_data<F>(&self, mutator: F) -> bool
    where
        D::Item: Clone,
        F: FnOnce(&mut D::Item),
    {
        edit_data(&self.base, mutator)
    }

    /// Restore the current value to the baseline.
    pub fn reset(&self) {
        let lens = self.base.lens;
        self.base.store.update(move |state| {
            let state = lens.get_mut(state);
            let baseline = state.initial_data().clone();
            *state.data_mut() = baseline;
        });
    }

    /// Make `value` both the baseline and the current value.
    pub fn reset_to(&self, value: Option<D::Item>) {
        let value = value.map(Arc::new);
        let lens = self.base.lens;
        self.base.store.update(move |state| {
            rebase(lens.get_mut(state), value);
        });
    }

    /// Whether the current value has diverged from the baseline.
    pub fn is_modified(&self) -> bool {
        self.base.store.read(|state| {
            let state = self.base.lens.get(state);
            !identical(state.data(), state.initial_data())
        })
    }
}

fn rebase<D: HoldsBaseline>(state: &mut D, value: Option<Arc<D::Item>>) {
    *state.initial_data_mut() = value.clone();
    *state.data_mut() = value;
}

impl<S, D> Deref for RestorableDataSlice<S, D> {
    type Target = DataSlice<S, D>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<S, D> Clone for RestorableDataSlice<S, D> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

/// A restorable data slice that also tracks the latest server copy.
///
/// After local edits `data` no longer matches `fresh_data`; that divergence
/// is the pending-changes signal a sync controller looks for.
pub struct RefreshableDataSlice<S, D> {
    base: RestorableDataSlice<S, D>,
}

impl<S, D> RefreshableDataSlice<S, D>
where
    S: Clone + Send + Sync + 'static,
    D: HoldsFreshData,
    D::Item: Send + Sync + 'static,
{
    pub fn attach(store: &Store<S>, lens: Lens<S, D>) -> SliceResult<Self> {
        Ok(Self {
            base: RestorableDataSlice::bound(store, lens, kind::REFRESHABLE_DATA)?,
        })
    }

    pub fn fresh_data(&self) -> Option<Arc<D::Item>> {
        self.store()
            .read(|state| self.base.base.lens.get(state).fresh_data().clone())
    }

    /// Accept `value` as the new source of truth.
    ///
    /// `fresh_data`, the baseline and the current value all become `value`
    /// in a single update.
    pub fn refresh(&self, value: Option<D::Item>) {
        let value = value.map(Arc::new);
        let lens = self.base.base.lens;
        self.store().update(move |state| {
            let state = lens.get_mut(state);
            *state.fresh_data_mut() = value.clone();
            rebase(state, value);
        });
    }

    /// Whether local edits have not been synced back yet.
    pub fn has_pending_changes(&self) -> bool {
        self.store().read(|state| {
            let state = self.base.base.lens.get(state);
            !identical(state.data(), state.fresh_data())
        })
    }
}

impl<S, D> Deref for RefreshableDataSlice<S, D> {
    type Target = RestorableDataSlice<S, D>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl<S, D> Clone for RefreshableDataSlice<S, D> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens;
    use crate::SliceError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct Profile {
        name: String,
        tags: Vec<String>,
    }

    fn profile(name: &str) -> Profile {
        Profile {
            name: name.to_string(),
            tags: Vec::new(),
        }
    }

    #[derive(Clone, Default)]
    struct App {
        current: DataState<Profile>,
        draft: RestorableState<Profile>,
        remote: RefreshableState<Profile>,
        counter: DataState<u32>,
    }

    fn app() -> Store<App> {
        Store::new(App::default())
    }

    #[test]
    fn set_data_round_trips_identity() {
        let store = app();
        let slice = DataSlice::attach(&store, lens!(App, current)).unwrap();
        assert!(slice.data().is_none());

        let value = Arc::new(profile("ada"));
        slice.set_data_shared(Some(value.clone()));
        assert!(Arc::ptr_eq(&slice.data().unwrap(), &value));

        slice.set_data(None);
        assert!(slice.data().is_none());
    }

    #[test]
    fn update_data_on_absent_value_is_a_no_op() {
        let store = app();
        let slice = MutableDataSlice::attach(&store, lens!(App, current)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _sub = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        let before = store.get();

        assert!(!slice.update_data(|p| p.name.push('!')));
        assert!(Arc::ptr_eq(&before, &store.get()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_data_copies_on_write() {
        let store = app();
        let slice = MutableDataSlice::attach(&store, lens!(App, current)).unwrap();
        let counter = DataSlice::attach(&store, lens!(App, counter)).unwrap();
        slice.set_data(Some(profile("ada")));
        counter.set_data(Some(1));

        let before = store.get();
        assert!(slice.update_data(|p| p.tags.push("admin".to_string())));
        let after = store.get();

        assert!(before.current.data.as_ref().unwrap().tags.is_empty());
        assert_eq!(after.current.data.as_ref().unwrap().tags, vec!["admin"]);
        assert!(identical(&before.counter.data, &after.counter.data));
        assert!(identical(&before.draft.data, &after.draft.data));
    }

    #[test]
    fn reset_restores_baseline() {
        let store = Store::new(App {
            draft: RestorableState::new(Some(profile("ada"))),
            ..App::default()
        });
        let slice = RestorableDataSlice::attach(&store, lens!(App, draft)).unwrap();
        assert!(!slice.is_modified());

        slice.set_data(Some(profile("grace")));
        assert!(slice.is_modified());

        slice.reset();
        let data = slice.data().unwrap();
        assert_eq!(data.name, "ada");
        assert!(Arc::ptr_eq(&data, &slice.initial_data().unwrap()));
        assert!(!slice.is_modified());
    }

    #[test]
    fn reset_to_sets_new_baseline() {
        let store = app();
        let slice = RestorableDataSlice::attach(&store, lens!(App, draft)).unwrap();

        slice.reset_to(Some(profile("linus")));
        assert_eq!(slice.data().unwrap().name, "linus");
        assert!(identical(&slice.data(), &slice.initial_data()));

        slice.reset_to(None);
        assert!(slice.data().is_none());
        assert!(slice.initial_data().is_none());
    }

    #[test]
    fn refresh_converges_in_one_notification() {
        let store = app();
        let slice = RefreshableDataSlice::attach(&store, lens!(App, remote)).unwrap();
        let snapshots = Arc::new(std::sync::Mutex::new(Vec::new()));
        let snapshots_clone = snapshots.clone();
        let _sub = store.subscribe(move |state| {
            snapshots_clone.lock().unwrap().push(state.clone());
        });

        slice.refresh(Some(profile("server")));

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 1);
        let remote = &snapshots[0].remote;
        assert!(identical(&remote.fresh_data, &remote.initial_data));
        assert!(identical(&remote.fresh_data, &remote.data));
        assert_eq!(remote.data.as_ref().unwrap().name, "server");
    }

    #[test]
    fn local_edits_are_pending_until_refresh() {
        let store = app();
        let slice = RefreshableDataSlice::attach(&store, lens!(App, remote)).unwrap();
        slice.refresh(Some(profile("server")));
        assert!(!slice.has_pending_changes());

        slice.set_data(Some(profile("local")));
        assert!(slice.has_pending_changes());
        assert_eq!(slice.fresh_data().unwrap().name, "server");

        slice.reset();
        assert!(!slice.has_pending_changes());

        slice.set_data(Some(profile("local again")));
        slice.refresh(Some(profile("server v2")));
        assert!(!slice.has_pending_changes());
        assert_eq!(slice.data().unwrap().name, "server v2");
    }

    #[test]
    fn attaching_twice_to_one_field_fails() {
        let store = app();
        let _first = DataSlice::attach(&store, lens!(App, current)).unwrap();
        let err = MutableDataSlice::attach(&store, lens!(App, current)).err().unwrap();

        assert_eq!(
            err,
            SliceError::FieldCollision {
                field: "current",
                existing: kind::DATA,
                requested: kind::MUTABLE_DATA,
            }
        );
    }

    #[test]
    fn restorable_update_data_keeps_baseline() {
        let store = Store::new(App {
            draft: RestorableState::new(Some(profile("ada"))),
            ..App::default()
        });
        let slice = RestorableDataSlice::attach(&store, lens!(App, draft)).unwrap();
        let baseline = slice.initial_data().unwrap();

        assert!(slice.update_data(|p| p.tags.push("editor".to_string())));
        assert_eq!(slice.data().unwrap().tags, vec!["editor"]);
        assert!(baseline.tags.is_empty());
        assert!(Arc::ptr_eq(&baseline, &slice.initial_data().unwrap()));
        assert!(slice.is_modified());
    }

    #[test]
    fn refreshable_edits_in_place_become_pending() {
        let store = app();
        let slice = RefreshableDataSlice::attach(&store, lens!(App, remote)).unwrap();
        assert!(!slice.update_data(|p| p.name.push('!')));

        slice.refresh(Some(profile("server")));
        let fresh = slice.fresh_data().unwrap();

        assert!(slice.update_data(|p| p.name.push_str(" (edited)")));
        assert!(slice.has_pending_changes());
        assert_eq!(slice.data().unwrap().name, "server (edited)");
        assert_eq!(fresh.name, "server");

        slice.reset();
        assert!(!slice.has_pending_changes());
        assert!(Arc::ptr_eq(&slice.data().unwrap(), &fresh));
        assert!(Arc::ptr_eq(&slice.data().unwrap(), &slice.initial_data().unwrap()));
    }

    #[test]
    fn dropped_handles_release_their_field() {
        let store = app();
        let draft = RestorableDataSlice::attach(&store, lens!(App, draft)).unwrap();
        let copy = draft.clone();
        drop(draft);
        assert!(DataSlice::attach(&store, lens!(App, draft)).is_err());

        drop(copy);
        let again = MutableDataSlice::attach(&store, lens!(App, draft)).unwrap();
        again.set_data(Some(profile("grace")));
        assert_eq!(store.get().draft.data.as_ref().unwrap().name, "grace");
    }

    #[test]
    fn single_slice_store_uses_root_lens() {
        let store = Store::new(DataState::new(Some(3u8)));
        let slice = MutableDataSlice::attach(&store, Lens::root()).unwrap();

        slice.update_data(|n| *n += 1);
        assert_eq!(*slice.data().unwrap(), 4);
    }
}
