use super::equality::{self, Identity};
use crate::cow;
use crate::error::{SliceError, SliceResult};
use crate::lens;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use tracing::{debug, trace};

type Listener<S> = Arc<dyn Fn(&Arc<S>) + Send + Sync>;

// Bound field path -> slice kind.
type Bindings = HashMap<&'static str, &'static str>;

struct Listeners<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

impl<S> Listeners<S> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

/// Store options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name used in logs and as the key for external persistence.
    pub name: Option<String>,
}

impl StoreConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// A thread-safe store holding immutable snapshots of `S`.
///
/// `S` is usually a struct embedding several slice states. Readers get
/// `Arc<S>` snapshots and can never mutate them; the only way to change the
/// state is [`Store::update`] (or one of its variants), which swaps in a new
/// snapshot and notifies subscribers.
///
/// Cloning a store is cheap and yields another handle to the same state.
pub struct Store<S> {
    state: Arc<RwLock<Arc<S>>>,
    listeners: Arc<RwLock<Listeners<S>>>,
    bindings: Arc<Mutex<Bindings>>,
    config: Arc<StoreConfig>,
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    /// Create a new store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    pub fn with_config(initial: S, config: StoreConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(Arc::new(initial))),
            listeners: Arc::new(RwLock::new(Listeners::new())),
            bindings: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.config.name.as_deref()
    }

    /// Get the current snapshot.
    pub fn get(&self) -> Arc<S> {
        Arc::clone(&read(&self.state))
    }

    /// Read the current snapshot without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = read(&self.state);
        f(&state)
    }

    /// Replace the whole state, e.g. when hydrating from persisted data.
    pub fn set(&self, new_state: S) {
        let next = Arc::new(new_state);
        *write(&self.state) = Arc::clone(&next);
        self.notify(&next);
    }

    /// Update the state through a copy-on-write draft.
    ///
    /// The recipe runs while the store is locked for writing, so it must not
    /// call back into this store. If it panics, the draft is discarded, no
    /// subscriber is notified and the panic resumes in the caller.
    pub fn update<F>(&self, recipe: F)
    where
        F: FnOnce(&mut S),
    {
        let next = {
            let mut current = write(&self.state);
            let produced =
                panic::catch_unwind(AssertUnwindSafe(|| cow::produce(&*current, recipe)));
            match produced {
                Ok(next) => {
                    *current = Arc::clone(&next);
                    next
                }
                Err(payload) => {
                    drop(current);
                    panic::resume_unwind(payload)
                }
            }
        };
        self.notify(&next);
    }

    /// Update the state, committing only if the recipe returns `Ok`.
    pub fn try_update<E, F>(&self, recipe: F) -> Result<(), E>
    where
        F: FnOnce(&mut S) -> Result<(), E>,
    {
        let next = {
            let mut current = write(&self.state);
            let produced =
                panic::catch_unwind(AssertUnwindSafe(|| cow::try_produce(&*current, recipe)));
            match produced {
                Ok(Ok(next)) => {
                    *current = Arc::clone(&next);
                    next
                }
                Ok(Err(err)) => return Err(err),
                Err(payload) => {
                    drop(current);
                    panic::resume_unwind(payload)
                }
            }
        };
        self.notify(&next);
        Ok(())
    }

    /// Update the state, committing only if the recipe reports a change.
    ///
    /// Returns whether a new snapshot was published.
    pub fn update_if<F>(&self, recipe: F) -> bool
    where
        F: FnOnce(&mut S) -> bool,
    {
        self.try_update(|draft| if recipe(draft) { Ok(()) } else { Err(()) })
            .is_ok()
    }

    /// Subscribe to every committed update.
    ///
    /// The listener stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<S>) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = write(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(listener)));
            id
        };

        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || remove_listener(&listeners, id))
    }

    /// Subscribe to a selected part of the state.
    ///
    /// `listener` receives `(next, previous)` and only fires when `equality`
    /// says the selected value changed.
    pub fn subscribe_with_selector<U, Sel, Cmp, F>(
        &self,
        selector: Sel,
        equality: Cmp,
        listener: F,
    ) -> Subscription
    where
        U: Clone + Send + 'static,
        Sel: Fn(&S) -> U + Send + Sync + 'static,
        Cmp: Fn(&U, &U) -> bool + Send + Sync + 'static,
        F: Fn(&U, &U) + Send + Sync + 'static,
    {
        let previous = Mutex::new(self.read(&selector));
        self.subscribe(move |state| {
            let next = selector(state.as_ref());
            let prev = {
                let mut slot = lock(&previous);
                if equality(&*slot, &next) {
                    return;
                }
                std::mem::replace(&mut *slot, next.clone())
            };
            listener(&next, &prev);
        })
    }

    /// Subscribe to a selected part of the state, compared by identity.
    pub fn subscribe_to<U, Sel, F>(&self, selector: Sel, listener: F) -> Subscription
    where
        U: Identity + Clone + Send + 'static,
        Sel: Fn(&S) -> U + Send + Sync + 'static,
        F: Fn(&U, &U) + Send + Sync + 'static,
    {
        self.subscribe_with_selector(selector, equality::identical, listener)
    }

    pub fn subscriber_count(&self) -> usize {
        read(&self.listeners).entries.len()
    }

    /// Record that `field` is driven by a slice of `kind`.
    ///
    /// The field stays bound until the returned token, and every clone of it,
    /// is dropped. Fails if `field` or any path nested in or enclosing it is
    /// already bound.
    pub(crate) fn bind(
        &self,
        field: &'static str,
        kind: &'static str,
    ) -> SliceResult<Arc<Binding>> {
        let mut bindings = lock(&self.bindings);
        let overlapping = bindings.iter().find(|(bound, _)| overlaps(bound, field));
        if let Some((&bound, &existing)) = overlapping {
            return Err(SliceError::FieldCollision {
                field: bound,
                existing,
                requested: kind,
            });
        }
        bindings.insert(field, kind);
        debug!(store = self.label(), field, kind, "slice attached");
        Ok(Arc::new(Binding {
            field,
            bindings: Arc::downgrade(&self.bindings),
        }))
    }

    fn notify(&self, snapshot: &Arc<S>) {
        let listeners: Vec<Listener<S>> = read(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(store = self.label(), subscribers = listeners.len(), "state updated");
        for listener in listeners {
            listener(snapshot);
        }
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("<anonymous>")
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            listeners: Arc::clone(&self.listeners),
            bindings: Arc::clone(&self.bindings),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.config.name)
            .field("subscribers", &read(&self.listeners).entries.len())
            .field("bound_fields", &lock(&self.bindings).len())
            .finish_non_exhaustive()
    }
}

/// RAII guard for a store listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn forget(mut self) {
        self.detach.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

/// Keeps a field bound to one slice while any handle of that slice lives.
pub(crate) struct Binding {
    field: &'static str,
    bindings: Weak<Mutex<Bindings>>,
}

impl Drop for Binding {
    fn drop(&mut self) {
        if let Some(bindings) = self.bindings.upgrade() {
            lock(&bindings).remove(self.field);
            trace!(field = self.field, "slice detached");
        }
    }
}

// Two paths overlap when they are equal or one is a dotted prefix of the other.
// The root lens overlaps everything.
fn overlaps(a: &str, b: &str) -> bool {
    a == lens::ROOT || b == lens::ROOT || a == b || nested_in(a, b) || nested_in(b, a)
}

fn nested_in(path: &str, parent: &str) -> bool {
    path.strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn remove_listener<S>(listeners: &Weak<RwLock<Listeners<S>>>, id: u64) {
    if let Some(listeners) = listeners.upgrade() {
        write(&listeners).entries.retain(|(entry, _)| *entry != id);
    }
}

// Snapshots are swapped in a single assignment, so a poisoned lock still
// guards a consistent value.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
