use super::devtools::{Devtools, DevtoolsConfig, Transition, ANONYMOUS_ACTION, INIT_ACTION};
use super::subscription::{Registry, SubscribeOptions, Subscription};
use crate::persist::{PersistApi, PersistConfig, Persistable, Persistence};
use crate::sync::{lock, read, write};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Application state held by a [`Store`].
///
/// `Patch` describes a partial update: [`merge`](State::merge) must only
/// touch the fields the patch carries.
pub trait State: Clone + fmt::Debug + Send + Sync + 'static {
    type Patch: Send + 'static;

    fn merge(&mut self, patch: Self::Patch);
}

type PatchFn<S> = Box<dyn FnOnce(&S) -> <S as State>::Patch + Send>;

/// A state update passed to [`Store::set_state`].
pub enum Update<S: State> {
    /// Merge a patch, keeping every field it does not name.
    Merge(S::Patch),
    /// Compute a patch from the current state, then merge it.
    MergeWith(PatchFn<S>),
    /// Replace the whole state, discarding untouched fields.
    Replace(S),
}

impl<S: State> Update<S> {
    pub fn merge(patch: S::Patch) -> Self {
        Update::Merge(patch)
    }

    /// The closure runs while the state is locked and must not call back
    /// into the store.
    pub fn merge_with<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S::Patch + Send + 'static,
    {
        Update::MergeWith(Box::new(f))
    }

    pub fn replace(state: S) -> Self {
        Update::Replace(state)
    }

    fn apply(self, state: &mut S) {
        match self {
            Update::Merge(patch) => state.merge(patch),
            Update::MergeWith(f) => {
                let patch = f(state);
                state.merge(patch);
            }
            Update::Replace(next) => *state = next,
        }
    }
}

type StateListener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

struct Inner<S: State> {
    state: RwLock<S>,
    listeners: Arc<Registry<StateListener<S>>>,
    devtools: Option<Devtools>,
    persistence: Option<Persistence<S>>,
}

/// A thread-safe state container with devtools, selector subscriptions and
/// optional persistence.
///
/// Every [`set_state`](Store::set_state) runs the layers in a fixed order:
/// the raw state is updated, devtools records the transition, subscribers
/// are notified, and finally the persistence layer writes its snapshot.
///
/// Cloning a store clones the handle; all clones share the same state.
pub struct Store<S: State> {
    inner: Arc<Inner<S>>,
}

impl<S: State> Store<S> {
    /// Create a bare store with the given initial state.
    ///
    /// Devtools follows its default configuration; there is no persistence.
    pub fn new(initial: S) -> Self {
        Self::builder(move |_| initial).build()
    }

    /// Start building a store from an initializer.
    ///
    /// The initializer receives a [`StoreApi`] that mutators can keep to read
    /// and write the store once it exists.
    pub fn builder<F>(initializer: F) -> StoreBuilder<S>
    where
        F: FnOnce(&StoreApi<S>) -> S + 'static,
    {
        StoreBuilder {
            initializer: Box::new(initializer),
            devtools: DevtoolsConfig::default(),
            persistence: None,
        }
    }

    /// Get a clone of the current state.
    pub fn get_state(&self) -> S {
        read(&self.inner.state).clone()
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = read(&self.inner.state);
        f(&*state)
    }

    /// Apply an update recorded as an anonymous action.
    pub fn set_state(&self, update: Update<S>) {
        self.set_state_as(update, ANONYMOUS_ACTION);
    }

    /// Apply an update under the given action label.
    pub fn set_state_as(&self, update: Update<S>, action: &str) {
        let (next, previous) = {
            let mut state = write(&self.inner.state);
            let previous = state.clone();
            update.apply(&mut state);
            (state.clone(), previous)
        };
        self.commit(action, &next, &previous);
    }

    /// Update the state in place.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut S),
    {
        let (next, previous) = {
            let mut state = write(&self.inner.state);
            let previous = state.clone();
            f(&mut state);
            (state.clone(), previous)
        };
        self.commit(ANONYMOUS_ACTION, &next, &previous);
    }

    fn commit(&self, action: &str, next: &S, previous: &S) {
        if let Some(devtools) = &self.inner.devtools {
            devtools.record(action, next);
        }
        for listener in self.inner.listeners.snapshot() {
            listener(next, previous);
        }
        // Listeners may have written back; persist what the store holds now.
        if let Some(persistence) = &self.inner.persistence {
            self.read(|state| persistence.write(state));
        }
    }

    /// Apply a fallible in-place update under the given action label.
    ///
    /// The closure works on a copy under the write lock; the state and the
    /// layers are only touched when it succeeds.
    pub(crate) fn try_update_as<E>(
        &self,
        action: &str,
        f: impl FnOnce(&mut S) -> Result<(), E>,
    ) -> Result<(), E> {
        let (next, previous) = {
            let mut state = write(&self.inner.state);
            let mut next = state.clone();
            f(&mut next)?;
            let previous = std::mem::replace(&mut *state, next.clone());
            (next, previous)
        };
        self.commit(action, &next, &previous);
        Ok(())
    }

    /// Subscribe to every state change.
    ///
    /// The listener receives `(state, previous_state)`.
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S, &S) + Send + Sync + 'static,
    {
        self.inner.listeners.register(Arc::new(listener))
    }

    /// Subscribe to a slice of the state.
    ///
    /// The listener receives `(slice, previous_slice)` and only runs when the
    /// selected slice changes.
    pub fn subscribe<T, Sel, F>(&self, selector: Sel, listener: F) -> Subscription
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        self.subscribe_with(selector, listener, SubscribeOptions::default())
    }

    /// Subscribe to a slice of the state with explicit options.
    pub fn subscribe_with<T, Sel, F>(
        &self,
        selector: Sel,
        listener: F,
        options: SubscribeOptions<T>,
    ) -> Subscription
    where
        T: Clone + Send + Sync + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let current = Arc::new(Mutex::new(self.read(|state| selector(state))));
        let listener = Arc::new(listener);
        let equality = options.equality;

        let subscription = self.subscribe_all({
            let current = Arc::clone(&current);
            let listener = Arc::clone(&listener);
            move |state, _| {
                let next = selector(state);
                let previous = {
                    let mut current = lock(&current);
                    if equality(&*current, &next) {
                        return;
                    }
                    std::mem::replace(&mut *current, next.clone())
                };
                listener(&next, &previous);
            }
        });

        if options.fire_immediately {
            let slice = lock(&current).clone();
            listener(&slice, &slice);
        }

        subscription
    }

    /// Number of registered state listeners, selector subscriptions and
    /// bindings included.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Transitions recorded by devtools; empty when devtools is disabled.
    pub fn transitions(&self) -> Vec<Transition> {
        self.inner
            .devtools
            .as_ref()
            .map(Devtools::transitions)
            .unwrap_or_default()
    }

    /// The persistence layer, if the store was built with one.
    pub fn persist(&self) -> Option<PersistApi<'_, S>> {
        self.inner
            .persistence
            .as_ref()
            .map(|persistence| PersistApi::new(self, persistence))
    }

    /// Drop every listener and the devtools timeline.
    ///
    /// State and persisted storage are left untouched.
    pub fn destroy(&self) {
        self.inner.listeners.clear();
        if let Some(devtools) = &self.inner.devtools {
            devtools.clear();
        }
        if let Some(persistence) = &self.inner.persistence {
            persistence.clear_listeners();
        }
        tracing::debug!("store destroyed");
    }

    /// A weak handle that does not keep the store alive.
    pub fn downgrade(&self) -> StoreApi<S> {
        StoreApi {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<S: State> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: State> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*read(&self.inner.state))
            .field("listeners", &self.inner.listeners.len())
            .field("devtools", &self.inner.devtools.is_some())
            .field("persistence", &self.inner.persistence.is_some())
            .finish()
    }
}

/// Get/set accessors handed to the store initializer.
///
/// Holds the store weakly: calls made before the store is built, or after
/// every [`Store`] handle is dropped, do nothing.
pub struct StoreApi<S: State> {
    inner: Weak<Inner<S>>,
}

impl<S: State> StoreApi<S> {
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }

    pub fn get_state(&self) -> Option<S> {
        self.upgrade().map(|store| store.get_state())
    }

    pub fn set_state(&self, update: Update<S>) {
        self.set_state_as(update, ANONYMOUS_ACTION);
    }

    pub fn set_state_as(&self, update: Update<S>, action: &str) {
        match self.upgrade() {
            Some(store) => store.set_state_as(update, action),
            None => tracing::warn!(action, "update dropped: store is not available"),
        }
    }
}

impl<S: State> Clone for StoreApi<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

/// Builder returned by [`Store::builder`].
pub struct StoreBuilder<S: State> {
    initializer: Box<dyn FnOnce(&StoreApi<S>) -> S>,
    devtools: DevtoolsConfig,
    persistence: Option<Persistence<S>>,
}

impl<S: State> StoreBuilder<S> {
    pub fn devtools(mut self, config: DevtoolsConfig) -> Self {
        self.devtools = config;
        self
    }

    /// Build the store and, when persistence is configured without
    /// `skip_hydration`, run the first hydration cycle.
    ///
    /// Hydration failures are logged and leave the store unhydrated.
    pub fn build(self) -> Store<S> {
        let StoreBuilder {
            initializer,
            devtools,
            persistence,
        } = self;
        let devtools = Devtools::new(devtools);

        let inner = Arc::new_cyclic(|weak| {
            let api = StoreApi {
                inner: Weak::clone(weak),
            };
            Inner {
                state: RwLock::new(initializer(&api)),
                listeners: Registry::new(),
                devtools,
                persistence,
            }
        });
        let store = Store { inner };

        if let Some(devtools) = &store.inner.devtools {
            store.read(|state| devtools.record(INIT_ACTION, state));
        }
        if let Some(persistence) = &store.inner.persistence {
            if !persistence.skip_hydration() {
                // Failures are logged by the persistence layer.
                let _ = persistence.rehydrate(&store);
            }
        }

        store
    }
}

impl<S: Persistable> StoreBuilder<S> {
    pub fn persist(mut self, config: PersistConfig<S>) -> Self {
        self.persistence = Some(Persistence::new(config));
        self
    }
}
