//! Hydration tracking for UI consumers.
//!
//! [`HydrationWatcher`] turns the persistence layer's lifecycle events into
//! an observable [`HydrationStatus`] and mirrors it into the global state for
//! consumers that only read the store (route guards and the like).

use crate::error::{Result, StoreError};
use crate::store::{Registry, State, Store, StoreApi, Subscription};
use crate::sync::{read, write};
use std::sync::{Arc, RwLock};

/// Whether persisted state has finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HydrationStatus {
    #[default]
    NotHydrated,
    Hydrated,
}

impl HydrationStatus {
    /// A hydration cycle started.
    pub fn start_cycle(self) -> Self {
        HydrationStatus::NotHydrated
    }

    /// A hydration cycle completed.
    pub fn finish_cycle(self) -> Self {
        HydrationStatus::Hydrated
    }

    pub fn is_hydrated(self) -> bool {
        self == HydrationStatus::Hydrated
    }
}

impl From<bool> for HydrationStatus {
    fn from(hydrated: bool) -> Self {
        if hydrated {
            HydrationStatus::Hydrated
        } else {
            HydrationStatus::NotHydrated
        }
    }
}

type Mirror<S> = Arc<dyn Fn(&Store<S>, bool) + Send + Sync>;
type StatusObserver = Arc<dyn Fn(HydrationStatus) + Send + Sync>;

/// Local status plus the observers watching it.
struct Tracker {
    status: RwLock<HydrationStatus>,
    observers: Arc<Registry<StatusObserver>>,
}

impl Tracker {
    fn transition(&self, next: impl FnOnce(HydrationStatus) -> HydrationStatus) {
        let changed = {
            let mut status = write(&self.status);
            let updated = next(*status);
            let changed = updated != *status;
            *status = updated;
            changed.then_some(updated)
        };
        if let Some(status) = changed {
            for observer in self.observers.snapshot() {
                observer(status);
            }
        }
    }
}

/// Observable hydration status of a persisted store.
///
/// Listeners are registered by [`activate`](Self::activate) and released by
/// [`deactivate`](Self::deactivate) or on drop, so a watcher never outlives
/// the component that owns it.
pub struct HydrationWatcher<S: State> {
    store: StoreApi<S>,
    mirror: Mirror<S>,
    tracker: Arc<Tracker>,
    listeners: Option<(Subscription, Subscription)>,
}

impl<S: State> HydrationWatcher<S> {
    /// Create an inactive watcher. `mirror` copies each lifecycle transition
    /// into the global state.
    pub fn new<F>(store: &Store<S>, mirror: F) -> Result<Self>
    where
        F: Fn(&Store<S>, bool) + Send + Sync + 'static,
    {
        if store.persist().is_none() {
            return Err(StoreError::PersistenceDisabled);
        }
        Ok(Self {
            store: store.downgrade(),
            mirror: Arc::new(mirror),
            tracker: Arc::new(Tracker {
                status: RwLock::new(HydrationStatus::NotHydrated),
                observers: Registry::new(),
            }),
            listeners: None,
        })
    }

    /// Register the lifecycle listeners and read the current status.
    ///
    /// Does nothing while already active.
    pub fn activate(&mut self) -> Result<()> {
        if self.listeners.is_some() {
            return Ok(());
        }
        let store = self.store.upgrade().ok_or(StoreError::Released)?;
        let persist = store.persist().ok_or(StoreError::PersistenceDisabled)?;

        let on_start = persist.on_hydrate({
            let store = self.store.clone();
            let mirror = Arc::clone(&self.mirror);
            let tracker = Arc::clone(&self.tracker);
            move |_| {
                if let Some(store) = store.upgrade() {
                    mirror(&store, false);
                }
                tracker.transition(HydrationStatus::start_cycle);
            }
        });
        let on_finish = persist.on_finish_hydration({
            let store = self.store.clone();
            let mirror = Arc::clone(&self.mirror);
            let tracker = Arc::clone(&self.tracker);
            move |_| {
                if let Some(store) = store.upgrade() {
                    mirror(&store, true);
                }
                tracker.transition(HydrationStatus::finish_cycle);
            }
        });
        self.listeners = Some((on_start, on_finish));

        let hydrated = persist.has_hydrated();
        self.tracker.transition(|_| hydrated.into());
        tracing::debug!(hydrated, "hydration watcher activated");
        Ok(())
    }

    /// Release both lifecycle listeners. The last status is kept.
    pub fn deactivate(&mut self) {
        if let Some((on_start, on_finish)) = self.listeners.take() {
            on_start.unsubscribe();
            on_finish.unsubscribe();
        }
    }

    pub fn is_active(&self) -> bool {
        self.listeners.is_some()
    }

    pub fn status(&self) -> HydrationStatus {
        *read(&self.tracker.status)
    }

    pub fn is_hydrated(&self) -> bool {
        self.status().is_hydrated()
    }

    /// Observe status changes. The observer is not called for the current
    /// status, only for later transitions.
    pub fn watch<F>(&self, observer: F) -> Subscription
    where
        F: Fn(HydrationStatus) + Send + Sync + 'static,
    {
        self.tracker.observers.register(Arc::new(observer))
    }
}
