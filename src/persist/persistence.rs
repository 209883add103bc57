use super::config::{MigrateFn, PersistConfig, RehydrateHook};
use super::storage::StateStorage;
use super::Persistable;
use crate::error::PersistError;
use crate::store::{Registry, State, Store, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Action label of the commit that applies a restored snapshot.
pub const REHYDRATE_ACTION: &str = "@@persist/rehydrate";

/// On-disk record: the snapshot plus the version it was written with.
#[derive(Debug, Serialize, Deserialize)]
struct StorageValue {
    state: Value,
    #[serde(default)]
    version: u32,
}

type Encoder<S> = Box<dyn Fn(&S) -> Result<Value, serde_json::Error> + Send + Sync>;
type Decoder<S> = Box<dyn Fn(Value, &mut S) -> Result<(), serde_json::Error> + Send + Sync>;
type HydrationListener<S> = Arc<dyn Fn(&S) + Send + Sync>;

pub(crate) struct Persistence<S: State> {
    name: String,
    storage: Arc<dyn StateStorage>,
    version: u32,
    migrate: Option<MigrateFn>,
    on_rehydrate: Option<RehydrateHook<S>>,
    skip_hydration: bool,
    encode: Encoder<S>,
    decode: Decoder<S>,
    hydrated: AtomicBool,
    writes_paused: AtomicBool,
    hydrate_listeners: Arc<Registry<HydrationListener<S>>>,
    finish_listeners: Arc<Registry<HydrationListener<S>>>,
}

impl<S: State> Persistence<S> {
    pub(crate) fn new(config: PersistConfig<S>) -> Self
    where
        S: Persistable,
    {
        Self {
            name: config.name,
            storage: config.storage,
            version: config.version,
            migrate: config.migrate,
            on_rehydrate: config.on_rehydrate,
            skip_hydration: config.skip_hydration,
            encode: Box::new(|state: &S| serde_json::to_value(state.snapshot())),
            decode: Box::new(|value: Value, state: &mut S| -> Result<(), serde_json::Error> {
                let snapshot = serde_json::from_value::<S::Snapshot>(value)?;
                state.restore(snapshot);
                Ok(())
            }),
            hydrated: AtomicBool::new(false),
            writes_paused: AtomicBool::new(false),
            hydrate_listeners: Registry::new(),
            finish_listeners: Registry::new(),
        }
    }

    pub(crate) fn skip_hydration(&self) -> bool {
        self.skip_hydration
    }

    /// Write the snapshot of `state`. Failures are logged, never raised.
    pub(crate) fn write(&self, state: &S) {
        if self.writes_paused.load(Ordering::SeqCst) {
            tracing::trace!(name = %self.name, "write skipped while hydration starts");
            return;
        }
        if let Err(err) = self.try_write(state) {
            tracing::warn!(name = %self.name, error = %err, "failed to persist state");
        }
    }

    fn try_write(&self, state: &S) -> Result<(), PersistError> {
        let record = StorageValue {
            state: (self.encode)(state).map_err(|source| PersistError::Encode { source })?,
            version: self.version,
        };
        let json =
            serde_json::to_string(&record).map_err(|source| PersistError::Encode { source })?;
        self.storage.set_item(&self.name, &json)?;
        Ok(())
    }

    fn corrupt(&self, source: serde_json::Error) -> PersistError {
        PersistError::Corrupt {
            name: self.name.clone(),
            source,
        }
    }

    /// Migrate and apply a stored record, if any.
    fn load(&self, store: &Store<S>, raw: Option<String>) -> Result<(), PersistError> {
        let Some(raw) = raw else {
            tracing::debug!(name = %self.name, "no persisted state");
            return Ok(());
        };

        let record: StorageValue = serde_json::from_str(&raw).map_err(|err| self.corrupt(err))?;
        let snapshot = if record.version == self.version {
            record.state
        } else if let Some(migrate) = &self.migrate {
            tracing::debug!(
                name = %self.name,
                from = record.version,
                to = self.version,
                "migrating persisted state"
            );
            migrate(record.state, record.version)?
        } else {
            tracing::warn!(
                name = %self.name,
                stored = record.version,
                expected = self.version,
                "persisted state version mismatch and no migration configured"
            );
            return Ok(());
        };

        store
            .try_update_as(REHYDRATE_ACTION, |state| (self.decode)(snapshot, state))
            .map_err(|err| self.corrupt(err))
    }

    /// Run one hydration cycle.
    pub(crate) fn rehydrate(&self, store: &Store<S>) -> Result<(), PersistError> {
        self.hydrated.store(false, Ordering::SeqCst);
        tracing::debug!(name = %self.name, "hydration started");

        // The record is read before start listeners run, and their commits
        // are not written: the stored record stays as it was until loaded.
        let raw = self.storage.get_item(&self.name);
        {
            let _paused = PausedWrites::new(&self.writes_paused);
            let current = store.get_state();
            for listener in self.hydrate_listeners.snapshot() {
                listener(&current);
            }
        }

        let loaded = raw
            .map_err(PersistError::from)
            .and_then(|raw| self.load(store, raw));
        match loaded {
            Ok(()) => {
                let restored = store.get_state();
                if let Some(hook) = &self.on_rehydrate {
                    hook(store, Ok(&restored));
                }
                self.hydrated.store(true, Ordering::SeqCst);
                tracing::debug!(name = %self.name, "hydration finished");
                for listener in self.finish_listeners.snapshot() {
                    listener(&restored);
                }
                Ok(())
            }
            Err(err) => {
                tracing::error!(name = %self.name, error = %err, "failed to restore persisted state");
                if let Some(hook) = &self.on_rehydrate {
                    hook(store, Err(&err));
                }
                Err(err)
            }
        }
    }

    pub(crate) fn clear_listeners(&self) {
        self.hydrate_listeners.clear();
        self.finish_listeners.clear();
    }
}

/// Suspends persistence writes until dropped.
struct PausedWrites<'a>(&'a AtomicBool);

impl<'a> PausedWrites<'a> {
    fn new(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PausedWrites<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Persistence controls of a store, from [`Store::persist`].
pub struct PersistApi<'a, S: State> {
    store: &'a Store<S>,
    persistence: &'a Persistence<S>,
}

impl<'a, S: State> PersistApi<'a, S> {
    pub(crate) fn new(store: &'a Store<S>, persistence: &'a Persistence<S>) -> Self {
        Self { store, persistence }
    }

    /// Storage key of the persisted record.
    pub fn name(&self) -> &str {
        &self.persistence.name
    }

    pub fn version(&self) -> u32 {
        self.persistence.version
    }

    /// Whether the latest hydration cycle completed.
    pub fn has_hydrated(&self) -> bool {
        self.persistence.hydrated.load(Ordering::SeqCst)
    }

    /// Start a new hydration cycle from storage.
    pub fn rehydrate(&self) -> Result<(), PersistError> {
        self.persistence.rehydrate(self.store)
    }

    /// Called with the current state when a hydration cycle starts.
    pub fn on_hydrate<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.persistence.hydrate_listeners.register(Arc::new(listener))
    }

    /// Called with the restored state when a hydration cycle completes.
    pub fn on_finish_hydration<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.persistence.finish_listeners.register(Arc::new(listener))
    }

    /// Remove the persisted record. In-memory state is unchanged.
    pub fn clear_storage(&self) -> Result<(), PersistError> {
        self.persistence.storage.remove_item(&self.persistence.name)?;
        Ok(())
    }

    /// Number of registered hydration lifecycle listeners.
    pub fn listener_count(&self) -> usize {
        self.persistence.hydrate_listeners.len() + self.persistence.finish_listeners.len()
    }
}
