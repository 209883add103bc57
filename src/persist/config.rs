use super::storage::{FileStorage, StateStorage};
use crate::config::AppConfig;
use crate::error::PersistError;
use crate::store::{State, Store};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Upgrades a stored snapshot from an older version: `(state, from_version)`.
pub type MigrateFn = Arc<dyn Fn(Value, u32) -> Result<Value, PersistError> + Send + Sync>;

/// Called after every hydration cycle with the restored state or the error.
pub type RehydrateHook<S> = Arc<dyn Fn(&Store<S>, Result<&S, &PersistError>) + Send + Sync>;

/// Configuration of the persistence layer.
pub struct PersistConfig<S: State> {
    pub(crate) name: String,
    pub(crate) storage: Arc<dyn StateStorage>,
    pub(crate) version: u32,
    pub(crate) migrate: Option<MigrateFn>,
    pub(crate) on_rehydrate: Option<RehydrateHook<S>>,
    pub(crate) skip_hydration: bool,
}

impl<S: State> PersistConfig<S> {
    /// Persist under `name` in the given storage.
    pub fn new(name: impl Into<String>, storage: Arc<dyn StateStorage>) -> Self {
        Self {
            name: name.into(),
            storage,
            version: 0,
            migrate: None,
            on_rehydrate: None,
            skip_hydration: false,
        }
    }

    /// `<app-name>-<build-mode>` in file storage under the configured directory.
    pub fn for_app(config: &AppConfig) -> Self {
        Self::new(
            config.storage_key(),
            Arc::new(FileStorage::new(&config.storage_dir)),
        )
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StateStorage>) -> Self {
        self.storage = storage;
        self
    }

    /// Records written with another version go through [`migrate`](Self::migrate).
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn migrate<F>(mut self, migrate: F) -> Self
    where
        F: Fn(Value, u32) -> Result<Value, PersistError> + Send + Sync + 'static,
    {
        self.migrate = Some(Arc::new(migrate));
        self
    }

    pub fn on_rehydrate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Store<S>, Result<&S, &PersistError>) + Send + Sync + 'static,
    {
        self.on_rehydrate = Some(Arc::new(hook));
        self
    }

    /// Leave hydration to an explicit `rehydrate` call instead of the builder.
    pub fn skip_hydration(mut self, skip: bool) -> Self {
        self.skip_hydration = skip;
        self
    }
}

impl<S: State> fmt::Debug for PersistConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("migrate", &self.migrate.is_some())
            .field("on_rehydrate", &self.on_rehydrate.is_some())
            .field("skip_hydration", &self.skip_hydration)
            .finish_non_exhaustive()
    }
}
