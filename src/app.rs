//! The application state tree and its store wiring.
//!
//! [`AppState`] holds session, identity and UI payload for the showcase
//! application. Only [`PersistedState`] reaches storage: the volatile task
//! list and the internal hydration flag stay in memory.

use crate::config::AppConfig;
use crate::error::{PersistError, Result};
use crate::hydration::HydrationWatcher;
use crate::persist::{PersistConfig, Persistable};
use crate::store::{DevtoolsConfig, State, Store, StoreBuilder, Update};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Action label of the hydration flag mutator.
pub const SET_HAS_HYDRATED_ACTION: &str = "@STORE/REHYDRATE";

/// Application-global state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Internal: mirrors the hydration status for non-watcher consumers.
    pub has_hydrated: bool,
    /// Session token; its absence after hydration triggers session restoration.
    pub token: Option<String>,
    pub username: Option<String>,
    pub user: Option<Value>,
    pub organization: Option<Value>,
    /// Volatile: refetched on every session, never persisted.
    pub tasks: Option<Value>,
    pub trees: Option<Value>,
    pub i18n: Option<Value>,
}

/// Partial update of [`AppState`]. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct AppPatch {
    pub has_hydrated: Option<bool>,
    pub token: Option<Option<String>>,
    pub username: Option<Option<String>>,
    pub user: Option<Option<Value>>,
    pub organization: Option<Option<Value>>,
    pub tasks: Option<Option<Value>>,
    pub trees: Option<Option<Value>>,
    pub i18n: Option<Option<Value>>,
}

impl State for AppState {
    type Patch = AppPatch;

    fn merge(&mut self, patch: AppPatch) {
        let AppPatch {
            has_hydrated,
            token,
            username,
            user,
            organization,
            tasks,
            trees,
            i18n,
        } = patch;

        if let Some(has_hydrated) = has_hydrated {
            self.has_hydrated = has_hydrated;
        }
        if let Some(token) = token {
            self.token = token;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(user) = user {
            self.user = user;
        }
        if let Some(organization) = organization {
            self.organization = organization;
        }
        if let Some(tasks) = tasks {
            self.tasks = tasks;
        }
        if let Some(trees) = trees {
            self.trees = trees;
        }
        if let Some(i18n) = i18n {
            self.i18n = i18n;
        }
    }
}

/// The persisted subset of [`AppState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub token: Option<String>,
    pub username: Option<String>,
    pub user: Option<Value>,
    pub organization: Option<Value>,
    pub trees: Option<Value>,
    pub i18n: Option<Value>,
}

impl Persistable for AppState {
    type Snapshot = PersistedState;

    fn snapshot(&self) -> PersistedState {
        PersistedState {
            token: self.token.clone(),
            username: self.username.clone(),
            user: self.user.clone(),
            organization: self.organization.clone(),
            trees: self.trees.clone(),
            i18n: self.i18n.clone(),
        }
    }

    fn restore(&mut self, snapshot: PersistedState) {
        self.token = snapshot.token;
        self.username = snapshot.username;
        self.user = snapshot.user;
        self.organization = snapshot.organization;
        self.trees = snapshot.trees;
        self.i18n = snapshot.i18n;
    }
}

pub type AppStore = Store<AppState>;

/// Re-establishes a session when hydration restored no token.
pub trait SessionRestorer: Send + Sync {
    fn restore_session(&self, store: &AppStore);
}

impl<F> SessionRestorer for F
where
    F: Fn(&AppStore) + Send + Sync,
{
    fn restore_session(&self, store: &AppStore) {
        self(store)
    }
}

/// Decide what a finished hydration cycle means for the session.
fn after_rehydrate(
    restorer: &dyn SessionRestorer,
    store: &AppStore,
    result: std::result::Result<&AppState, &PersistError>,
) {
    // The persistence layer has already logged the failure.
    let Ok(state) = result else {
        return;
    };

    let has_token = state.token.as_deref().is_some_and(|token| !token.is_empty());
    if !has_token {
        tracing::info!("no session token after hydration, restoring session");
        restorer.restore_session(store);
    } else {
        store.set_has_hydrated(true);
    }
}

/// Builder with the application defaults: devtools in development mode and
/// persistence under `<app-name>-<build-mode>`.
///
/// Callers may still override devtools or persistence before `build`.
pub fn app_store_builder(
    config: &AppConfig,
    restorer: Arc<dyn SessionRestorer>,
) -> StoreBuilder<AppState> {
    Store::builder(|_| AppState::default())
        .devtools(
            DevtoolsConfig::default()
                .enabled(config.devtools_enabled())
                .name(config.app_name.clone()),
        )
        .persist(app_persist_config(config, restorer))
}

/// The default persistence configuration, for callers that need to adjust it.
pub fn app_persist_config(
    config: &AppConfig,
    restorer: Arc<dyn SessionRestorer>,
) -> PersistConfig<AppState> {
    PersistConfig::for_app(config)
        .on_rehydrate(move |store, result| after_rehydrate(restorer.as_ref(), store, result))
}

/// Build the application store and run its first hydration cycle.
pub fn create_app_store(config: &AppConfig, restorer: Arc<dyn SessionRestorer>) -> AppStore {
    app_store_builder(config, restorer).build()
}

/// Mutators and hooks of the application store.
pub trait AppStoreExt {
    fn set_has_hydrated(&self, hydrated: bool);

    fn has_hydrated(&self) -> bool;

    /// A hydration watcher mirroring into `has_hydrated`, already active.
    fn use_hydration(&self) -> Result<HydrationWatcher<AppState>>;
}

impl AppStoreExt for AppStore {
    fn set_has_hydrated(&self, hydrated: bool) {
        self.set_state_as(
            Update::merge(AppPatch {
                has_hydrated: Some(hydrated),
                ..AppPatch::default()
            }),
            SET_HAS_HYDRATED_ACTION,
        );
    }

    fn has_hydrated(&self) -> bool {
        self.read(|state| state.has_hydrated)
    }

    fn use_hydration(&self) -> Result<HydrationWatcher<AppState>> {
        let mut watcher = HydrationWatcher::new(self, |store: &AppStore, hydrated| {
            store.set_has_hydrated(hydrated)
        })?;
        watcher.activate()?;
        Ok(watcher)
    }
}
