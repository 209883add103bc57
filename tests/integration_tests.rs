//! Integration tests for Larder

use larder::app::{app_persist_config, app_store_builder, AppPatch, SET_HAS_HYDRATED_ACTION};
use larder::persist::{MemoryStorage, StateStorage};
use larder::{
    create_app_store, AppConfig, AppState, AppStore, AppStoreExt, BuildMode, HydrationStatus,
    Update,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

const KEY: &str = "showcase-test";

fn config() -> AppConfig {
    AppConfig::new("showcase").unwrap().mode(BuildMode::Test)
}

struct Harness {
    storage: Arc<MemoryStorage>,
    restored: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            restored: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn seed(&self, state: Value) {
        let record = json!({ "state": state, "version": 0 });
        self.storage.set_item(KEY, &record.to_string()).unwrap();
    }

    fn record(&self) -> Value {
        let raw = self.storage.get_item(KEY).unwrap().expect("record written");
        serde_json::from_str(&raw).unwrap()
    }

    fn build(&self) -> AppStore {
        let restored = self.restored.clone();
        let restorer = Arc::new(move |_: &AppStore| {
            restored.fetch_add(1, Ordering::SeqCst);
        });
        let storage: Arc<dyn StateStorage> = self.storage.clone();
        let config = config();

        app_store_builder(&config, restorer.clone())
            .persist(app_persist_config(&config, restorer).storage(storage))
            .build()
    }

    fn restore_calls(&self) -> usize {
        self.restored.load(Ordering::SeqCst)
    }
}

#[test]
fn token_in_snapshot_completes_hydration() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "abc", "username": "ada" }));

    let store = harness.build();

    assert!(store.has_hydrated());
    assert_eq!(store.get_state().token.as_deref(), Some("abc"));
    assert_eq!(store.get_state().username.as_deref(), Some("ada"));
    assert_eq!(harness.restore_calls(), 0);
}

#[test]
fn missing_token_restores_session_once() {
    let harness = Harness::new();
    harness.seed(json!({ "username": "ada" }));

    let store = harness.build();

    assert_eq!(harness.restore_calls(), 1);
    assert!(!store.has_hydrated());
}

#[test]
fn empty_storage_restores_session_once() {
    let harness = Harness::new();

    let store = harness.build();

    assert_eq!(harness.restore_calls(), 1);
    assert!(!store.has_hydrated());
    assert!(store.persist().unwrap().has_hydrated());
}

#[test]
fn corrupt_snapshot_is_left_in_place() {
    let harness = Harness::new();
    harness.storage.set_item(KEY, "{\"state\":").unwrap();

    let store = harness.build();

    assert!(!store.persist().unwrap().has_hydrated());
    assert!(!store.has_hydrated());
    assert_eq!(harness.restore_calls(), 0);
    assert_eq!(
        harness.storage.get_item(KEY).unwrap().as_deref(),
        Some("{\"state\":")
    );

    let watcher = store.use_hydration().unwrap();
    assert_eq!(watcher.status(), HydrationStatus::NotHydrated);
}

#[test]
fn empty_token_restores_session() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "", "username": "ada" }));

    let store = harness.build();

    assert_eq!(harness.restore_calls(), 1);
    assert!(!store.has_hydrated());
    assert_eq!(store.get_state().username.as_deref(), Some("ada"));
}

#[test]
fn session_restorer_can_finish_hydration() {
    let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
    let config = config();
    let restorer = Arc::new(|store: &AppStore| {
        store.set_state(Update::merge(AppPatch {
            token: Some(Some("refreshed".to_string())),
            ..AppPatch::default()
        }));
        store.set_has_hydrated(true);
    });

    let store = app_store_builder(&config, restorer.clone())
        .persist(app_persist_config(&config, restorer).storage(storage.clone()))
        .build();

    assert!(store.has_hydrated());
    let raw = storage.get_item(KEY).unwrap().unwrap();
    assert!(raw.contains("refreshed"));
}

#[test]
fn tasks_and_flags_never_reach_storage() {
    let harness = Harness::new();
    let store = harness.build();

    store.set_state(Update::merge(AppPatch {
        token: Some(Some("abc".to_string())),
        tasks: Some(Some(json!([{ "id": 1 }]))),
        has_hydrated: Some(true),
        ..AppPatch::default()
    }));

    let record = harness.record();
    let state = record["state"].as_object().unwrap();
    assert_eq!(state["token"], json!("abc"));
    assert!(!state.contains_key("tasks"));
    assert!(!state.contains_key("has_hydrated"));
    assert_eq!(record["version"], json!(0));
}

#[test]
fn merge_and_replace_semantics() {
    let harness = Harness::new();
    let store = harness.build();

    store.set_state(Update::merge(AppPatch {
        token: Some(Some("abc".to_string())),
        username: Some(Some("ada".to_string())),
        ..AppPatch::default()
    }));
    store.set_state(Update::merge(AppPatch {
        username: Some(Some("grace".to_string())),
        ..AppPatch::default()
    }));
    assert_eq!(store.get_state().token.as_deref(), Some("abc"));
    assert_eq!(store.get_state().username.as_deref(), Some("grace"));

    store.set_state(Update::replace(AppState {
        username: Some("linus".to_string()),
        ..AppState::default()
    }));
    assert_eq!(store.get_state().token, None);
    assert_eq!(store.get_state().username.as_deref(), Some("linus"));
}

#[test]
fn watcher_before_completion_transitions_once() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "abc" }));
    let storage: Arc<dyn StateStorage> = harness.storage.clone();
    let config = config();
    let restorer = Arc::new(|_: &AppStore| {});
    let store = app_store_builder(&config, restorer.clone())
        .persist(
            app_persist_config(&config, restorer)
                .storage(storage)
                .skip_hydration(true),
        )
        .build();

    let watcher = store.use_hydration().unwrap();
    assert_eq!(watcher.status(), HydrationStatus::NotHydrated);

    let transitions = Arc::new(Mutex::new(Vec::new()));
    let transitions_clone = transitions.clone();
    let _watch = watcher.watch(move |status| transitions_clone.lock().unwrap().push(status));

    store.persist().unwrap().rehydrate().unwrap();

    assert_eq!(*transitions.lock().unwrap(), vec![HydrationStatus::Hydrated]);
    assert!(store.has_hydrated());
}

#[test]
fn active_watcher_keeps_record_through_rehydrate() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "abc", "username": "ada" }));
    let storage: Arc<dyn StateStorage> = harness.storage.clone();
    let config = config();
    let restorer = Arc::new(|_: &AppStore| {});
    let store = app_store_builder(&config, restorer.clone())
        .persist(
            app_persist_config(&config, restorer)
                .storage(storage)
                .skip_hydration(true),
        )
        .build();

    let watcher = store.use_hydration().unwrap();
    store.persist().unwrap().rehydrate().unwrap();

    let state = store.get_state();
    assert_eq!(state.token.as_deref(), Some("abc"));
    assert_eq!(state.username.as_deref(), Some("ada"));
    assert!(watcher.is_hydrated());
    assert!(store.has_hydrated());
    assert_eq!(harness.record()["state"]["token"], json!("abc"));
}

#[test]
fn listener_write_back_is_persisted() {
    let harness = Harness::new();
    let store = harness.build();

    let _subscription = store.subscribe(|state: &AppState| state.token.clone(), {
        let api = store.downgrade();
        move |token: &Option<String>, _: &Option<String>| {
            if token.as_deref() == Some("a") {
                api.set_state(Update::merge(AppPatch {
                    username: Some(Some("ada".to_string())),
                    ..AppPatch::default()
                }));
            }
        }
    });

    store.set_state(Update::merge(AppPatch {
        token: Some(Some("a".to_string())),
        ..AppPatch::default()
    }));

    assert_eq!(store.get_state().username.as_deref(), Some("ada"));
    let record = harness.record();
    assert_eq!(record["state"]["token"], json!("a"));
    assert_eq!(record["state"]["username"], json!("ada"));
}

#[test]
fn deactivated_watcher_stops_tracking() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "abc" }));
    let store = harness.build();

    let mut watcher = store.use_hydration().unwrap();
    assert!(watcher.is_hydrated());
    watcher.deactivate();

    let changes = Arc::new(AtomicUsize::new(0));
    let changes_clone = changes.clone();
    let _watch = watcher.watch(move |_| {
        changes_clone.fetch_add(1, Ordering::SeqCst);
    });

    store.persist().unwrap().rehydrate().unwrap();

    assert_eq!(changes.load(Ordering::SeqCst), 0);
    assert_eq!(store.persist().unwrap().listener_count(), 0);
}

#[test]
fn selector_subscription_tracks_token() {
    let harness = Harness::new();
    let store = harness.build();
    let tokens = Arc::new(Mutex::new(Vec::new()));
    let tokens_clone = tokens.clone();

    let subscription = store.subscribe(
        |state: &AppState| state.token.clone(),
        move |token, _| tokens_clone.lock().unwrap().push(token.clone()),
    );

    store.set_state(Update::merge(AppPatch {
        tasks: Some(Some(json!([]))),
        ..AppPatch::default()
    }));
    store.set_state(Update::merge(AppPatch {
        token: Some(Some("abc".to_string())),
        ..AppPatch::default()
    }));
    subscription.unsubscribe();
    store.set_state(Update::merge(AppPatch {
        token: Some(None),
        ..AppPatch::default()
    }));

    assert_eq!(*tokens.lock().unwrap(), vec![Some("abc".to_string())]);
}

#[test]
fn binding_follows_username() {
    let harness = Harness::new();
    let store = harness.build();
    let username = store.bind(|state: &AppState| state.username.clone());

    assert_eq!(username.get(), None);
    store.set_state(Update::merge(AppPatch {
        username: Some(Some("ada".to_string())),
        ..AppPatch::default()
    }));
    assert_eq!(username.get().as_deref(), Some("ada"));
}

#[test]
fn destroy_detaches_everything() {
    let harness = Harness::new();
    let store = harness.build();
    store.subscribe_all(|_, _| {}).detach();
    let watcher = store.use_hydration().unwrap();

    store.destroy();

    assert_eq!(store.listener_count(), 0);
    assert_eq!(store.persist().unwrap().listener_count(), 0);
    drop(watcher);
}

#[test]
fn devtools_labels_hydration_mutator() {
    let harness = Harness::new();
    harness.seed(json!({ "token": "abc" }));
    let storage: Arc<dyn StateStorage> = harness.storage.clone();
    let config = config().mode(BuildMode::Development);
    let restorer = Arc::new(|_: &AppStore| {});

    let store = app_store_builder(&config, restorer.clone())
        .persist(app_persist_config(&config, restorer).storage(storage))
        .build();

    let actions: Vec<_> = store
        .transitions()
        .into_iter()
        .map(|transition| transition.action)
        .collect();
    assert_eq!(
        actions,
        vec!["@@INIT", "@@persist/rehydrate", SET_HAS_HYDRATED_ACTION]
    );
}

#[test]
fn file_storage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config().storage_dir(dir.path());
    let restored = Arc::new(AtomicUsize::new(0));
    let restorer = {
        let restored = restored.clone();
        Arc::new(move |_: &AppStore| {
            restored.fetch_add(1, Ordering::SeqCst);
        })
    };

    let first = create_app_store(&config, restorer.clone());
    first.set_state(Update::merge(AppPatch {
        token: Some(Some("abc".to_string())),
        organization: Some(Some(json!({ "name": "Acme" }))),
        tasks: Some(Some(json!([1, 2, 3]))),
        ..AppPatch::default()
    }));
    first.destroy();
    drop(first);

    let second = create_app_store(&config, restorer);
    let state = second.get_state();
    assert_eq!(state.token.as_deref(), Some("abc"));
    assert_eq!(state.organization, Some(json!({ "name": "Acme" })));
    assert_eq!(state.tasks, None);
    assert!(second.has_hydrated());
    assert_eq!(restored.load(Ordering::SeqCst), 1);
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z0-9]{0,12}")
}

fn optional_payload() -> impl Strategy<Value = Option<Value>> {
    proptest::option::of(prop_oneof![
        Just(json!(null)),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(|s| json!({ "name": s })),
        proptest::collection::vec(any::<u16>(), 0..4).prop_map(|v| json!(v)),
    ])
}

prop_compose! {
    fn app_state()(
        has_hydrated in any::<bool>(),
        token in optional_text(),
        username in optional_text(),
        user in optional_payload(),
        organization in optional_payload(),
        tasks in optional_payload(),
        trees in optional_payload(),
        i18n in optional_payload(),
    ) -> AppState {
        AppState { has_hydrated, token, username, user, organization, tasks, trees, i18n }
    }
}

proptest! {
    #[test]
    fn persisted_record_never_contains_volatile_fields(state in app_state()) {
        let harness = Harness::new();
        let store = harness.build();

        store.set_state(Update::replace(state.clone()));

        let record = harness.record();
        let persisted = record["state"].as_object().unwrap();
        prop_assert!(!persisted.contains_key("tasks"));
        prop_assert!(!persisted.contains_key("has_hydrated"));
        prop_assert!(persisted.keys().all(|key| !key.starts_with('_')));
        prop_assert_eq!(&persisted["token"], &json!(state.token));
        prop_assert_eq!(&persisted["organization"], &json!(state.organization));
    }
}
