//! # Larder
//!
//! Application state container with persistence and hydration tracking.
//!
//! ## Store
//!
//! [`Store<S>`] holds one state value and composes three layers around it:
//! - Devtools: every transition is recorded under an action label
//! - Selector subscriptions: listeners run only when their slice changes
//! - Persistence: a declared snapshot of the state is written to storage
//!   after every update and restored on hydration
//!
//! ## Hydration
//!
//! [`HydrationWatcher`] exposes whether persisted state has finished loading
//! as an observable [`HydrationStatus`], mirroring it into the state tree for
//! consumers that only read the store.
//!
//! ```
//! use std::sync::Arc;
//! use larder::persist::{MemoryStorage, PersistConfig, Persistable};
//! use larder::{State, Store, Update};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Counter {
//!     count: u32,
//!     dirty: bool,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct CounterSnapshot {
//!     count: u32,
//! }
//!
//! impl State for Counter {
//!     type Patch = u32;
//!
//!     fn merge(&mut self, count: u32) {
//!         self.count = count;
//!         self.dirty = true;
//!     }
//! }
//!
//! impl Persistable for Counter {
//!     type Snapshot = CounterSnapshot;
//!
//!     fn snapshot(&self) -> CounterSnapshot {
//!         CounterSnapshot { count: self.count }
//!     }
//!
//!     fn restore(&mut self, snapshot: CounterSnapshot) {
//!         self.count = snapshot.count;
//!     }
//! }
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let store = Store::builder(|_| Counter::default())
//!     .persist(PersistConfig::new("counter", storage.clone()))
//!     .build();
//!
//! store.set_state(Update::merge(3));
//! assert_eq!(store.get_state().count, 3);
//! assert!(store.persist().unwrap().has_hydrated());
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod hydration;
pub mod logging;
pub mod persist;
pub mod store;
mod sync;

// Re-export main types for convenience
pub use app::{create_app_store, AppState, AppStore, AppStoreExt, SessionRestorer};
pub use config::{AppConfig, BuildMode};
pub use error::{PersistError, Result, StorageError, StoreError};
pub use hydration::{HydrationStatus, HydrationWatcher};
pub use store::{Binding, State, Store, SubscribeOptions, Subscription, Update};
