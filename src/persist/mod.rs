//! Persistence middleware.
//!
//! A persistable state declares the exact shape it writes to storage through
//! [`Persistable::Snapshot`]. Fields absent from the snapshot type, such as
//! transient flags or volatile collections, are never written, whatever is
//! later added to the state itself.

mod config;
mod persistence;
mod storage;

pub use config::{MigrateFn, PersistConfig, RehydrateHook};
pub use persistence::{PersistApi, REHYDRATE_ACTION};
pub(crate) use persistence::Persistence;
pub use storage::{FileStorage, MemoryStorage, StateStorage};

use crate::store::State;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// State that can be written to and restored from storage.
pub trait Persistable: State {
    /// The allow-list of persisted fields.
    type Snapshot: Serialize + DeserializeOwned;

    fn snapshot(&self) -> Self::Snapshot;

    /// Apply a restored snapshot over the current state.
    fn restore(&mut self, snapshot: Self::Snapshot);
}
