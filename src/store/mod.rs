//! High-level state management with stores.
//!
//! A [`Store`] holds one state value and layers devtools recording,
//! selector subscriptions and persistence around it. [`Binding`] adapts a
//! store slice into a reactive value for UI code.

mod binding;
mod devtools;
mod store;
mod subscription;

pub use binding::Binding;
pub use devtools::{DevtoolsConfig, Transition, ANONYMOUS_ACTION, INIT_ACTION};
pub use store::{State, Store, StoreApi, StoreBuilder, Update};
pub(crate) use subscription::Registry;
pub use subscription::{SubscribeOptions, Subscription};
