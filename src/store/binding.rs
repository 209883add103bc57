use super::store::{State, Store};
use super::subscription::{Registry, SubscribeOptions, Subscription};
use crate::sync::{read, write};
use std::sync::{Arc, RwLock};

type Watcher<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A reactive view of a store slice.
///
/// The value is kept current by a selector subscription; watchers run only
/// when the slice changes. Dropping the last clone releases the subscription.
#[derive(Clone)]
pub struct Binding<T> {
    value: Arc<RwLock<T>>,
    watchers: Arc<Registry<Watcher<T>>>,
    _subscription: Arc<Subscription>,
}

impl<T: Clone + Send + Sync + 'static> Binding<T> {
    /// Get the current value of the slice.
    pub fn get(&self) -> T {
        read(&self.value).clone()
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = read(&self.value);
        f(&*value)
    }

    /// Watch the slice for changes.
    ///
    /// The callback runs immediately with the current value, then after
    /// every change.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Watcher<T> = Arc::new(callback);
        let subscription = self.watchers.register(Arc::clone(&callback));
        let value = self.get();
        callback(&value);
        subscription
    }
}

impl<S: State> Store<S> {
    /// Bind a selected slice, re-running watchers when it changes by value.
    pub fn bind<T, Sel>(&self, selector: Sel) -> Binding<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.bind_with(selector, SubscribeOptions::default())
    }

    /// Bind the whole state; watchers run after every update.
    pub fn bind_all(&self) -> Binding<S> {
        self.bind_with(S::clone, SubscribeOptions::with_equality(|_, _| false))
    }

    pub fn bind_with<T, Sel>(&self, selector: Sel, options: SubscribeOptions<T>) -> Binding<T>
    where
        T: Clone + Send + Sync + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
    {
        let value = Arc::new(RwLock::new(self.read(|state| selector(state))));
        let watchers: Arc<Registry<Watcher<T>>> = Registry::new();

        let subscription = self.subscribe_with(
            selector,
            {
                let value = Arc::clone(&value);
                let watchers = Arc::clone(&watchers);
                move |next: &T, _: &T| {
                    *write(&value) = next.clone();
                    for watcher in watchers.snapshot() {
                        watcher(next);
                    }
                }
            },
            options.fire_immediately(false),
        );

        Binding {
            value,
            watchers,
            _subscription: Arc::new(subscription),
        }
    }
}
