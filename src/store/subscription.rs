use crate::sync::{read, write};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// An ordered set of listeners keyed by registration id.
///
/// Notification works on a snapshot of the entries, so listeners may
/// register, unregister or write to the store while being called.
pub(crate) struct Registry<L> {
    next_id: AtomicUsize,
    entries: RwLock<Vec<(usize, L)>>,
}

impl<L: Clone + Send + Sync + 'static> Registry<L> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicUsize::new(0),
            entries: RwLock::new(Vec::new()),
        })
    }

    /// Register a listener and hand back the handle that removes it.
    pub(crate) fn register(self: &Arc<Self>, listener: L) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        write(&self.entries).push((id, listener));

        let registry: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }

    fn remove(&self, id: usize) -> bool {
        let mut entries = write(&self.entries);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<L> {
        read(&self.entries)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub(crate) fn clear(&self) {
        write(&self.entries).clear();
    }

    pub(crate) fn len(&self) -> usize {
        read(&self.entries).len()
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle unregisters the listener, like calling
/// [`unsubscribe`](Self::unsubscribe). Use [`detach`](Self::detach) to keep
/// the listener for as long as the store lives.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the listener registered until the store is destroyed.
    pub fn detach(mut self) {
        self.cancel.take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type EqualityFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Options for selector subscriptions.
pub struct SubscribeOptions<T> {
    pub(crate) equality: EqualityFn<T>,
    pub(crate) fire_immediately: bool,
}

impl<T: PartialEq + 'static> Default for SubscribeOptions<T> {
    fn default() -> Self {
        Self {
            equality: Arc::new(|a: &T, b: &T| a == b),
            fire_immediately: false,
        }
    }
}

impl<T> SubscribeOptions<T> {
    /// Compare slices with a custom function instead of `PartialEq`.
    pub fn with_equality<F>(equality: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            equality: Arc::new(equality),
            fire_immediately: false,
        }
    }

    /// Call the listener once at registration with `(slice, slice)`.
    pub fn fire_immediately(mut self, fire: bool) -> Self {
        self.fire_immediately = fire;
        self
    }
}
