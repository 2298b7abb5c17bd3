//! Observable state containers for clients.
//!
//! A [Store] owns a value and a list of subscribers. The only way to change
//! the value is [Store::update], which notifies every subscriber with a
//! snapshot of the new value after the store's lock has been released, so
//! subscribers may read or update the store themselves.

mod notifications;
mod session;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use notifications::{Notification, NotificationKind, Notifications};
pub use session::AuthSession;

/// Identifies a subscription so it can be cancelled with [Store::unsubscribe].
pub type SubscriptionId = u64;

type Subscriber<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct StoreInner<S> {
    state: S,
    subscribers: Vec<(SubscriptionId, Subscriber<S>)>,
    next_subscription_id: SubscriptionId,
}

/// Shared, observable state. Clones refer to the same state.
pub struct Store<S> {
    inner: Arc<Mutex<StoreInner<S>>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Clone> Store<S> {
    /// Create a store holding `initial_state` with no subscribers.
    pub fn new(initial_state: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: initial_state,
                subscribers: Vec::new(),
                next_subscription_id: 1,
            })),
        }
    }

    // A subscriber that panicked must not make the store unusable.
    fn lock(&self) -> MutexGuard<'_, StoreInner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> S {
        self.lock().state.clone()
    }

    /// Call `subscriber` with the new state after every update.
    pub fn subscribe(&self, subscriber: impl Fn(&S) + Send + Sync + 'static) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_subscription_id;
        inner.next_subscription_id += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));

        id
    }

    /// Stop notifying the subscriber `id`.
    ///
    /// Returns `false` if there was no such subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let count_before = inner.subscribers.len();
        inner.subscribers.retain(|(subscription_id, _)| *subscription_id != id);

        inner.subscribers.len() != count_before
    }

    /// Change the state with `change` and notify every subscriber.
    ///
    /// Returns whatever `change` returns.
    pub fn update<R>(&self, change: impl FnOnce(&mut S) -> R) -> R {
        let (output, snapshot, subscribers) = {
            let mut inner = self.lock();
            let output = change(&mut inner.state);
            let subscribers: Vec<Subscriber<S>> = inner
                .subscribers
                .iter()
                .map(|(_, subscriber)| subscriber.clone())
                .collect();

            (output, inner.state.clone(), subscribers)
        };

        for subscriber in subscribers {
            subscriber(&snapshot);
        }

        output
    }
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[cfg(test)]
mod store_tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::Store;

    #[test]
    fn update_changes_state() {
        let store = Store::new(1);

        let doubled = store.update(|count| {
            *count *= 2;
            *count
        });

        assert_eq!(doubled, 2);
        assert_eq!(store.snapshot(), 2);
    }

    #[test]
    fn every_subscriber_sees_the_same_snapshot() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let seen = seen.clone();
            store.subscribe(move |state: &i32| seen.lock().unwrap().push(*state));
        }

        store.update(|count| *count = 5);

        assert_eq!(*seen.lock().unwrap(), vec![5, 5]);
    }

    #[test]
    fn unsubscribed_callbacks_are_not_called() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = calls.clone();
            store.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.update(|count| *count += 1);
        assert!(store.unsubscribe(id));
        store.update(|count| *count += 1);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn subscribers_may_read_the_store() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(None));
        {
            let reader = store.clone();
            let seen = seen.clone();
            store.subscribe(move |_| *seen.lock().unwrap() = Some(reader.snapshot()));
        }

        store.update(|count| *count = 3);

        assert_eq!(*seen.lock().unwrap(), Some(3));
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(String::new());
        let other = store.clone();

        other.update(|text| text.push_str("hello"));

        assert_eq!(store.snapshot(), "hello");
    }
}
