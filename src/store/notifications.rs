//! Messages shown to the user until they are dismissed.

use serde::{Deserialize, Serialize};

use crate::store::Store;

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Something finished as expected.
    Success,
    /// Something failed.
    Error,
    /// Something the user should know about.
    Info,
    /// Something that may need attention.
    Warning,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifies the notification for dismissal.
    pub id: u64,
    /// How the notification should be presented.
    pub kind: NotificationKind,
    /// The text shown to the user.
    pub message: String,
}

/// The notifications currently shown, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    /// The notifications currently shown.
    pub items: Vec<Notification>,
    next_id: u64,
}

impl Store<Notifications> {
    /// Show a new notification and return its ID.
    pub fn push(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        let message = message.into();

        self.update(|notifications| {
            notifications.next_id += 1;
            let id = notifications.next_id;
            notifications.items.push(Notification { id, kind, message });

            id
        })
    }

    /// Remove the notification `id`. Returns `false` if it was not shown.
    pub fn dismiss(&self, id: u64) -> bool {
        self.update(|notifications| {
            let count_before = notifications.items.len();
            notifications.items.retain(|notification| notification.id != id);

            notifications.items.len() != count_before
        })
    }

    /// Remove every notification.
    pub fn clear(&self) {
        self.update(|notifications| notifications.items.clear());
    }
}

#[cfg(test)]
mod notification_store_tests {
    use crate::store::{NotificationKind, Notifications, Store};

    #[test]
    fn push_assigns_unique_ids() {
        let store = Store::<Notifications>::default();

        let first = store.push(NotificationKind::Success, "Saved");
        let second = store.push(NotificationKind::Error, "Failed");

        assert_ne!(first, second);
        let messages: Vec<String> = store
            .snapshot()
            .items
            .into_iter()
            .map(|notification| notification.message)
            .collect();
        assert_eq!(messages, ["Saved", "Failed"]);
    }

    #[test]
    fn dismiss_removes_only_that_notification() {
        let store = Store::<Notifications>::default();
        let first = store.push(NotificationKind::Info, "One");
        store.push(NotificationKind::Info, "Two");

        assert!(store.dismiss(first));
        assert!(!store.dismiss(first));
        assert_eq!(store.snapshot().items.len(), 1);
    }

    #[test]
    fn ids_are_not_reused_after_clear() {
        let store = Store::<Notifications>::default();
        let first = store.push(NotificationKind::Warning, "One");

        store.clear();
        let second = store.push(NotificationKind::Warning, "Two");

        assert!(store.snapshot().items.len() == 1 && second != first);
    }
}
