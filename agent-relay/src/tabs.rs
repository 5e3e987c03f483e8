//! Registry of open pages known to the coordinator.
//!
//! Push messages go to whichever tab is active in the focused window at the
//! moment they are sent, not to the tab that caused them.

use crate::protocol::Message;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Identifier of a browser tab.
pub type TabId = u32;

#[derive(Debug, Default)]
struct Inner {
    inboxes: HashMap<TabId, flume::Sender<Message>>,
    active: Option<TabId>,
}

/// Open tabs and the currently active one.
#[derive(Debug, Default)]
pub struct TabRegistry {
    inner: Mutex<Inner>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tab and return the receiver for its push messages.
    /// Re-opening a tab replaces its previous inbox.
    pub fn open(&self, tab: TabId) -> flume::Receiver<Message> {
        let (tx, rx) = flume::unbounded();
        self.inner.lock().inboxes.insert(tab, tx);
        rx
    }

    /// Mark `tab` as the active tab of the focused window.
    pub fn activate(&self, tab: TabId) {
        let mut inner = self.inner.lock();
        if inner.inboxes.contains_key(&tab) {
            inner.active = Some(tab);
        } else {
            tracing::warn!("Ignoring activation of unknown tab {tab}");
        }
    }

    /// Unregister a tab. Closing the active tab leaves no tab active.
    pub fn close(&self, tab: TabId) {
        let mut inner = self.inner.lock();
        inner.inboxes.remove(&tab);
        if inner.active == Some(tab) {
            inner.active = None;
        }
    }

    pub fn active(&self) -> Option<TabId> {
        self.inner.lock().active
    }

    pub fn len(&self) -> usize {
        self.inner.lock().inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `message` to the tab that is active right now.
    ///
    /// Returns `false` when no tab is active or its page has gone away.
    pub fn push_to_active(&self, message: Message) -> bool {
        let inner = self.inner.lock();
        let Some(tab) = inner.active else {
            return false;
        };
        match inner.inboxes.get(&tab) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(text: &str) -> Message {
        Message::ShowOverlay {
            explanation: text.into(),
        }
    }

    #[test]
    fn test_push_requires_active_tab() {
        let tabs = TabRegistry::new();
        let rx = tabs.open(1);
        assert!(!tabs.push_to_active(overlay("x")));

        tabs.activate(1);
        assert!(tabs.push_to_active(overlay("x")));
        assert_eq!(rx.try_recv().unwrap(), overlay("x"));
    }

    #[test]
    fn test_push_follows_activation() {
        let tabs = TabRegistry::new();
        let first = tabs.open(1);
        let second = tabs.open(2);

        tabs.activate(1);
        tabs.activate(2);
        assert!(tabs.push_to_active(overlay("late")));
        assert!(first.try_recv().is_err());
        assert_eq!(second.try_recv().unwrap(), overlay("late"));
    }

    #[test]
    fn test_close_active_tab() {
        let tabs = TabRegistry::new();
        let _rx = tabs.open(7);
        tabs.activate(7);
        tabs.close(7);
        assert_eq!(tabs.active(), None);
        assert!(tabs.is_empty());
        assert!(!tabs.push_to_active(overlay("x")));
    }

    #[test]
    fn test_dropped_page_fails_push() {
        let tabs = TabRegistry::new();
        let rx = tabs.open(3);
        tabs.activate(3);
        drop(rx);
        assert!(!tabs.push_to_active(overlay("x")));
    }

    #[test]
    fn test_activate_unknown_tab_is_ignored() {
        let tabs = TabRegistry::new();
        tabs.activate(9);
        assert_eq!(tabs.active(), None);
    }
}
