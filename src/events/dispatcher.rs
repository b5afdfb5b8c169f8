//! In-memory, synchronous event dispatcher.

use super::{Event, EventDispatcher, Listener};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Topic-keyed listener registry.
///
/// Listeners are called synchronously, in registration order, on the thread
/// that fires. The listener list is cloned out of the lock before calling, so
/// a listener may itself listen, fire or forget without deadlocking.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners registered for `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, topic: &str) -> bool {
        self.listener_count(topic) > 0
    }
}

impl EventDispatcher for Dispatcher {
    fn listen(&self, topic: &str, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(listener);
    }

    fn fire(&self, topic: &str, event: &Event) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
            .unwrap_or_default();

        tracing::trace!(topic, listeners = listeners.len(), "firing event");

        for listener in listeners {
            listener(event);
        }
    }

    fn forget(&self, topics: &[&str]) {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for topic in topics {
            listeners.remove(*topic);
        }
    }

    fn forget_listener(&self, topic: &str, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(topic) else {
            return false;
        };

        let before = registered.len();
        registered.retain(|candidate| !Arc::ptr_eq(candidate, listener));
        let removed = registered.len() != before;
        if registered.is_empty() {
            listeners.remove(topic);
        }
        removed
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut topics: Vec<&String> = listeners.keys().collect();
        topics.sort();
        f.debug_struct("Dispatcher").field("topics", &topics).finish()
    }
}
