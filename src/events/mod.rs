//! Event notification around machine lifecycle.
//!
//! Machines depend only on the listen/fire/forget contract of
//! [`EventDispatcher`]. Topic namespacing (`<machine id>.<topic>`) is done by
//! the machine, never by the dispatcher, so several machine types can share a
//! single bus without collisions.
//!
//! Events fire synchronously. A listener runs while the machine that fired
//! is still mutably borrowed, so it cannot drive that machine again; hosts
//! that need a follow-up transition must queue it and apply it after the
//! current call returns.

mod dispatcher;

pub use dispatcher::Dispatcher;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Topic fired after a committed transition.
pub const TRANSITION: &str = "transition";

/// Topic a machine listens to for an external initialization signal.
pub const INITIALISE: &str = "initialise";

/// Prefix of topics fired after a handled state operation.
pub const HANDLED: &str = "handled";

/// Callback registered for a topic.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Pub-sub transport keyed by string topic.
pub trait EventDispatcher: Send + Sync {
    fn listen(&self, topic: &str, listener: Listener);

    fn fire(&self, topic: &str, event: &Event);

    /// Drop every listener registered under each of `topics`.
    fn forget(&self, topics: &[&str]);

    /// Drop one listener, identified by its `Arc`, from `topic`.
    ///
    /// Returns `false` when the listener was not found or the transport
    /// cannot remove single listeners, which is the default.
    fn forget_listener(&self, topic: &str, listener: &Listener) -> bool {
        let _ = (topic, listener);
        false
    }
}

/// Event delivered to listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Id of the machine that fired the event
    pub machine_id: String,
    pub kind: EventKind,
}

/// Payload of an [`Event`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Request to initialize the machine, optionally at a given state
    Initialise { state: Option<String> },

    /// A transition committed
    Transition {
        from: String,
        to: String,
        transition: String,
        arguments: Value,
    },

    /// A state operation ran through `Machine::handle`
    Handled {
        state: String,
        operation: String,
        result: Value,
    },

    /// Host-defined event fired through `Machine::fire`
    Custom { name: String, payload: Value },
}
