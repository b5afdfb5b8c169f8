//! Errors raised while driving a machine.

use crate::builder::BuildError;
use crate::core::HandleError;
use std::fmt;
use thiserror::Error;

/// Kind of element a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    State,
    Transition,
    Machine,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "state",
            Self::Transition => "transition",
            Self::Machine => "machine",
        })
    }
}

/// Errors returned by machine operations.
///
/// None are retried internally; retry policy belongs to the host.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("machine is not initialised")]
    Uninitialized,

    #[error("{element} '{key}' not found")]
    NotFound { element: Element, key: String },

    /// No edge leads from the current state to the destination.
    #[error("transition '{transition}' to state '{destination}' is impossible from state '{current}'")]
    IllegalTransition {
        transition: String,
        destination: String,
        current: String,
    },

    /// The guard or the destination's validation rules rejected the transition.
    ///
    /// `message` is the last accumulated message; `messages` holds all of them.
    #[error("{message}")]
    TransitionRejected {
        transition: String,
        message: String,
        messages: Vec<String>,
    },

    /// The linked entity does not satisfy a state's validation rules.
    #[error("entity is invalid for state '{state}': {}", .messages.join("; "))]
    ValidationFailed { state: String, messages: Vec<String> },

    #[error("state '{state}' failed to handle '{operation}': {source}")]
    Handle {
        state: String,
        operation: String,
        #[source]
        source: HandleError,
    },

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl MachineError {
    pub(crate) fn not_found(element: Element, key: &str) -> Self {
        Self::NotFound {
            element,
            key: key.to_string(),
        }
    }

    /// Every message carried by a rejection or validation failure.
    ///
    /// Empty for the other kinds.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::TransitionRejected { messages, .. } | Self::ValidationFailed { messages, .. } => {
                messages
            }
            _ => &[],
        }
    }
}
