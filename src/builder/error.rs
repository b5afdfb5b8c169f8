//! Build errors for machine and transition builders.

use thiserror::Error;

/// Errors that can occur while assembling a machine definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("transition '{0}' has no origin state. Call .from(state)")]
    MissingOrigin(String),

    #[error("transition '{0}' has no destination state. Call .to(state)")]
    MissingDestination(String),

    #[error("state '{0}' is declared more than once")]
    DuplicateState(String),

    #[error("transition '{0}' is declared more than once")]
    DuplicateTransition(String),

    #[error("transition '{transition}' references undeclared state '{state}'")]
    UnknownState { transition: String, state: String },

    #[error("states '{first}' and '{second}' are both flagged as initial")]
    MultipleInitialStates { first: String, second: String },

    #[error("undirected transition '{transition}' must have exactly one origin, found {origins}")]
    UndirectedFanIn { transition: String, origins: usize },

    #[error("no state kind '{0}' is registered")]
    UnknownStateKind(String),

    #[error("no transition kind '{0}' is registered")]
    UnknownTransitionKind(String),

    #[error("no states declared. Add at least one state")]
    NoStates,

    #[error("invalid machine definition: {0}")]
    InvalidDefinition(String),
}

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::InvalidDefinition(err.to_string())
    }
}
