//! State trait for the nodes of a machine graph.
//!
//! States are host-defined objects. The engine only needs a stable key, the
//! rules an entity must satisfy to enter the state, and an optional handler
//! for named operations dispatched through [`Machine::handle`].
//!
//! [`Machine::handle`]: crate::machine::Machine::handle

use crate::validation::RuleSet;
use serde_json::Value;
use std::fmt::Debug;
use thiserror::Error;

/// Errors a state handler may report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandleError {
    #[error("operation '{operation}' is not supported by this state")]
    Unsupported { operation: String },

    #[error("{0}")]
    Failed(String),
}

/// Capability of declaring validation rules for entities entering a state.
///
/// Default implementation declares no rules.
pub trait Validatable {
    fn validation_rules(&self) -> &RuleSet {
        RuleSet::empty()
    }
}

/// A named node in the transition graph.
///
/// Identity is the key returned by [`State::id`]: two states with the same key
/// are the same state, whichever instance holds it. Instances are immutable
/// once built and may be shared across machines built from one definition.
///
/// # Example
///
/// ```rust
/// use overstated::core::{HandleError, State, Validatable};
/// use overstated::validation::{Rule, RuleSet};
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct Published {
///     rules: RuleSet,
/// }
///
/// impl Validatable for Published {
///     fn validation_rules(&self) -> &RuleSet {
///         &self.rules
///     }
/// }
///
/// impl State for Published {
///     fn id(&self) -> &str {
///         "published"
///     }
///
///     fn handle(&self, operation: &str, _args: &[Value]) -> Result<Option<Value>, HandleError> {
///         match operation {
///             "is_public" => Ok(Some(json!(true))),
///             _ => Err(HandleError::Unsupported { operation: operation.to_string() }),
///         }
///     }
/// }
///
/// let state = Published { rules: RuleSet::new().rule(Rule::required("title")) };
/// assert_eq!(state.id(), "published");
/// assert_eq!(state.validation_rules().len(), 1);
/// ```
pub trait State: Validatable + Debug + Send + Sync {
    /// Stable key, unique within one machine definition.
    fn id(&self) -> &str;

    /// Run a named operation on this state.
    ///
    /// Returning `Ok(None)` reports success without a value. The default
    /// implementation supports no operations.
    fn handle(&self, operation: &str, args: &[Value]) -> Result<Option<Value>, HandleError> {
        let _ = args;
        Err(HandleError::Unsupported {
            operation: operation.to_string(),
        })
    }
}

/// Plain state identified by key, with an optional rule set.
///
/// Covers the common case where a state carries no behavior of its own.
#[derive(Clone, Debug)]
pub struct SimpleState {
    id: String,
    rules: RuleSet,
}

impl SimpleState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: RuleSet::new(),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}

impl Validatable for SimpleState {
    fn validation_rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl State for SimpleState {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Rule;
    use serde_json::json;

    #[derive(Debug)]
    struct Draft;

    impl Validatable for Draft {}

    impl State for Draft {
        fn id(&self) -> &str {
            "draft"
        }

        fn handle(&self, operation: &str, args: &[Value]) -> Result<Option<Value>, HandleError> {
            match operation {
                "echo" => Ok(args.first().cloned()),
                "explode" => Err(HandleError::Failed("boom".to_string())),
                _ => Err(HandleError::Unsupported {
                    operation: operation.to_string(),
                }),
            }
        }
    }

    #[test]
    fn state_id_returns_key() {
        assert_eq!(Draft.id(), "draft");
        assert_eq!(SimpleState::new("archived").id(), "archived");
    }

    #[test]
    fn default_rules_are_empty() {
        assert!(Draft.validation_rules().is_empty());
        assert!(SimpleState::new("x").validation_rules().is_empty());
    }

    #[test]
    fn simple_state_carries_rules() {
        let state = SimpleState::new("published").with_rules(
            RuleSet::new()
                .rule(Rule::required("title"))
                .rule(Rule::required("body")),
        );

        assert_eq!(state.validation_rules().len(), 2);
    }

    #[test]
    fn handle_dispatches_by_operation_name() {
        assert_eq!(Draft.handle("echo", &[json!(7)]), Ok(Some(json!(7))));
        assert_eq!(Draft.handle("echo", &[]), Ok(None));
        assert_eq!(
            Draft.handle("explode", &[]),
            Err(HandleError::Failed("boom".to_string()))
        );
    }

    #[test]
    fn default_handle_is_unsupported() {
        let err = SimpleState::new("x").handle("anything", &[]).unwrap_err();
        assert_eq!(
            err,
            HandleError::Unsupported {
                operation: "anything".to_string()
            }
        );
    }
}
