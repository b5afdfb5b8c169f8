//! Business-rule guards for transitions.
//!
//! A guard inspects the candidate transition and pushes human-readable
//! messages onto the transition's error accumulator to reject it. Guards run
//! after the structural check and before any state mutation.

use super::context::TransitionContext;

/// Capability of vetoing a transition with error messages.
///
/// Implementations must not mutate anything visible to the machine: the same
/// hook runs for speculative checks such as
/// [`Machine::transitions`](crate::machine::Machine::transitions).
pub trait Guardable: Send + Sync {
    /// Push one message onto `errors` per violated business rule.
    fn validates_transition(&self, context: &TransitionContext<'_>, errors: &mut Vec<String>);
}

type GuardCheck = Box<dyn Fn(&TransitionContext<'_>) -> Result<(), String> + Send + Sync>;

/// Guard built from a closure.
///
/// # Example
///
/// ```rust
/// use overstated::core::{Guard, Guardable, StateHistory, TransitionContext};
/// use serde_json::json;
///
/// let guard = Guard::require("missing title", |ctx: &TransitionContext<'_>| {
///     ctx.field("title").is_some()
/// });
///
/// let entity = json!({});
/// let history = StateHistory::new();
/// let ctx = TransitionContext {
///     machine_id: "document",
///     transition: "publish",
///     from: "draft",
///     to: "published",
///     arguments: &json!(null),
///     entity: &entity,
///     history: &history,
/// };
///
/// let mut errors = Vec::new();
/// guard.validates_transition(&ctx, &mut errors);
/// assert_eq!(errors, vec!["missing title".to_string()]);
/// ```
pub struct Guard {
    check: GuardCheck,
}

impl Guard {
    /// Create a guard from a check returning the rejection message on failure.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&TransitionContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Guard {
            check: Box::new(check),
        }
    }

    /// Create a guard from a predicate and the message reported when it is false.
    pub fn require<F>(message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TransitionContext<'_>) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        Guard::new(move |ctx| {
            if predicate(ctx) {
                Ok(())
            } else {
                Err(message.clone())
            }
        })
    }

    /// Check the guard directly, without an accumulator.
    pub fn check(&self, context: &TransitionContext<'_>) -> Result<(), String> {
        (self.check)(context)
    }
}

impl Guardable for Guard {
    fn validates_transition(&self, context: &TransitionContext<'_>, errors: &mut Vec<String>) {
        if let Err(message) = self.check(context) {
            errors.push(message);
        }
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}
