//! Transitions: named edges with a guard and per-attempt bookkeeping.

use crate::core::{Guardable, TransitionContext};
use crate::validation::{failure_messages, RuleSet, Validator};
use serde_json::{Map, Value};
use std::mem;

/// A named edge from one or more origin states to one destination.
///
/// The argument bag and the error accumulator belong to the current attempt:
/// both are reset every time the machine starts executing the transition.
/// Build with [`TransitionBuilder`](crate::builder::TransitionBuilder).
pub struct Transition {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) from: Vec<String>,
    pub(crate) to: String,
    pub(crate) undirected: bool,
    pub(crate) guards: Vec<Box<dyn Guardable>>,
    pub(crate) arguments: Value,
    pub(crate) errors: Vec<String>,
    pub(crate) valid: bool,
}

impl Transition {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human name, falling back to the key.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn from(&self) -> &[String] {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn is_undirected(&self) -> bool {
        self.undirected
    }

    /// Arguments of the current (or last) attempt.
    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    /// Messages accumulated by the last guard check.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Outcome of the last guard check; `true` until a check fails.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Drain the accumulated messages, leaving the accumulator empty.
    pub fn take_errors(&mut self) -> Vec<String> {
        mem::take(&mut self.errors)
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Where this transition leads when taken from `current`.
    ///
    /// Origins lead to the destination. An undirected transition taken from
    /// its destination leads back to its single origin.
    pub fn destination_from(&self, current: &str) -> Option<&str> {
        if self.from.iter().any(|origin| origin == current) {
            Some(self.to.as_str())
        } else if self.undirected && self.to == current {
            self.from.first().map(String::as_str)
        } else {
            None
        }
    }

    /// Start a new attempt: store the arguments, clear errors and validity.
    pub(crate) fn begin_attempt(&mut self, arguments: Value) {
        self.arguments = normalize_arguments(arguments);
        self.errors.clear();
        self.valid = true;
    }

    /// Run the guards, then the validator on the destination's rules.
    ///
    /// Pure with respect to the transition: messages are returned, not stored.
    pub(crate) fn evaluate(
        &self,
        context: &TransitionContext<'_>,
        rules: &RuleSet,
        validator: &dyn Validator,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        for guard in &self.guards {
            guard.validates_transition(context, &mut errors);
        }
        errors.extend(failure_messages(validator.validate(context.entity, rules)));
        errors
    }

    /// Store the outcome of a check and report whether it passed.
    pub(crate) fn record_check(&mut self, errors: Vec<String>) -> bool {
        self.errors.extend(errors);
        self.valid = self.errors.is_empty();
        self.valid
    }
}

/// Absent arguments become an empty object so guards can always index them.
pub(crate) fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("undirected", &self.undirected)
            .field("guards", &self.guards.len())
            .field("errors", &self.errors)
            .finish()
    }
}
