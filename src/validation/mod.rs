//! Validation collaborator for candidate states.
//!
//! A state declares the rules its entity must satisfy; before a transition
//! commits, the machine asks a [`Validator`] to check the linked entity
//! snapshot against the *destination* state's rules. Every failure message is
//! kept, using Stillwater's `Validation` to accumulate instead of fail fast.
//!
//! # Example
//!
//! ```rust
//! use overstated::validation::{Rule, RuleSet, RuleValidator, Validator};
//! use serde_json::json;
//!
//! let rules = RuleSet::new()
//!     .rule(Rule::required("title"))
//!     .rule(Rule::min("body", 10));
//!
//! let result = RuleValidator.validate(&json!({ "body": "short" }), &rules);
//! assert!(result.is_failure());
//! ```

pub mod rules;

pub use rules::{Rule, RuleCheck, RuleSet};

use serde_json::Value;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Checks an entity snapshot against a rule set.
///
/// Implementations must be synchronous and free of side effects visible to
/// the machine: the same call is used for speculative checks.
pub trait Validator: Send + Sync {
    fn validate(&self, entity: &Value, rules: &RuleSet) -> Validation<(), NonEmptyVec<String>>;
}

/// Default validator that evaluates each [`Rule`] predicate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate(&self, entity: &Value, rules: &RuleSet) -> Validation<(), NonEmptyVec<String>> {
        rules.enforce(entity)
    }
}

/// Flatten a validation outcome into its failure messages.
pub fn failure_messages(result: Validation<(), NonEmptyVec<String>>) -> Vec<String> {
    match result {
        Validation::Success(_) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}
