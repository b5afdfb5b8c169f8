//! Validation rules attached to states.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Predicate evaluated against the value of one entity field.
///
/// The argument is `None` when the field is absent from the snapshot.
pub type RuleCheck = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

static NO_RULES: RuleSet = RuleSet::new();

/// A single field rule with the message reported when it fails.
#[derive(Clone)]
pub struct Rule {
    field: String,
    message: String,
    check: RuleCheck,
}

impl Rule {
    /// Create a rule from an arbitrary predicate over the field value.
    pub fn new<F>(field: impl Into<String>, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        Self {
            field: field.into(),
            message: message.into(),
            check: Arc::new(check),
        }
    }

    /// The field must be present and non-empty.
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("The {} field is required.", field);
        Self::new(field, message, |value| match value {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        })
    }

    /// The field, when present, must be at least `min` long.
    ///
    /// Strings are measured in characters, arrays in elements and numbers by value.
    pub fn min(field: impl Into<String>, min: usize) -> Self {
        let field = field.into();
        let message = format!("The {} must be at least {}.", field, min);
        Self::new(field, message, move |value| match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.chars().count() >= min,
            Some(Value::Array(items)) => items.len() >= min,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n >= min as f64),
            Some(_) => false,
        })
    }

    /// The field, when present, must equal one of `allowed`.
    pub fn one_of(field: impl Into<String>, allowed: Vec<Value>) -> Self {
        let field = field.into();
        let message = format!("The selected {} is invalid.", field);
        Self::new(field, message, move |value| match value {
            None | Some(Value::Null) => true,
            Some(v) => allowed.contains(v),
        })
    }

    /// Replace the failure message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Evaluate the rule against an entity snapshot.
    ///
    /// Dotted field names address nested objects (`customer.email`).
    pub fn check(&self, entity: &Value) -> Validation<(), NonEmptyVec<String>> {
        if (self.check)(lookup(entity, &self.field)) {
            Validation::success(())
        } else {
            Validation::fail(self.message.clone())
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("field", &self.field)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

fn lookup<'a>(entity: &'a Value, field: &str) -> Option<&'a Value> {
    if field.contains('.') {
        let pointer: String = field
            .split('.')
            .map(|part| format!("/{}", part.replace('~', "~0").replace('/', "~1")))
            .collect();
        entity.pointer(&pointer)
    } else {
        entity.get(field)
    }
}

/// Ordered collection of rules a state imposes on its entity.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Shared empty rule set, used by states without rules.
    pub fn empty() -> &'static RuleSet {
        &NO_RULES
    }

    /// Add a rule, builder style.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Evaluate every rule, accumulating ALL failure messages in rule order.
    pub fn enforce(&self, entity: &Value) -> Validation<(), NonEmptyVec<String>> {
        if self.rules.is_empty() {
            return Validation::success(());
        }

        let checks: Vec<Validation<(), NonEmptyVec<String>>> =
            self.rules.iter().map(|rule| rule.check(entity)).collect();

        Validation::all_vec(checks).map(|_| ())
    }
}
