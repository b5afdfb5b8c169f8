//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::Guardable;
use crate::machine::Transition;
use serde_json::{Map, Value};

/// Builder for constructing transitions with a fluent API.
///
/// # Example
///
/// ```rust
/// use overstated::builder::TransitionBuilder;
/// use overstated::core::Guard;
///
/// let publish = TransitionBuilder::new("publish")
///     .from("draft")
///     .from("review")
///     .to("published")
///     .when(Guard::require("missing title", |ctx| ctx.field("title").is_some()))
///     .build()
///     .unwrap();
///
/// assert_eq!(publish.from(), ["draft".to_string(), "review".to_string()]);
/// assert_eq!(publish.to(), "published");
/// ```
pub struct TransitionBuilder {
    id: String,
    name: Option<String>,
    description: Option<String>,
    from: Vec<String>,
    to: Option<String>,
    undirected: bool,
    guards: Vec<Box<dyn Guardable>>,
}

impl TransitionBuilder {
    /// Create a builder for the transition registered under `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            from: Vec::new(),
            to: None,
            undirected: false,
            guards: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add an origin state (at least one required).
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from.push(state.into());
        self
    }

    /// Set the destination state (required).
    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to = Some(state.into());
        self
    }

    /// Make the edge traversable in both directions.
    pub fn undirected(mut self) -> Self {
        self.undirected = true;
        self
    }

    /// Add a business guard (optional, may be repeated).
    ///
    /// Guards run in the order they were added.
    pub fn when<G>(mut self, guard: G) -> Self
    where
        G: Guardable + 'static,
    {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Build the transition.
    /// Returns an error if the origin or destination is missing.
    pub fn build(self) -> Result<Transition, BuildError> {
        if self.from.is_empty() {
            return Err(BuildError::MissingOrigin(self.id));
        }
        let to = self.to.ok_or_else(|| BuildError::MissingDestination(self.id.clone()))?;

        Ok(Transition {
            id: self.id,
            name: self.name,
            description: self.description,
            from: self.from,
            to,
            undirected: self.undirected,
            guards: self.guards,
            arguments: Value::Object(Map::new()),
            errors: Vec::new(),
            valid: true,
        })
    }
}

impl std::fmt::Debug for TransitionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionBuilder")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("undirected", &self.undirected)
            .field("guards", &self.guards.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Guard;

    #[test]
    fn builder_validates_required_fields() {
        let result = TransitionBuilder::new("publish").to("published").build();
        assert!(matches!(result, Err(BuildError::MissingOrigin(id)) if id == "publish"));

        let result = TransitionBuilder::new("publish").from("draft").build();
        assert!(matches!(result, Err(BuildError::MissingDestination(id)) if id == "publish"));
    }

    #[test]
    fn fluent_api_builds_transition() {
        let transition = TransitionBuilder::new("publish")
            .from("draft")
            .to("published")
            .when(Guard::require("never", |_| false))
            .build()
            .unwrap();

        assert_eq!(transition.id(), "publish");
        assert_eq!(transition.from(), ["draft".to_string()]);
        assert_eq!(transition.to(), "published");
        assert!(!transition.is_undirected());
        assert!(transition.is_valid());
        assert_eq!(transition.guards.len(), 1);
    }

    #[test]
    fn undirected_flag_is_carried() {
        let transition = TransitionBuilder::new("link")
            .from("a")
            .to("b")
            .undirected()
            .build()
            .unwrap();

        assert!(transition.is_undirected());
    }

    #[test]
    fn last_destination_wins() {
        let transition = TransitionBuilder::new("go")
            .from("a")
            .to("b")
            .to("c")
            .build()
            .unwrap();

        assert_eq!(transition.to(), "c");
    }
}
