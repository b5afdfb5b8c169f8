//! Registry resolving declaration kinds to state and transition factories.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use std::collections::HashMap;
use std::sync::Arc;

type StateFactory = Arc<dyn Fn() -> Arc<dyn State> + Send + Sync>;
type TransitionFactory = Arc<dyn Fn() -> TransitionBuilder + Send + Sync>;

/// Mapping from kind identifiers to factories, resolved at build time.
///
/// Transition factories run once per built machine, so every machine owns its
/// own transition instances and their per-attempt bookkeeping.
///
/// # Example
///
/// ```rust
/// use overstated::builder::{Registry, TransitionBuilder};
/// use overstated::core::SimpleState;
///
/// let registry = Registry::new()
///     .register_state("draft", || SimpleState::new("draft"))
///     .register_state("published", || SimpleState::new("published"))
///     .register_transition("publish", || {
///         TransitionBuilder::new("publish").from("draft").to("published")
///     });
///
/// assert_eq!(registry.state("draft").unwrap().id(), "draft");
/// assert!(registry.state("archived").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    states: HashMap<String, StateFactory>,
    transitions: HashMap<String, TransitionFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state factory under `kind`, replacing any previous one.
    pub fn register_state<S, F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        S: State + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.states.insert(
            kind.into(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn State>),
        );
        self
    }

    /// Register a transition factory under `kind`, replacing any previous one.
    pub fn register_transition<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> TransitionBuilder + Send + Sync + 'static,
    {
        self.transitions.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Instantiate the state registered under `kind`.
    pub fn state(&self, kind: &str) -> Result<Arc<dyn State>, BuildError> {
        self.states
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| BuildError::UnknownStateKind(kind.to_string()))
    }

    /// Instantiate the transition registered under `kind`.
    pub fn transition(&self, kind: &str) -> Result<TransitionBuilder, BuildError> {
        self.transitions
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| BuildError::UnknownTransitionKind(kind.to_string()))
    }

    pub fn has_state_kind(&self, kind: &str) -> bool {
        self.states.contains_key(kind)
    }

    pub fn has_transition_kind(&self, kind: &str) -> bool {
        self.transitions.contains_key(kind)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut states: Vec<&String> = self.states.keys().collect();
        let mut transitions: Vec<&String> = self.transitions.keys().collect();
        states.sort();
        transitions.sort();
        f.debug_struct("Registry")
            .field("states", &states)
            .field("transitions", &transitions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SimpleState;

    fn registry() -> Registry {
        Registry::new()
            .register_state("draft", || SimpleState::new("draft"))
            .register_transition("publish", || {
                TransitionBuilder::new("publish").from("draft").to("published")
            })
    }

    #[test]
    fn resolves_registered_kinds() {
        let registry = registry();

        assert_eq!(registry.state("draft").unwrap().id(), "draft");
        assert_eq!(registry.transition("publish").unwrap().id(), "publish");
        assert!(registry.has_state_kind("draft"));
        assert!(registry.has_transition_kind("publish"));
    }

    #[test]
    fn unknown_kinds_fail_fast() {
        let registry = registry();

        assert_eq!(
            registry.state("published").unwrap_err(),
            BuildError::UnknownStateKind("published".to_string())
        );
        assert!(matches!(
            registry.transition("archive"),
            Err(BuildError::UnknownTransitionKind(kind)) if kind == "archive"
        ));
    }

    #[test]
    fn transition_factory_yields_fresh_instances() {
        let registry = registry();

        let mut first = registry.transition("publish").unwrap().build().unwrap();
        first.add_error("stale");
        let second = registry.transition("publish").unwrap().build().unwrap();

        assert!(second.errors().is_empty());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = registry().register_state("draft", || SimpleState::new("brouillon"));

        assert_eq!(registry.state("draft").unwrap().id(), "brouillon");
    }
}
