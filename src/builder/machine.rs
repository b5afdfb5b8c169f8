//! Builder for constructing machines.

use crate::builder::definition::MachineDefinition;
use crate::builder::error::BuildError;
use crate::builder::registry::Registry;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::events::{Dispatcher, EventDispatcher};
use crate::graph::GraphStructure;
use crate::machine::{machine_id_for, Machine};
use crate::stateful::Entity;
use crate::validation::{RuleValidator, Validator};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Id used when neither an explicit id nor a host type is given.
pub const DEFAULT_MACHINE_ID: &str = "machine";

/// Builder for constructing machines with a fluent API.
///
/// States and transitions are registered in declaration order at
/// [`build`](Self::build) time; the first state is the initial state unless
/// another one is declared with [`initial_state`](Self::initial_state).
///
/// # Example
///
/// ```rust
/// use overstated::builder::{MachineBuilder, TransitionBuilder};
/// use overstated::core::SimpleState;
///
/// let mut machine = MachineBuilder::new()
///     .id("document")
///     .state(SimpleState::new("draft"))
///     .state(SimpleState::new("published"))
///     .transition(TransitionBuilder::new("publish").from("draft").to("published"))
///     .build()
///     .unwrap();
///
/// machine.initialize(None).unwrap();
/// machine.transition("publish").unwrap();
/// assert_eq!(machine.state_id(), Some("published"));
/// assert_eq!(machine.history().departed(), vec!["draft"]);
/// ```
pub struct MachineBuilder {
    id: Option<String>,
    states: Vec<(Arc<dyn State>, bool)>,
    transitions: Vec<TransitionBuilder>,
    events: Option<Arc<dyn EventDispatcher>>,
    validator: Option<Arc<dyn Validator>>,
    model: Value,
}

impl MachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            id: None,
            states: Vec::new(),
            transitions: Vec::new(),
            events: None,
            validator: None,
            model: Value::Object(Map::new()),
        }
    }

    /// Create a builder whose id defaults to [`machine_id_for::<T>()`](machine_id_for).
    pub fn for_type<T: ?Sized>() -> Self {
        Self::new().id(machine_id_for::<T>())
    }

    /// Resolve a declarative definition through `registry`.
    ///
    /// Unknown kinds fail here, before anything is built.
    pub fn from_definition(
        definition: &MachineDefinition,
        registry: &Registry,
    ) -> Result<Self, BuildError> {
        let mut builder = Self::new();
        if let Some(id) = &definition.id {
            builder = builder.id(id.clone());
        }

        for declaration in &definition.states {
            let state = registry.state(declaration.kind())?;
            builder.states.push((state, declaration.is_initial()));
        }
        for kind in &definition.transitions {
            builder = builder.transition(registry.transition(kind)?);
        }
        Ok(builder)
    }

    /// Set the machine id used to namespace event topics.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Declare a state.
    pub fn state<S: State + 'static>(self, state: S) -> Self {
        self.shared_state(Arc::new(state))
    }

    /// Declare a state instance shared with other machines.
    pub fn shared_state(mut self, state: Arc<dyn State>) -> Self {
        self.states.push((state, false));
        self
    }

    /// Declare the state the machine starts in.
    pub fn initial_state<S: State + 'static>(mut self, state: S) -> Self {
        self.states.push((Arc::new(state), true));
        self
    }

    /// Declare a state by registry kind.
    pub fn state_kind(mut self, kind: &str, registry: &Registry) -> Result<Self, BuildError> {
        self.states.push((registry.state(kind)?, false));
        Ok(self)
    }

    /// Declare a transition.
    pub fn transition(mut self, builder: TransitionBuilder) -> Self {
        self.transitions.push(builder);
        self
    }

    /// Declare a transition by registry kind.
    pub fn transition_kind(self, kind: &str, registry: &Registry) -> Result<Self, BuildError> {
        Ok(self.transition(registry.transition(kind)?))
    }

    /// Event bus to fire on. Defaults to a private [`Dispatcher`].
    pub fn events(mut self, events: Arc<dyn EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validation collaborator. Defaults to [`RuleValidator`].
    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Link the entity whose snapshot guards and validation rules inspect.
    pub fn entity<E: Entity + ?Sized>(mut self, entity: &E) -> Self {
        self.model = entity.snapshot();
        self
    }

    /// Link a raw entity snapshot.
    pub fn model(mut self, model: Value) -> Self {
        self.model = model;
        self
    }

    /// Build the machine.
    /// Returns an error if no state is declared or a declaration is inconsistent.
    pub fn build(self) -> Result<Machine, BuildError> {
        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let mut structure = GraphStructure::new();
        for (state, initial) in self.states {
            structure.add_state(state, initial)?;
        }
        for builder in self.transitions {
            structure.add_transition(builder.build()?)?;
        }

        let id = self.id.unwrap_or_else(|| DEFAULT_MACHINE_ID.to_string());
        debug!(
            machine = %id,
            states = structure.state_count(),
            transitions = structure.transitions().count(),
            initial = structure.initial_key(),
            "machine built"
        );

        Ok(Machine::new(
            id,
            structure,
            self.events.unwrap_or_else(|| Arc::new(Dispatcher::new())),
            self.validator.unwrap_or_else(|| Arc::new(RuleValidator)),
            self.model,
        ))
    }
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MachineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineBuilder")
            .field("id", &self.id)
            .field(
                "states",
                &self.states.iter().map(|(s, _)| s.id()).collect::<Vec<_>>(),
            )
            .field("transitions", &self.transitions)
            .finish()
    }
}
