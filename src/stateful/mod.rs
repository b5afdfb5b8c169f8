//! Explicit composition of machines onto a host entity.
//!
//! A host entity keeps one state key per field. [`Machines`] maps each field
//! to the machine driving it; after a committed transition the new key is
//! written back through [`Entity::set_state_field`]. Persisting the entity
//! stays with the host.
//!
//! # Example
//!
//! ```rust
//! use overstated::builder::{MachineDefinition, Registry, TransitionBuilder};
//! use overstated::core::SimpleState;
//! use overstated::events::Dispatcher;
//! use overstated::stateful::{Entity, Machines};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! let registry = Registry::new()
//!     .register_state("draft", || SimpleState::new("draft"))
//!     .register_state("published", || SimpleState::new("published"))
//!     .register_transition("publish", || {
//!         TransitionBuilder::new("publish").from("draft").to("published")
//!     });
//!
//! let mut definitions = BTreeMap::new();
//! definitions.insert(
//!     "status".to_string(),
//!     MachineDefinition::from_json(r#"{ "states": ["draft", "published"], "transitions": ["publish"] }"#)
//!         .unwrap(),
//! );
//!
//! let mut article = json!({ "title": "Hello", "status": "" });
//! let mut machines =
//!     Machines::from_definitions(&article, &definitions, &registry, Arc::new(Dispatcher::new()))
//!         .unwrap();
//!
//! machines.transit("status", "publish", json!({}), &mut article).unwrap();
//! assert_eq!(article.state_field("status").as_deref(), Some("published"));
//! ```

use crate::builder::{MachineBuilder, MachineDefinition, Registry};
use crate::events::EventDispatcher;
use crate::machine::{Element, Machine, MachineError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Host object carrying one or more state-key fields.
pub trait Entity {
    /// Serializable view validated against state rules.
    fn snapshot(&self) -> Value;

    /// Current state key stored in `field`, if any.
    fn state_field(&self, field: &str) -> Option<String>;

    /// Store the state key a machine moved to.
    fn set_state_field(&mut self, field: &str, state: &str);
}

/// A JSON object is its own snapshot; state keys live in string members.
impl Entity for Value {
    fn snapshot(&self) -> Value {
        self.clone()
    }

    fn state_field(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Value::as_str).map(str::to_string)
    }

    fn set_state_field(&mut self, field: &str, state: &str) {
        if let Value::Object(map) = self {
            map.insert(field.to_string(), Value::String(state.to_string()));
        }
    }
}

/// Machines keyed by the entity field they drive.
#[derive(Debug, Default)]
pub struct Machines {
    machines: BTreeMap<String, Machine>,
}

impl Machines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and initialize one machine per field.
    ///
    /// A definition without an id is named after its field. Each machine is
    /// linked to `entity` and initialized from the field's current key, or
    /// from its designated initial state when the field is empty.
    pub fn from_definitions<E: Entity + ?Sized>(
        entity: &E,
        definitions: &BTreeMap<String, MachineDefinition>,
        registry: &Registry,
        events: Arc<dyn EventDispatcher>,
    ) -> Result<Self, MachineError> {
        let mut machines = Self::new();
        for (field, definition) in definitions {
            let mut builder = MachineBuilder::from_definition(definition, registry)?;
            if definition.id.is_none() {
                builder = builder.id(field.clone());
            }
            let mut machine = builder.entity(entity).events(Arc::clone(&events)).build()?;

            let current = entity.state_field(field).filter(|key| !key.is_empty());
            machine.initialize(current.as_deref())?;
            machines.insert(field.clone(), machine);
        }
        Ok(machines)
    }

    /// Attach a machine to `field`, returning the one it replaces.
    pub fn insert(&mut self, field: impl Into<String>, machine: Machine) -> Option<Machine> {
        self.machines.insert(field.into(), machine)
    }

    pub fn get(&self, field: &str) -> Result<&Machine, MachineError> {
        self.machines
            .get(field)
            .ok_or_else(|| MachineError::not_found(Element::Machine, field))
    }

    pub fn get_mut(&mut self, field: &str) -> Result<&mut Machine, MachineError> {
        self.machines
            .get_mut(field)
            .ok_or_else(|| MachineError::not_found(Element::Machine, field))
    }

    /// Fields with an attached machine, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Run `transition` on the machine driving `field` and write the new
    /// state key back to `entity`.
    ///
    /// The machine validates against a fresh snapshot of `entity`. On failure
    /// the entity is left untouched.
    pub fn transit<E: Entity + ?Sized>(
        &mut self,
        field: &str,
        transition: &str,
        arguments: Value,
        entity: &mut E,
    ) -> Result<(), MachineError> {
        let machine = self.get_mut(field)?;
        machine.link_entity(entity);
        machine.transition_with(transition, arguments)?;

        if let Some(state) = machine.state_id() {
            debug!(machine = machine.id(), field, state, "entity state field updated");
            entity.set_state_field(field, state);
        }
        Ok(())
    }

    /// Run a state operation on the machine driving `field`.
    pub fn handle(
        &mut self,
        field: &str,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, MachineError> {
        self.get_mut(field)?.handle(operation, args)
    }
}
