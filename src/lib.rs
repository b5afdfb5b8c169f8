//! OverStated: a finite-state-machine transition engine for entity lifecycles.
//!
//! A machine is a directed graph of named states connected by named
//! transitions. Moving along an edge is checked twice: structurally (an edge
//! must lead from the active state to the destination) and by business rules
//! (guards on the transition plus the destination state's validation rules,
//! checked against the linked entity). Only a transition that passes both is
//! committed to the history and announced on the event bus.
//!
//! # Core Concepts
//!
//! - **State**: host-defined node implementing the `State` trait
//! - **Transition**: named edge from one or more origins to one destination
//! - **Guard**: business check that vetoes a transition with messages
//! - **History**: ordered record of departed states
//! - **Events**: namespaced `transition`, `initialise` and `handled.*` topics
//!
//! # Example
//!
//! ```rust
//! use overstated::builder::{MachineBuilder, TransitionBuilder};
//! use overstated::core::{Guard, SimpleState};
//! use overstated::MachineError;
//! use serde_json::json;
//!
//! let mut machine = MachineBuilder::new()
//!     .id("document")
//!     .state(SimpleState::new("draft"))
//!     .state(SimpleState::new("published"))
//!     .transition(
//!         TransitionBuilder::new("publish")
//!             .from("draft")
//!             .to("published")
//!             .when(Guard::require("missing title", |ctx| ctx.field("title").is_some())),
//!     )
//!     .build()
//!     .unwrap();
//!
//! machine.initialize(None).unwrap();
//!
//! let err = machine.transition("publish").unwrap_err();
//! assert!(matches!(err, MachineError::TransitionRejected { .. }));
//! assert_eq!(machine.state_id(), Some("draft"));
//!
//! machine.set_model(json!({ "title": "Hello" }));
//! machine.transition("publish").unwrap();
//! assert_eq!(machine.history().departed(), vec!["draft"]);
//! ```

pub mod builder;
pub mod core;
pub mod events;
pub mod graph;
pub mod machine;
pub mod stateful;
pub mod validation;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, MachineDefinition, Registry, TransitionBuilder};
pub use core::{Guard, Guardable, SimpleState, State, StateHistory, TransitionContext};
pub use events::{Dispatcher, Event, EventDispatcher, EventKind};
pub use machine::{Machine, MachineError, Transition};
pub use stateful::{Entity, Machines};
