//! Builder API for assembling machines.
//!
//! Machines are assembled either fluently from state instances and
//! [`TransitionBuilder`]s, or declaratively from a [`MachineDefinition`]
//! whose kinds resolve through a [`Registry`].

pub mod definition;
pub mod error;
pub mod machine;
pub mod registry;
pub mod transition;

pub use definition::{MachineDefinition, StateDeclaration};
pub use error::BuildError;
pub use machine::{MachineBuilder, DEFAULT_MACHINE_ID};
pub use registry::Registry;
pub use transition::TransitionBuilder;
