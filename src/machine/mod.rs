//! Runtime machines and their transitions.

mod error;
#[allow(clippy::module_inception)]
mod machine;
mod transition;

pub use error::{Element, MachineError};
pub use machine::{machine_id_for, Machine};
pub use transition::Transition;
