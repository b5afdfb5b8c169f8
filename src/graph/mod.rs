//! State/transition graph used by machines.

mod structure;

pub use structure::GraphStructure;
