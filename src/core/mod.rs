//! Core state machine types.
//!
//! This module contains the building blocks shared by every machine:
//! - States and their validation contract via the `State` and `Validatable` traits
//! - Business guards via the `Guardable` trait and the closure-based `Guard`
//! - The borrowed `TransitionContext` handed to guards
//! - Append-only history tracking

mod context;
mod guard;
mod history;
mod state;

pub use context::TransitionContext;
pub use guard::{Guard, Guardable};
pub use history::{HistoryEntry, StateHistory};
pub use state::{HandleError, SimpleState, State, Validatable};
