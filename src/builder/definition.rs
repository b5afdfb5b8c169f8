//! Declarative machine definitions loaded from JSON.

use crate::builder::error::BuildError;
use serde::{Deserialize, Serialize};

/// One entry of a definition's state list.
///
/// Either a bare registry kind or an object flagging the initial state:
///
/// ```json
/// ["draft", { "kind": "review", "initial": true }, "published"]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateDeclaration {
    Kind(String),
    Detailed {
        kind: String,
        #[serde(default)]
        initial: bool,
    },
}

impl StateDeclaration {
    pub fn kind(&self) -> &str {
        match self {
            Self::Kind(kind) | Self::Detailed { kind, .. } => kind,
        }
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Detailed { initial: true, .. })
    }
}

impl From<&str> for StateDeclaration {
    fn from(kind: &str) -> Self {
        Self::Kind(kind.to_string())
    }
}

/// Ordered state and transition kinds making up one machine.
///
/// Kinds are resolved through a [`Registry`](crate::builder::Registry) by
/// [`MachineBuilder::from_definition`](crate::builder::MachineBuilder::from_definition).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub states: Vec<StateDeclaration>,
    #[serde(default)]
    pub transitions: Vec<String>,
}

impl MachineDefinition {
    /// Parse a definition from JSON.
    ///
    /// # Example
    ///
    /// ```rust
    /// use overstated::builder::MachineDefinition;
    ///
    /// let definition = MachineDefinition::from_json(r#"{
    ///     "id": "document",
    ///     "states": ["draft", { "kind": "published" }],
    ///     "transitions": ["publish"]
    /// }"#).unwrap();
    ///
    /// assert_eq!(definition.id.as_deref(), Some("document"));
    /// assert_eq!(definition.states.len(), 2);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }
}
