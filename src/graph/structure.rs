//! Graph of states and transitions backed by petgraph.

use crate::builder::BuildError;
use crate::core::State;
use crate::machine::{Element, MachineError, Transition};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::Arc;

/// States as graph nodes, transitions as edges.
///
/// Node weights hold the state object, edge weights the key of the
/// transition that created the edge. Undirected transitions are stored as a
/// pair of opposite directed edges.
pub struct GraphStructure {
    graph: DiGraph<Arc<dyn State>, String>,
    nodes: HashMap<String, NodeIndex>,
    transitions: Vec<Transition>,
    transition_index: HashMap<String, usize>,
    initial: Option<String>,
    explicit_initial: bool,
}

impl GraphStructure {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            transitions: Vec::new(),
            transition_index: HashMap::new(),
            initial: None,
            explicit_initial: false,
        }
    }

    /// Register a state under its own key.
    ///
    /// The first registered state becomes the initial state unless another
    /// state is flagged `initial`. At most one state may carry the flag.
    pub fn add_state(&mut self, state: Arc<dyn State>, initial: bool) -> Result<(), BuildError> {
        let key = state.id().to_string();
        if self.nodes.contains_key(&key) {
            return Err(BuildError::DuplicateState(key));
        }

        if initial {
            if self.explicit_initial {
                return Err(BuildError::MultipleInitialStates {
                    first: self.initial.clone().unwrap_or_default(),
                    second: key,
                });
            }
            self.initial = Some(key.clone());
            self.explicit_initial = true;
        } else if self.initial.is_none() {
            self.initial = Some(key.clone());
        }

        let index = self.graph.add_node(state);
        self.nodes.insert(key, index);
        Ok(())
    }

    /// Get a registered state by key.
    pub fn state(&self, key: &str) -> Result<&Arc<dyn State>, MachineError> {
        self.nodes
            .get(key)
            .map(|&index| &self.graph[index])
            .ok_or_else(|| MachineError::not_found(Element::State, key))
    }

    pub fn has_state(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Register a transition and create its edges.
    ///
    /// Every endpoint must already be registered; the structure is left
    /// untouched when any check fails.
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), BuildError> {
        let key = transition.id().to_string();
        if self.transition_index.contains_key(&key) {
            return Err(BuildError::DuplicateTransition(key));
        }
        if transition.is_undirected() && transition.from().len() != 1 {
            return Err(BuildError::UndirectedFanIn {
                transition: key,
                origins: transition.from().len(),
            });
        }

        let to = self.node_for(&key, transition.to())?;
        let mut origins = Vec::with_capacity(transition.from().len());
        for origin in transition.from() {
            origins.push(self.node_for(&key, origin)?);
        }

        for from in origins {
            self.graph.add_edge(from, to, key.clone());
            if transition.is_undirected() && from != to {
                self.graph.add_edge(to, from, key.clone());
            }
        }

        self.transition_index.insert(key, self.transitions.len());
        self.transitions.push(transition);
        Ok(())
    }

    fn node_for(&self, transition: &str, state: &str) -> Result<NodeIndex, BuildError> {
        self.nodes
            .get(state)
            .copied()
            .ok_or_else(|| BuildError::UnknownState {
                transition: transition.to_string(),
                state: state.to_string(),
            })
    }

    /// Get a registered transition by key.
    pub fn transition(&self, key: &str) -> Result<&Transition, MachineError> {
        self.transition_index
            .get(key)
            .map(|&i| &self.transitions[i])
            .ok_or_else(|| MachineError::not_found(Element::Transition, key))
    }

    pub(crate) fn transition_mut(&mut self, key: &str) -> Result<&mut Transition, MachineError> {
        match self.transition_index.get(key) {
            Some(&i) => Ok(&mut self.transitions[i]),
            None => Err(MachineError::not_found(Element::Transition, key)),
        }
    }

    /// True iff an edge leads from `from` to `to`.
    ///
    /// Unknown keys have no edges.
    pub fn can_transition_from(&self, from: &str, to: &str) -> bool {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// True iff the transition `key` created an edge from `from` to `to`.
    ///
    /// Stricter than [`can_transition_from`](Self::can_transition_from): an
    /// edge laid down by another transition between the same states does not
    /// count.
    pub fn transition_connects(&self, key: &str, from: &str, to: &str) -> bool {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(&a), Some(&b)) => self
                .graph
                .edges_connecting(a, b)
                .any(|edge| edge.weight() == key),
            _ => false,
        }
    }

    /// Keys of the transitions whose edges leave `key`, in declaration order.
    pub fn transition_keys_from(&self, key: &str) -> Vec<&str> {
        let Some(&index) = self.nodes.get(key) else {
            return Vec::new();
        };

        let mut keys: Vec<&str> = self
            .graph
            .edges(index)
            .map(|edge| edge.weight().as_str())
            .collect();
        keys.sort_by_key(|key| self.transition_index.get(*key).copied());
        keys.dedup();
        keys
    }

    /// Keys of the states directly reachable from `key`, in declaration order.
    pub fn transitions_from(&self, key: &str) -> Vec<&str> {
        let Some(&index) = self.nodes.get(key) else {
            return Vec::new();
        };

        let mut targets: Vec<NodeIndex> = self.graph.neighbors(index).collect();
        targets.sort();
        targets.dedup();
        targets
            .into_iter()
            .map(|target| self.graph[target].id())
            .collect()
    }

    /// Resolve the state a machine starts in.
    ///
    /// An explicit `key` wins over the designated initial state.
    pub fn initial_state(&self, key: Option<&str>) -> Result<&Arc<dyn State>, MachineError> {
        match key.or(self.initial.as_deref()) {
            Some(key) => self.state(key),
            None => Err(MachineError::Uninitialized),
        }
    }

    /// Key of the designated initial state, if any state was registered.
    pub fn initial_key(&self) -> Option<&str> {
        self.initial.as_deref()
    }

    /// State keys in declaration order.
    pub fn state_keys(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index].id())
            .collect()
    }

    /// Transitions in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for GraphStructure {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GraphStructure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStructure")
            .field("states", &self.state_keys())
            .field(
                "transitions",
                &self.transitions.iter().map(Transition::id).collect::<Vec<_>>(),
            )
            .field("initial", &self.initial)
            .finish()
    }
}
