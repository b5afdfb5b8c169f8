//! The machine: active state, history and the transition algorithm.

use super::error::MachineError;
use super::transition::{normalize_arguments, Transition};
use crate::core::{HistoryEntry, State, StateHistory, TransitionContext};
use crate::events::{self, Event, EventDispatcher, EventKind, Listener};
use crate::graph::GraphStructure;
use crate::stateful::Entity;
use crate::validation::{failure_messages, Validator};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Initialization requested through the `initialise` event, not yet applied.
type PendingInit = Arc<Mutex<Option<Option<String>>>>;

/// Default machine id derived from a host type: the lowercased type name
/// without its module path or generic parameters.
///
/// ```rust
/// mod orders {
///     pub struct OrderMachine;
/// }
///
/// assert_eq!(overstated::machine::machine_id_for::<orders::OrderMachine>(), "ordermachine");
/// ```
pub fn machine_id_for<T: ?Sized>() -> String {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name).to_lowercase()
}

/// Runtime orchestrator binding a graph definition to one entity's state.
///
/// A machine is single-threaded: every operation runs to completion before
/// returning and nothing is locked internally. Hosts sharing one machine
/// between callers must serialize access themselves.
pub struct Machine {
    id: String,
    instance: Uuid,
    structure: GraphStructure,
    state: Option<Arc<dyn State>>,
    history: StateHistory,
    events: Arc<dyn EventDispatcher>,
    validator: Arc<dyn Validator>,
    model: Value,
    pending_init: PendingInit,
    init_armed: Arc<AtomicBool>,
    init_listener: Option<Listener>,
}

impl Machine {
    /// Assemble a machine around a finished structure.
    ///
    /// Registers the one-shot `<id>.initialise` listener.
    pub(crate) fn new(
        id: String,
        structure: GraphStructure,
        events: Arc<dyn EventDispatcher>,
        validator: Arc<dyn Validator>,
        model: Value,
    ) -> Self {
        let mut machine = Self {
            id,
            instance: Uuid::new_v4(),
            structure,
            state: None,
            history: StateHistory::new(),
            events,
            validator,
            model,
            pending_init: Arc::new(Mutex::new(None)),
            init_armed: Arc::new(AtomicBool::new(true)),
            init_listener: None,
        };

        let slot = Arc::clone(&machine.pending_init);
        let armed = Arc::clone(&machine.init_armed);
        let listener: Listener = Arc::new(move |event: &Event| {
            if !armed.load(Ordering::Acquire) {
                return;
            }
            if let EventKind::Initialise { state } = &event.kind {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
            }
        });
        machine.listen(events::INITIALISE, Arc::clone(&listener));
        machine.init_listener = Some(listener);

        machine
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Random id distinguishing machines built from the same definition.
    pub fn instance_id(&self) -> Uuid {
        self.instance
    }

    pub fn structure(&self) -> &GraphStructure {
        &self.structure
    }

    /// The active state, `None` before initialization.
    pub fn state(&self) -> Option<&Arc<dyn State>> {
        self.state.as_ref()
    }

    pub fn state_id(&self) -> Option<&str> {
        self.state.as_deref().map(|state| state.id())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Snapshot of the linked entity used for validation.
    pub fn model(&self) -> &Value {
        &self.model
    }

    pub fn set_model(&mut self, model: Value) {
        self.model = model;
    }

    /// Refresh the validation snapshot from a host entity.
    pub fn link_entity<E: Entity + ?Sized>(&mut self, entity: &E) {
        self.model = entity.snapshot();
    }

    /// Set the active state to `state`, or to the designated initial state.
    ///
    /// Calling this again later re-assigns the active state but keeps the
    /// history recorded so far.
    /// [`StateHistory::path`] then covers the new run only; see
    /// [`StateHistory::runs`].
    pub fn initialize(&mut self, state: Option<&str>) -> Result<(), MachineError> {
        let initial = Arc::clone(self.structure.initial_state(state)?);

        if self.state.is_some() && !self.history.is_empty() {
            warn!(
                machine = %self.id,
                instance = %self.instance,
                state = initial.id(),
                history = self.history.len(),
                "re-initialising machine; history is kept"
            );
        }
        debug!(machine = %self.id, instance = %self.instance, state = initial.id(), "initialised");

        self.state = Some(initial);
        self.stop_awaiting_init();
        Ok(())
    }

    /// Unregister this instance's `initialise` listener only.
    ///
    /// Other machines sharing the id and the bus keep theirs. The listener is
    /// disarmed first, so it stays inert on dispatchers that cannot remove a
    /// single listener.
    fn stop_awaiting_init(&mut self) {
        if let Some(listener) = self.init_listener.take() {
            self.init_armed.store(false, Ordering::Release);
            let topic = self.topic(events::INITIALISE);
            if !self.events.forget_listener(&topic, &listener) {
                trace!(
                    machine = %self.id,
                    instance = %self.instance,
                    topic = %topic,
                    "initialise listener left disarmed"
                );
            }
        }
        self.pending_init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Apply an initialization requested through the `initialise` event.
    ///
    /// Returns `true` when a pending request was applied. Runs automatically
    /// at the start of [`transition`](Self::transition) and [`handle`](Self::handle).
    pub fn poll_initialise(&mut self) -> Result<bool, MachineError> {
        let pending = self
            .pending_init
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match pending {
            Some(state) => {
                self.initialize(state.as_deref())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Execute a transition without arguments.
    pub fn transition(&mut self, key: &str) -> Result<(), MachineError> {
        self.transition_with(key, Value::Object(Map::new()))
    }

    /// Execute a transition, exposing `arguments` to its guards.
    ///
    /// Nothing observable changes unless the structural check and the guard
    /// both pass; only then is the departed state appended to the history,
    /// the destination activated and the `transition` event fired. The event
    /// fires after the history append.
    pub fn transition_with(&mut self, key: &str, arguments: Value) -> Result<(), MachineError> {
        self.poll_initialise()?;

        self.structure.transition_mut(key)?.begin_attempt(arguments);

        let current = match &self.state {
            Some(state) => state.id().to_string(),
            None => return Err(MachineError::Uninitialized),
        };

        let transition = self.structure.transition(key)?;
        let destination = match transition.destination_from(&current) {
            Some(to) if self.structure.transition_connects(key, &current, to) => to.to_string(),
            _ => {
                return Err(MachineError::IllegalTransition {
                    transition: key.to_string(),
                    destination: transition.to().to_string(),
                    current,
                })
            }
        };

        let errors = self.evaluate(transition, &current, &destination, transition.arguments())?;
        let transition = self.structure.transition_mut(key)?;
        if !transition.record_check(errors) {
            let messages = transition.errors().to_vec();
            let message = messages
                .last()
                .cloned()
                .unwrap_or_else(|| format!("transition '{}' was rejected", key));
            debug!(
                machine = %self.id,
                instance = %self.instance,
                transition = key,
                from = %current,
                errors = messages.len(),
                "transition rejected"
            );
            return Err(MachineError::TransitionRejected {
                transition: key.to_string(),
                message,
                messages,
            });
        }
        let arguments = transition.arguments().clone();

        let next = Arc::clone(self.structure.state(&destination)?);
        self.history.record(HistoryEntry {
            from: current.clone(),
            to: destination.clone(),
            transition: key.to_string(),
            timestamp: chrono::Utc::now(),
        });
        self.state = Some(next);

        debug!(
            machine = %self.id,
            instance = %self.instance,
            transition = key,
            from = %current,
            to = %destination,
            "transition committed"
        );

        self.fire(
            events::TRANSITION,
            EventKind::Transition {
                from: current,
                to: destination,
                transition: key.to_string(),
                arguments,
            },
        );
        Ok(())
    }

    /// Guard messages for taking `transition` from `from` to `to`.
    fn evaluate(
        &self,
        transition: &Transition,
        from: &str,
        to: &str,
        arguments: &Value,
    ) -> Result<Vec<String>, MachineError> {
        let destination = self.structure.state(to)?;
        let context = TransitionContext {
            machine_id: &self.id,
            transition: transition.id(),
            from,
            to,
            arguments,
            entity: &self.model,
            history: &self.history,
        };
        Ok(transition.evaluate(
            &context,
            destination.validation_rules(),
            self.validator.as_ref(),
        ))
    }

    /// Run a transition's guard against the active state with empty
    /// arguments and record the outcome on the transition, without
    /// committing anything.
    ///
    /// Messages stay on the transition until the next attempt or
    /// [`take_transition_errors`](Self::take_transition_errors).
    pub fn check_can_transit(&mut self, key: &str) -> Result<bool, MachineError> {
        self.check_can_transit_with(key, Value::Object(Map::new()))
    }

    /// Like [`check_can_transit`](Self::check_can_transit), with `arguments`
    /// exposed to the guards.
    ///
    /// Starts a new attempt: arguments and messages of earlier calls are
    /// discarded.
    pub fn check_can_transit_with(
        &mut self,
        key: &str,
        arguments: Value,
    ) -> Result<bool, MachineError> {
        let current = self.state_id().ok_or(MachineError::Uninitialized)?.to_string();
        self.structure.transition_mut(key)?.begin_attempt(arguments);

        let transition = self.structure.transition(key)?;
        let destination = transition
            .destination_from(&current)
            .unwrap_or(transition.to())
            .to_string();
        let errors = self.evaluate(transition, &current, &destination, transition.arguments())?;

        Ok(self.structure.transition_mut(key)?.record_check(errors))
    }

    /// Drain the messages accumulated on a transition.
    pub fn take_transition_errors(&mut self, key: &str) -> Result<Vec<String>, MachineError> {
        Ok(self.structure.transition_mut(key)?.take_errors())
    }

    /// Keys of the transitions that can be taken from the active state.
    ///
    /// With `only_valid`, guards and validation run speculatively against
    /// empty arguments; nothing is recorded and no event fires.
    pub fn transitions(&self, only_valid: bool) -> Result<Vec<&str>, MachineError> {
        let current = self.state_id().ok_or(MachineError::Uninitialized)?;
        let arguments = normalize_arguments(Value::Null);

        let mut available = Vec::new();
        for key in self.structure.transition_keys_from(current) {
            let transition = self.structure.transition(key)?;
            let Some(to) = transition.destination_from(current) else {
                continue;
            };
            if only_valid {
                let errors = self.evaluate(transition, current, to, &arguments)?;
                trace!(
                    machine = %self.id,
                    transition = transition.id(),
                    errors = errors.len(),
                    "speculative guard check"
                );
                if !errors.is_empty() {
                    continue;
                }
            }
            available.push(transition.id());
        }
        Ok(available)
    }

    /// Keys of the states directly reachable from the active state.
    pub fn reachable_states(&self) -> Result<Vec<&str>, MachineError> {
        let current = self.state_id().ok_or(MachineError::Uninitialized)?;
        Ok(self.structure.transitions_from(current))
    }

    /// Run a named operation on the active state and fire `handled.<name>`.
    ///
    /// A handler that returns no value yields `true`.
    pub fn handle(&mut self, operation: &str, args: &[Value]) -> Result<Value, MachineError> {
        self.poll_initialise()?;

        let state = Arc::clone(self.state.as_ref().ok_or(MachineError::Uninitialized)?);
        let result = state
            .handle(operation, args)
            .map_err(|source| MachineError::Handle {
                state: state.id().to_string(),
                operation: operation.to_string(),
                source,
            })?
            .unwrap_or(Value::Bool(true));

        debug!(machine = %self.id, state = state.id(), operation, "handled");

        self.fire(
            &format!("{}.{}", events::HANDLED, operation),
            EventKind::Handled {
                state: state.id().to_string(),
                operation: operation.to_string(),
                result: result.clone(),
            },
        );
        Ok(result)
    }

    /// Validate the linked entity against a state's rules.
    ///
    /// Uses the active state when `state` is `None`.
    pub fn validates(&self, state: Option<&str>) -> Result<(), MachineError> {
        let target = match state {
            Some(key) => self.structure.state(key)?,
            None => self.state.as_ref().ok_or(MachineError::Uninitialized)?,
        };

        let messages = failure_messages(
            self.validator
                .validate(&self.model, target.validation_rules()),
        );
        if messages.is_empty() {
            Ok(())
        } else {
            Err(MachineError::ValidationFailed {
                state: target.id().to_string(),
                messages,
            })
        }
    }

    /// Whether the linked entity satisfies a state's rules.
    pub fn is_model_valid(&self, state: Option<&str>) -> bool {
        self.validates(state).is_ok()
    }

    /// Namespace `topic` with this machine's id.
    pub fn topic(&self, topic: &str) -> String {
        format!("{}.{}", self.id, topic)
    }

    pub fn fire(&self, topic: &str, kind: EventKind) {
        let event = Event {
            machine_id: self.id.clone(),
            kind,
        };
        self.events.fire(&self.topic(topic), &event);
    }

    pub fn listen(&self, topic: &str, listener: Listener) {
        self.events.listen(&self.topic(topic), listener);
    }

    pub fn forget(&self, topics: &[&str]) {
        let namespaced: Vec<String> = topics.iter().map(|topic| self.topic(topic)).collect();
        let namespaced: Vec<&str> = namespaced.iter().map(String::as_str).collect();
        self.events.forget(&namespaced);
    }

    /// Whether a transition key is declared, regardless of the active state.
    pub fn has_transition(&self, key: &str) -> bool {
        self.structure.transition(key).is_ok()
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.stop_awaiting_init();
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.id)
            .field("instance", &self.instance)
            .field("state", &self.state_id())
            .field("history", &self.history.departed())
            .field("structure", &self.structure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MachineBuilder, TransitionBuilder};
    use crate::core::{Guard, HandleError, SimpleState, Validatable};
    use crate::events::Dispatcher;
    use crate::machine::Element;
    use crate::validation::{Rule, RuleSet};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Counter;

    impl Validatable for Counter {}

    impl State for Counter {
        fn id(&self) -> &str {
            "counter"
        }

        fn handle(&self, operation: &str, args: &[Value]) -> Result<Option<Value>, HandleError> {
            match operation {
                "double" => Ok(Some(json!(args[0].as_i64().unwrap_or(0) * 2))),
                "noop" => Ok(None),
                _ => Err(HandleError::Unsupported {
                    operation: operation.to_string(),
                }),
            }
        }
    }

    fn document(guard: Option<Guard>) -> MachineBuilder {
        let mut publish = TransitionBuilder::new("publish")
            .from("draft")
            .to("published");
        if let Some(guard) = guard {
            publish = publish.when(guard);
        }
        MachineBuilder::new()
            .id("document")
            .state(SimpleState::new("draft"))
            .state(SimpleState::new("published"))
            .state(SimpleState::new("archived"))
            .transition(publish)
            .transition(
                TransitionBuilder::new("archive")
                    .from("published")
                    .to("archived"),
            )
    }

    #[test]
    fn machine_id_for_strips_path_and_generics() {
        struct OrderMachine;
        struct Wrapper<T>(T);

        assert_eq!(machine_id_for::<OrderMachine>(), "ordermachine");
        assert_eq!(machine_id_for::<Wrapper<OrderMachine>>(), "wrapper");
    }

    #[test]
    fn initialize_uses_designated_initial_state() {
        let mut machine = document(None).build().unwrap();
        assert!(!machine.is_initialized());

        machine.initialize(None).unwrap();

        assert_eq!(machine.state_id(), Some("draft"));
        assert!(machine.history().is_empty());
    }

    #[test]
    fn initialize_with_override_and_unknown_state() {
        let mut machine = document(None).build().unwrap();

        machine.initialize(Some("published")).unwrap();
        assert_eq!(machine.state_id(), Some("published"));

        let err = machine.initialize(Some("deleted")).unwrap_err();
        assert!(matches!(err, MachineError::NotFound { element: Element::State, .. }));
        assert_eq!(machine.state_id(), Some("published"));
    }

    #[test]
    fn transition_before_initialize_is_uninitialized() {
        let mut machine = document(None).build().unwrap();

        let err = machine.transition("publish").unwrap_err();
        assert!(matches!(err, MachineError::Uninitialized));
    }

    #[test]
    fn unknown_transition_is_not_found_even_before_initialize() {
        let mut machine = document(None).build().unwrap();

        let err = machine.transition("teleport").unwrap_err();
        assert!(matches!(
            err,
            MachineError::NotFound { element: Element::Transition, .. }
        ));
    }

    #[test]
    fn committed_transition_records_history_and_fires_event() {
        let bus = Arc::new(Dispatcher::new());
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        bus.listen(
            "document.transition",
            Arc::new(move |event: &Event| sink.lock().unwrap().push(event.clone())),
        );

        let mut machine = document(None).events(bus).build().unwrap();
        machine.initialize(None).unwrap();
        machine
            .transition_with("publish", json!({ "by": "editor" }))
            .unwrap();

        assert_eq!(machine.state_id(), Some("published"));
        assert_eq!(machine.history().departed(), vec!["draft"]);

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(
            fired[0].kind,
            EventKind::Transition {
                from: "draft".to_string(),
                to: "published".to_string(),
                transition: "publish".to_string(),
                arguments: json!({ "by": "editor" }),
            }
        );
    }

    #[test]
    fn illegal_transition_skips_guard_and_changes_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut machine = MachineBuilder::new()
            .state(SimpleState::new("draft"))
            .state(SimpleState::new("published"))
            .state(SimpleState::new("archived"))
            .transition(
                TransitionBuilder::new("archive")
                    .from("published")
                    .to("archived")
                    .when(Guard::new(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })),
            )
            .build()
            .unwrap();
        machine.initialize(None).unwrap();

        let err = machine.transition("archive").unwrap_err();

        assert!(matches!(
            err,
            MachineError::IllegalTransition { ref current, ref destination, .. }
                if current == "draft" && destination == "archived"
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(machine.state_id(), Some("draft"));
        assert!(machine.history().is_empty());
    }

    #[test]
    fn rejected_transition_keeps_state_history_and_messages() {
        let mut machine = document(Some(Guard::require("missing title", |ctx| {
            ctx.field("title").is_some()
        })))
        .build()
        .unwrap();
        machine.initialize(None).unwrap();

        let err = machine.transition("publish").unwrap_err();

        match &err {
            MachineError::TransitionRejected {
                message, messages, ..
            } => {
                assert_eq!(message, "missing title");
                assert_eq!(messages, &vec!["missing title".to_string()]);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(machine.state_id(), Some("draft"));
        assert!(machine.history().is_empty());

        assert_eq!(
            machine.take_transition_errors("publish").unwrap(),
            vec!["missing title".to_string()]
        );
        assert!(machine.take_transition_errors("publish").unwrap().is_empty());
    }

    #[test]
    fn destination_rules_are_validated_against_model() {
        let mut machine = MachineBuilder::new()
            .state(SimpleState::new("draft"))
            .state(
                SimpleState::new("published").with_rules(
                    RuleSet::new()
                        .rule(Rule::required("title"))
                        .rule(Rule::required("body")),
                ),
            )
            .transition(TransitionBuilder::new("publish").from("draft").to("published"))
            .model(json!({ "title": "Hello" }))
            .build()
            .unwrap();
        machine.initialize(None).unwrap();

        let err = machine.transition("publish").unwrap_err();
        assert_eq!(err.messages(), ["The body field is required.".to_string()]);

        machine.set_model(json!({ "title": "Hello", "body": "World" }));
        machine.transition("publish").unwrap();
        assert_eq!(machine.state_id(), Some("published"));
    }

    #[test]
    fn guard_sees_arguments_of_current_attempt_only() {
        let mut machine = document(Some(Guard::require("confirm first", |ctx| {
            ctx.argument("confirm") == Some(&json!(true))
        })))
        .build()
        .unwrap();
        machine.initialize(None).unwrap();

        machine
            .transition_with("publish", json!({ "confirm": false }))
            .unwrap_err();
        machine
            .transition_with("publish", json!({ "confirm": true }))
            .unwrap();

        let publish = machine.structure().transition("publish").unwrap();
        assert!(publish.errors().is_empty());
        assert_eq!(publish.arguments(), &json!({ "confirm": true }));
    }

    #[test]
    fn transitions_lists_available_and_valid_keys() {
        let mut machine = MachineBuilder::new()
            .state(SimpleState::new("draft"))
            .state(SimpleState::new("published"))
            .state(SimpleState::new("trashed"))
            .transition(
                TransitionBuilder::new("publish")
                    .from("draft")
                    .to("published")
                    .when(Guard::require("never", |_| false)),
            )
            .transition(TransitionBuilder::new("trash").from("draft").to("trashed"))
            .transition(TransitionBuilder::new("restore").from("trashed").to("draft"))
            .build()
            .unwrap();
        machine.initialize(None).unwrap();

        assert_eq!(machine.transitions(false).unwrap(), vec!["publish", "trash"]);
        assert_eq!(machine.transitions(true).unwrap(), vec!["trash"]);
        assert_eq!(machine.reachable_states().unwrap(), vec!["published", "trashed"]);

        assert!(machine
            .structure()
            .transition("publish")
            .unwrap()
            .errors()
            .is_empty());
        assert!(machine.history().is_empty());
    }

    #[test]
    fn speculative_checks_fire_no_events() {
        let bus = Arc::new(Dispatcher::new());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        bus.listen(
            "document.transition",
            Arc::new(move |_: &Event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let mut machine = document(None).events(bus).build().unwrap();
        machine.initialize(None).unwrap();

        machine.transitions(true).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn check_can_transit_records_errors_without_committing() {
        let mut machine = document(Some(Guard::require("not yet", |_| false)))
            .build()
            .unwrap();
        machine.initialize(None).unwrap();

        assert!(!machine.check_can_transit("publish").unwrap());
        assert_eq!(machine.state_id(), Some("draft"));

        let publish = machine.structure().transition("publish").unwrap();
        assert!(!publish.is_valid());
        assert_eq!(publish.errors(), ["not yet".to_string()]);
    }

    #[test]
    fn reinitialize_keeps_history() {
        let mut machine = document(None).build().unwrap();
        machine.initialize(None).unwrap();
        machine.transition("publish").unwrap();

        machine.initialize(None).unwrap();

        assert_eq!(machine.state_id(), Some("draft"));
        assert_eq!(machine.history().departed(), vec!["draft"]);
    }

    #[test]
    fn initialise_event_applies_once() {
        let bus = Arc::new(Dispatcher::new());
        let mut machine = document(None).events(bus.clone()).build().unwrap();
        assert!(bus.has_listeners("document.initialise"));

        let signal = |state: Option<&str>| Event {
            machine_id: "document".to_string(),
            kind: EventKind::Initialise {
                state: state.map(str::to_string),
            },
        };

        bus.fire("document.initialise", &signal(Some("published")));
        assert!(machine.poll_initialise().unwrap());
        assert_eq!(machine.state_id(), Some("published"));
        assert!(!bus.has_listeners("document.initialise"));

        bus.fire("document.initialise", &signal(None));
        assert!(!machine.poll_initialise().unwrap());
        assert_eq!(machine.state_id(), Some("published"));
    }

    #[test]
    fn transition_applies_pending_initialise_signal() {
        let bus = Arc::new(Dispatcher::new());
        let mut machine = document(None).events(bus.clone()).build().unwrap();

        bus.fire(
            "document.initialise",
            &Event {
                machine_id: "document".to_string(),
                kind: EventKind::Initialise { state: None },
            },
        );
        machine.transition("publish").unwrap();

        assert_eq!(machine.history().departed(), vec!["draft"]);
    }

    #[test]
    fn handle_dispatches_to_active_state_and_fires_event() {
        let bus = Arc::new(Dispatcher::new());
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        bus.listen(
            "calc.handled.double",
            Arc::new(move |event: &Event| {
                if let EventKind::Handled { result, .. } = &event.kind {
                    sink.lock().unwrap().push(result.clone());
                }
            }),
        );

        let mut machine = MachineBuilder::new()
            .id("calc")
            .state(Counter)
            .events(bus)
            .build()
            .unwrap();

        assert!(matches!(
            machine.handle("double", &[json!(2)]),
            Err(MachineError::Uninitialized)
        ));

        machine.initialize(None).unwrap();
        assert_eq!(machine.handle("double", &[json!(21)]).unwrap(), json!(42));
        assert_eq!(machine.handle("noop", &[]).unwrap(), json!(true));
        assert!(matches!(
            machine.handle("explode", &[]),
            Err(MachineError::Handle {
                source: HandleError::Unsupported { .. },
                ..
            })
        ));

        assert_eq!(*results.lock().unwrap(), vec![json!(42)]);
    }

    #[test]
    fn validates_and_is_model_valid() {
        let mut machine = MachineBuilder::new()
            .state(SimpleState::new("draft"))
            .state(
                SimpleState::new("published")
                    .with_rules(RuleSet::new().rule(Rule::required("title"))),
            )
            .build()
            .unwrap();

        assert!(matches!(
            machine.validates(None),
            Err(MachineError::Uninitialized)
        ));

        machine.initialize(None).unwrap();
        assert!(machine.is_model_valid(None));
        assert!(!machine.is_model_valid(Some("published")));

        machine.set_model(json!({ "title": "Ready" }));
        assert!(machine.validates(Some("published")).is_ok());
    }

    #[test]
    fn forget_namespaces_every_topic() {
        let bus = Arc::new(Dispatcher::new());
        let machine = document(None).events(bus.clone()).build().unwrap();
        machine.listen("a", Arc::new(|_: &Event| {}));
        machine.listen("b", Arc::new(|_: &Event| {}));

        machine.forget(&["a", "b"]);

        assert!(!bus.has_listeners("document.a"));
        assert!(!bus.has_listeners("document.b"));
        assert_eq!(machine.topic("x"), "document.x");
    }

    fn initialise_signal(state: Option<&str>) -> Event {
        Event {
            machine_id: "document".to_string(),
            kind: EventKind::Initialise {
                state: state.map(str::to_string),
            },
        }
    }

    /// Bus that can only forget whole topics.
    #[derive(Default)]
    struct TopicOnlyBus(Dispatcher);

    impl EventDispatcher for TopicOnlyBus {
        fn listen(&self, topic: &str, listener: Listener) {
            self.0.listen(topic, listener);
        }

        fn fire(&self, topic: &str, event: &Event) {
            self.0.fire(topic, event);
        }

        fn forget(&self, topics: &[&str]) {
            self.0.forget(topics);
        }
    }

    #[test]
    fn check_can_transit_ignores_arguments_of_earlier_attempts() {
        let mut machine = document(Some(Guard::require("confirm first", |ctx| {
            ctx.argument("confirm") == Some(&json!(true))
        })))
        .build()
        .unwrap();
        machine.initialize(Some("published")).unwrap();
        machine
            .transition_with("publish", json!({ "confirm": true }))
            .unwrap_err();
        machine.initialize(Some("draft")).unwrap();

        assert!(!machine.check_can_transit("publish").unwrap());
        assert!(machine.transitions(true).unwrap().is_empty());
        assert_eq!(
            machine.structure().transition("publish").unwrap().arguments(),
            &json!({})
        );

        assert!(machine
            .check_can_transit_with("publish", json!({ "confirm": true }))
            .unwrap());
        assert!(machine
            .structure()
            .transition("publish")
            .unwrap()
            .errors()
            .is_empty());
    }

    #[test]
    fn initialising_one_machine_keeps_siblings_listening() {
        let bus = Arc::new(Dispatcher::new());
        let mut first = document(None).events(bus.clone()).build().unwrap();
        let mut second = document(None).events(bus.clone()).build().unwrap();
        assert_eq!(bus.listener_count("document.initialise"), 2);

        first.initialize(None).unwrap();
        assert_eq!(bus.listener_count("document.initialise"), 1);

        bus.fire("document.initialise", &initialise_signal(Some("published")));

        assert!(!first.poll_initialise().unwrap());
        assert_eq!(first.state_id(), Some("draft"));
        assert!(second.poll_initialise().unwrap());
        assert_eq!(second.state_id(), Some("published"));
        assert!(!bus.has_listeners("document.initialise"));
    }

    #[test]
    fn disarmed_listener_stays_inert_on_topic_only_bus() {
        let bus = Arc::new(TopicOnlyBus::default());
        let mut first = document(None).events(bus.clone()).build().unwrap();
        let mut second = document(None).events(bus.clone()).build().unwrap();

        first.initialize(Some("archived")).unwrap();
        assert_eq!(bus.0.listener_count("document.initialise"), 2);

        bus.fire("document.initialise", &initialise_signal(None));

        assert!(!first.poll_initialise().unwrap());
        assert_eq!(first.state_id(), Some("archived"));
        assert!(second.poll_initialise().unwrap());
        assert_eq!(second.state_id(), Some("draft"));
    }

    #[test]
    fn dropping_uninitialised_machines_unregisters_their_listeners() {
        let bus = Arc::new(Dispatcher::new());
        for _ in 0..100 {
            let _machine = document(None).events(bus.clone()).build().unwrap();
        }
        assert_eq!(bus.listener_count("document.initialise"), 0);

        let kept = document(None).events(bus.clone()).build().unwrap();
        drop(document(None).events(bus.clone()).build().unwrap());
        assert_eq!(bus.listener_count("document.initialise"), 1);

        drop(kept);
        assert!(!bus.has_listeners("document.initialise"));
    }
}
