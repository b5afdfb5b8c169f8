//! Document Approval Workflow
//!
//! This example demonstrates a multi-stage approval workflow with guards,
//! validation rules and an audit listener.
//!
//! Key concepts:
//! - Multi-stage workflow (draft -> review -> approved -> published)
//! - Guards enforce business rules on transition arguments
//! - Destination states validate the linked document
//! - Events feed an audit log without coupling it to the workflow
//!
//! Run with: cargo run --example document_workflow

use overstated::builder::{MachineBuilder, TransitionBuilder};
use overstated::core::{Guard, SimpleState};
use overstated::events::{Dispatcher, Event, EventDispatcher, EventKind};
use overstated::stateful::Entity;
use overstated::validation::{Rule, RuleSet};
use overstated::MachineError;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

// Document entity
#[derive(Debug, Serialize)]
struct Document {
    id: u64,
    title: Option<String>,
    content: String,
    status: String,
}

impl Entity for Document {
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn state_field(&self, _field: &str) -> Option<String> {
        Some(self.status.clone())
    }

    fn set_state_field(&mut self, _field: &str, state: &str) {
        self.status = state.to_string();
    }
}

fn audit_log(event: &Event) {
    if let EventKind::Transition {
        from,
        to,
        transition,
        arguments,
    } = &event.kind
    {
        println!(
            "  [Audit] {} '{}': {} -> {} {}",
            event.machine_id, transition, from, to, arguments
        );
    }
}

fn report(result: Result<(), MachineError>) {
    match result {
        Ok(()) => println!("  ✓ done"),
        Err(err) => {
            println!("  ✗ {}", err);
            for message in err.messages() {
                println!("    - {}", message);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Document Approval Workflow ===\n");

    let bus = Arc::new(Dispatcher::new());
    bus.listen("document.transition", Arc::new(audit_log));

    let mut doc = Document {
        id: 123,
        title: None,
        content: "Lorem ipsum".to_string(),
        status: String::new(),
    };

    // Create state machine
    let mut machine = MachineBuilder::new()
        .id("document")
        .state(SimpleState::new("draft"))
        .state(
            SimpleState::new("review").with_rules(
                RuleSet::new()
                    .rule(Rule::required("title"))
                    .rule(Rule::min("content", 20)),
            ),
        )
        .state(SimpleState::new("approved"))
        .state(SimpleState::new("published"))
        .transition(TransitionBuilder::new("submit").from("draft").to("review"))
        .transition(TransitionBuilder::new("reject").from("review").to("draft"))
        .transition(
            TransitionBuilder::new("approve")
                .from("review")
                .to("approved")
                .when(Guard::require("an approver is required", |ctx| {
                    ctx.argument("approver").is_some()
                })),
        )
        .transition(
            TransitionBuilder::new("publish")
                .named("Publish document")
                .from("approved")
                .to("published"),
        )
        .entity(&doc)
        .events(bus)
        .build()?;

    machine.initialize(None)?;
    println!("Created document workflow state machine");
    println!("States: draft -> review -> approved -> published\n");

    println!("Step 1: Submit an incomplete document");
    report(machine.transition("submit"));
    println!("  state: {:?}\n", machine.state_id());

    println!("Step 2: Complete the document and submit again");
    doc.title = Some("Quarterly report".to_string());
    doc.content = "Revenue grew steadily across all regions.".to_string();
    machine.link_entity(&doc);
    report(machine.transition("submit"));
    println!();

    println!("Step 3: Approve without naming an approver");
    report(machine.transition("approve"));
    println!("  available now: {:?}\n", machine.transitions(true)?);

    println!("Step 4: Approve and publish");
    report(machine.transition_with("approve", json!({ "approver": "lee" })));
    report(machine.transition("publish"));
    if let Some(state) = machine.state_id() {
        doc.set_state_field("status", state);
    }

    println!("\nDocument {} is {}", doc.id, doc.status);
    println!("History: {:?}", machine.history().path());

    println!("\nKey Takeaways:");
    println!("- Structural and business checks are separate failures");
    println!("- Validation messages are all kept, not just the first");
    println!("- Listeners observe committed transitions only");

    println!("\n=== Example Complete ===");
    Ok(())
}
