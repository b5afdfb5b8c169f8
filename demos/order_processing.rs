//! E-commerce Order Processing
//!
//! This example demonstrates an order entity driven by two machines built
//! from a JSON definition.
//!
//! Key concepts:
//! - Declarative definitions resolved through a registry
//! - One machine per entity field (fulfilment and payment)
//! - State operations dispatched with `handle`
//! - Notifications as event listeners on a shared bus
//!
//! Run with: cargo run --example order_processing

use overstated::builder::{MachineDefinition, Registry, TransitionBuilder};
use overstated::core::{Guard, HandleError, SimpleState, State, Validatable};
use overstated::events::{Dispatcher, Event, EventDispatcher, EventKind};
use overstated::stateful::{Entity, Machines};
use overstated::validation::{Rule, RuleSet};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

// Order entity
#[derive(Debug, Serialize)]
struct Order {
    id: u64,
    total: f64,
    items: Vec<String>,
    shipping_address: Option<String>,
    fulfilment: String,
    payment: String,
}

impl Entity for Order {
    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn state_field(&self, field: &str) -> Option<String> {
        match field {
            "fulfilment" => Some(self.fulfilment.clone()),
            "payment" => Some(self.payment.clone()),
            _ => None,
        }
    }

    fn set_state_field(&mut self, field: &str, state: &str) {
        match field {
            "fulfilment" => self.fulfilment = state.to_string(),
            "payment" => self.payment = state.to_string(),
            _ => {}
        }
    }
}

/// Paid orders can issue receipts.
#[derive(Debug)]
struct Paid;

impl Validatable for Paid {}

impl State for Paid {
    fn id(&self) -> &str {
        "paid"
    }

    fn handle(&self, operation: &str, args: &[Value]) -> Result<Option<Value>, HandleError> {
        match operation {
            "receipt" => {
                let order = args
                    .first()
                    .and_then(Value::as_u64)
                    .ok_or_else(|| HandleError::Failed("order id required".to_string()))?;
                Ok(Some(json!(format!("RCPT-{}", order * 100))))
            }
            _ => Err(HandleError::Unsupported {
                operation: operation.to_string(),
            }),
        }
    }
}

fn registry() -> Registry {
    Registry::new()
        .register_state("placed", || SimpleState::new("placed"))
        .register_state("shipped", || {
            SimpleState::new("shipped")
                .with_rules(RuleSet::new().rule(Rule::required("shipping_address")))
        })
        .register_state("delivered", || SimpleState::new("delivered"))
        .register_state("unpaid", || SimpleState::new("unpaid"))
        .register_state("paid", || Paid)
        .register_transition("pay", || {
            TransitionBuilder::new("pay")
                .from("unpaid")
                .to("paid")
                .when(Guard::require("order has no items", |ctx| {
                    ctx.field("items")
                        .and_then(Value::as_array)
                        .is_some_and(|items| !items.is_empty())
                }))
        })
        .register_transition("ship", || {
            TransitionBuilder::new("ship").from("placed").to("shipped")
        })
        .register_transition("deliver", || {
            TransitionBuilder::new("deliver").from("shipped").to("delivered")
        })
}

const DEFINITIONS: &str = r#"{
    "fulfilment": {
        "id": "order",
        "states": ["placed", "shipped", "delivered"],
        "transitions": ["ship", "deliver"]
    },
    "payment": {
        "states": ["unpaid", "paid"],
        "transitions": ["pay"]
    }
}"#;

fn notify(event: &Event) {
    if let EventKind::Transition { to, .. } = &event.kind {
        println!("  [Notification] {} is now {}", event.machine_id, to);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== E-commerce Order Processing ===\n");

    let bus = Arc::new(Dispatcher::new());
    bus.listen("order.transition", Arc::new(notify));
    bus.listen("payment.transition", Arc::new(notify));

    let mut order = Order {
        id: 12345,
        total: 149.99,
        items: vec!["Book".to_string(), "Pen".to_string()],
        shipping_address: None,
        fulfilment: String::new(),
        payment: String::new(),
    };

    let definitions: BTreeMap<String, MachineDefinition> = serde_json::from_str(DEFINITIONS)?;
    let mut machines = Machines::from_definitions(&order, &definitions, &registry(), bus)?;

    println!("Order processing machines created for fields: {:?}", machines.fields().collect::<Vec<_>>());
    println!("Processing order {}:", order.id);
    println!("  Total: ${:.2}", order.total);
    println!("  Items: {}", order.items.join(", "));
    println!();

    println!("Step 1: Process Payment");
    machines.transit("payment", "pay", json!({ "amount": order.total }), &mut order)?;
    let receipt = machines.handle("payment", "receipt", &[json!(order.id)])?;
    println!("  Receipt: {}\n", receipt);

    println!("Step 2: Ship Order without an address");
    if let Err(err) = machines.transit("fulfilment", "ship", json!({}), &mut order) {
        println!("  Error: {}\n", err);
    }

    println!("Step 3: Ship Order");
    order.shipping_address = Some("123 Main St, City, State 12345".to_string());
    machines.transit("fulfilment", "ship", json!({}), &mut order)?;
    println!();

    println!("Step 4: Complete Delivery");
    machines.transit("fulfilment", "deliver", json!({}), &mut order)?;
    println!();

    println!(
        "Order completed: fulfilment={}, payment={}",
        order.fulfilment, order.payment
    );
    println!(
        "Fulfilment history: {:?}",
        machines.get("fulfilment")?.history().departed()
    );

    println!("\nKey Takeaways:");
    println!("- Each entity field is driven by its own machine");
    println!("- Definitions are data; behavior lives in the registry");
    println!("- The entity is updated only after a committed transition");

    println!("\n=== Example Complete ===");
    Ok(())
}
