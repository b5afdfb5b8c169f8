//! Context handed to guards while a transition is evaluated.

use super::history::StateHistory;
use serde_json::Value;

/// Borrowed view of the machine for the duration of one guard evaluation.
///
/// Guards never hold a reference to the machine; they receive this handle,
/// valid only while the machine that created it is borrowed.
#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    pub machine_id: &'a str,
    pub transition: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub arguments: &'a Value,
    pub entity: &'a Value,
    pub history: &'a StateHistory,
}

impl<'a> TransitionContext<'a> {
    /// Look up a named argument passed to the transition call.
    pub fn argument(&self, name: &str) -> Option<&'a Value> {
        self.arguments.get(name)
    }

    /// Look up a field of the linked entity snapshot.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.entity.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_read_arguments_and_entity() {
        let arguments = json!({ "reason": "typo" });
        let entity = json!({ "title": "Hello" });
        let history = StateHistory::new();

        let ctx = TransitionContext {
            machine_id: "document",
            transition: "publish",
            from: "draft",
            to: "published",
            arguments: &arguments,
            entity: &entity,
            history: &history,
        };

        assert_eq!(ctx.argument("reason"), Some(&json!("typo")));
        assert_eq!(ctx.field("title"), Some(&json!("Hello")));
        assert!(ctx.argument("missing").is_none());
        assert!(ctx.field("missing").is_none());
    }
}
