use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind names accepted on the plan wire format, in grammar order.
pub const GRAMMAR_KINDS: &[&str] = &["navigate", "click", "input", "wait", "scroll"];

/// Closed vocabulary of executable browser actions.
///
/// The grammar is deliberately small so model output can be mechanically
/// checked instead of trusted; anything outside these five kinds is a
/// validation failure, never a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Navigate { url: String },
    Click { selector: String },
    Input { selector: String, text: String },
    Wait { seconds: f64 },
    Scroll { pixels: i64 },
}

impl Action {
    /// Wire-format kind name for this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Click { .. } => "click",
            Action::Input { .. } => "input",
            Action::Wait { .. } => "wait",
            Action::Scroll { .. } => "scroll",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Navigate { url } => write!(f, "navigate {url}"),
            Action::Click { selector } => write!(f, "click {selector}"),
            Action::Input { selector, text } => write!(f, "input {text:?} into {selector}"),
            Action::Wait { seconds } => write!(f, "wait {seconds}s"),
            Action::Scroll { pixels } => write!(f, "scroll {pixels}px"),
        }
    }
}

/// Ordered, non-empty sequence of validated actions.
///
/// Plan length is advisory only: it may exceed the step budget, which the
/// executor enforces at run time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionPlan {
    actions: Vec<Action>,
}

impl ActionPlan {
    /// Wrap a non-empty action sequence; returns `None` for an empty one.
    pub fn new(actions: Vec<Action>) -> Option<Self> {
        if actions.is_empty() {
            None
        } else {
            Some(Self { actions })
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }
}

impl<'plan> IntoIterator for &'plan ActionPlan {
    type Item = &'plan Action;
    type IntoIter = std::slice::Iter<'plan, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_action_uses_wire_tag() {
        let action = Action::Navigate {
            url: "https://example.com".into(),
        };

        let value = serde_json::to_value(&action).expect("serialize");
        assert_eq!(
            value,
            json!({
                "action": "navigate",
                "url": "https://example.com"
            })
        );
    }

    #[test]
    fn deserialize_input_action() {
        let action: Action = serde_json::from_value(json!({
            "action": "input",
            "selector": "#search",
            "text": "laptops"
        }))
        .expect("deserialize");

        assert_eq!(
            action,
            Action::Input {
                selector: "#search".into(),
                text: "laptops".into()
            }
        );
    }

    #[test]
    fn kind_names_cover_the_grammar() {
        let actions = [
            Action::Navigate { url: String::new() },
            Action::Click {
                selector: String::new(),
            },
            Action::Input {
                selector: String::new(),
                text: String::new(),
            },
            Action::Wait { seconds: 0.0 },
            Action::Scroll { pixels: 0 },
        ];

        let kinds: Vec<&str> = actions.iter().map(Action::kind).collect();
        assert_eq!(kinds, GRAMMAR_KINDS);
    }

    #[test]
    fn plan_rejects_empty_sequence() {
        assert!(ActionPlan::new(Vec::new()).is_none());

        let plan = ActionPlan::new(vec![Action::Wait { seconds: 1.0 }]).expect("non-empty plan");
        assert_eq!(plan.len(), 1);
    }
}
