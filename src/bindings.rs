//! Attribute binding classification.
//!
//! Each key of a node's bindings maps to exactly one [`BindingRule`]; rules
//! are checked in a fixed priority order and the first match wins. Keys the
//! classifier has no dedicated rule for become plain bound attributes.

use crate::ir::{Binding, BindingKind, Node, INTERNAL_PREFIX};

pub const SLOT_PREFIX: &str = "slot";

/// Binding keys with a reserved Aurelia attribute name.
const MAPPED_BINDINGS: [(&str, &str); 2] = [("innerHTML", "innerHTML"), ("style", "style")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingRule {
    /// Spread source; `index` is set when the element has more than one.
    Spread { index: Option<usize> },
    /// Spread that names no spread entry of the element; dropped.
    UnresolvedSpread,
    Internal,
    Event { event: String, suppressed: bool },
    Class,
    Ref,
    /// Markup projected into a named slot, attributed with `attribute`.
    SlotContent { attribute: String },
    Mapped { target: &'static str },
    Attribute,
}

pub fn is_slot_property(key: &str) -> bool {
    key.starts_with(SLOT_PREFIX)
}

pub fn strip_slot_prefix(key: &str) -> &str {
    key.strip_prefix(SLOT_PREFIX).unwrap_or(key)
}

fn strip_receiver(code: &str) -> &str {
    let code = code.trim();
    code.strip_prefix("props.")
        .or_else(|| code.strip_prefix("state."))
        .unwrap_or(code)
}

/// Classifies every binding of `node`, in binding order.
pub fn classify_bindings(node: &Node) -> Vec<(&str, &Binding, BindingRule)> {
    let spreads: Vec<&str> = node
        .bindings
        .values()
        .filter(|b| b.kind == BindingKind::Spread)
        .map(|b| strip_receiver(&b.code))
        .collect();

    let mut ordinal = 0;
    node.bindings
        .iter()
        .map(|(key, binding)| {
            let rule = if binding.kind == BindingKind::Spread {
                ordinal += 1;
                spread_rule(key, ordinal - 1, &spreads)
            } else {
                classify(node, key)
            };
            (key.as_str(), binding, rule)
        })
        .collect()
}

/// `ordinal` counts the element's spread bindings, not distinct sources.
fn spread_rule(key: &str, ordinal: usize, spreads: &[&str]) -> BindingRule {
    if !spreads.contains(&strip_receiver(key)) {
        return BindingRule::UnresolvedSpread;
    }
    if spreads.len() == 1 {
        BindingRule::Spread { index: None }
    } else {
        BindingRule::Spread {
            index: Some(ordinal),
        }
    }
}

fn classify(node: &Node, key: &str) -> BindingRule {
    if key.starts_with(INTERNAL_PREFIX) {
        return BindingRule::Internal;
    }

    if let Some(event) = key.strip_prefix("on").filter(|rest| !rest.is_empty()) {
        return BindingRule::Event {
            event: event_name(node, event),
            suppressed: is_radio_or_checkbox(node),
        };
    }

    match key {
        "class" => return BindingRule::Class,
        "ref" => return BindingRule::Ref,
        _ => {}
    }

    if is_slot_property(key) {
        return BindingRule::SlotContent {
            attribute: strip_slot_prefix(key).to_lowercase(),
        };
    }

    if let Some((_, target)) = MAPPED_BINDINGS.iter().find(|(name, _)| *name == key) {
        return BindingRule::Mapped { target: *target };
    }

    BindingRule::Attribute
}

fn event_name(node: &Node, suffix: &str) -> String {
    let mut chars = suffix.chars();
    let event = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
        None => String::new(),
    };

    if event == "change" && node.name == "input" {
        return "input".to_string();
    }
    event
}

/// Delegated handlers are not emitted for radio and checkbox inputs.
fn is_radio_or_checkbox(node: &Node) -> bool {
    matches!(
        node.properties.get("type").map(String::as_str),
        Some("radio") | Some("checkbox")
    )
}
