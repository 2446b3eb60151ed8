//! Context reads and writes over the Aurelia event aggregator.
//!
//! A read subscribes to the context's channel and stores each payload on the
//! local field. A write publishes the provided value on the same channel.
//! Both are wrapped in methods that `attached()` calls once.

use crate::block::indent;
use crate::ir::Component;
use crate::rewrite::{IdentifierRewriter, MemberScope};
use crate::state::stringify_context_value;

pub const GET_CONTEXT_METHOD: &str = "getContext";
pub const SET_CONTEXT_METHOD: &str = "setContext";
pub const AGGREGATOR_IMPORT: &str = "import { EventAggregator } from 'aurelia-event-aggregator';";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBridge {
    /// Body of `getContext()`, present iff the component reads context.
    pub subscribe: Option<String>,
    /// Body of `setContext()`, present iff the component writes context.
    pub publish: Option<String>,
}

impl ContextBridge {
    pub fn for_component(component: &Component, scope: &MemberScope) -> Self {
        let subscribe: Vec<String> = component
            .context
            .get
            .iter()
            .map(|(field, source)| {
                format!(
                    "this.eventAggregator.subscribe({}.key, (payload) => {{\n  this.{} = payload;\n}});",
                    source.name, field
                )
            })
            .collect();

        let rewriter = IdentifierRewriter::instance(scope)
            .receivers_only()
            .with_children_alias("$$slots.default");

        let publish: Vec<String> = component
            .context
            .set
            .iter()
            .map(|entry| {
                let value = match (&entry.value, &entry.reference) {
                    (Some(value), _) => rewriter.rewrite(&stringify_context_value(value)),
                    (None, Some(reference)) => rewriter.rewrite(reference),
                    (None, None) => "undefined".to_string(),
                };
                format!("this.eventAggregator.publish({}.key, {});", entry.name, value)
            })
            .collect();

        Self {
            subscribe: (!subscribe.is_empty()).then(|| subscribe.join("\n")),
            publish: (!publish.is_empty()).then(|| publish.join("\n")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscribe.is_none() && self.publish.is_none()
    }

    /// The aggregator is only imported and injected when something is published.
    pub fn needs_aggregator(&self) -> bool {
        self.publish.is_some()
    }

    /// Statements for `attached()`.
    pub fn mount_calls(&self) -> Vec<String> {
        let mut calls = Vec::new();
        if self.subscribe.is_some() {
            calls.push(format!("this.{GET_CONTEXT_METHOD}();"));
        }
        if self.publish.is_some() {
            calls.push(format!("this.{SET_CONTEXT_METHOD}();"));
        }
        calls
    }

    /// Method declarations for the class body.
    pub fn methods(&self) -> Vec<String> {
        [
            (GET_CONTEXT_METHOD, &self.subscribe),
            (SET_CONTEXT_METHOD, &self.publish),
        ]
        .into_iter()
        .filter_map(|(name, body)| {
            body.as_ref()
                .map(|body| format!("{name}() {{\n{}\n}}", indent(body, 2)))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ContextGet, ContextSet, StateValue};
    use indexmap::IndexMap;

    #[test]
    fn test_reads_subscribe_without_aggregator_import() {
        let mut component = Component::new("Consumer");
        component.context.get.insert(
            "theme".to_string(),
            ContextGet {
                name: "ThemeContext".to_string(),
                type_name: None,
            },
        );
        let bridge = ContextBridge::for_component(&component, &MemberScope::default());

        let body = bridge.subscribe.as_deref().unwrap();
        assert!(body.contains("this.eventAggregator.subscribe(ThemeContext.key, (payload) => {"));
        assert!(body.contains("this.theme = payload;"));
        assert!(!bridge.needs_aggregator());
        assert_eq!(bridge.mount_calls(), vec!["this.getContext();"]);
    }

    #[test]
    fn test_write_value_priority() {
        let mut literal = IndexMap::new();
        literal.insert("color".to_string(), StateValue::data("state.color"));

        let mut component = Component::new("Provider");
        component.context.set = vec![
            ContextSet {
                name: "ThemeContext".to_string(),
                value: Some(literal),
                reference: Some("ignored".to_string()),
            },
            ContextSet {
                name: "SlotContext".to_string(),
                value: None,
                reference: Some("props.children".to_string()),
            },
            ContextSet {
                name: "EmptyContext".to_string(),
                value: None,
                reference: None,
            },
        ];
        let bridge = ContextBridge::for_component(&component, &MemberScope::default());

        assert_eq!(
            bridge.publish.as_deref().unwrap(),
            "this.eventAggregator.publish(ThemeContext.key, { color: this.color });\n\
             this.eventAggregator.publish(SlotContext.key, $$slots.default);\n\
             this.eventAggregator.publish(EmptyContext.key, undefined);"
        );
        assert!(bridge.needs_aggregator());
        assert_eq!(bridge.mount_calls(), vec!["this.setContext();"]);
        assert!(bridge.methods()[0].starts_with("setContext() {\n  this.eventAggregator"));
    }

    #[test]
    fn test_no_context_no_methods() {
        let bridge = ContextBridge::for_component(&Component::new("Plain"), &MemberScope::default());
        assert!(bridge.is_empty());
        assert!(bridge.methods().is_empty());
        assert!(bridge.mount_calls().is_empty());
    }
}
