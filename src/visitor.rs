use indexmap::IndexSet;

use crate::ir::{Binding, Component, Node, BUILT_IN_COMPONENTS};

/// The NodeVisitor trait is the single traversal mechanism for IR trees.
///
/// Rules:
/// 1. Traversal order is fixed: bindings, then children, then the else branch.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call `walk_*` functions to continue traversal unless pruning is intended.
pub trait NodeVisitor {
    fn visit_component(&mut self, component: &Component) {
        walk_component(self, component);
    }

    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_binding(&mut self, _key: &str, _binding: &Binding) {
        // Leaf, nothing to walk by default
    }

    fn visit_children(&mut self, children: &[Node]) {
        walk_children(self, children);
    }
}

pub fn walk_component<V: NodeVisitor + ?Sized>(visitor: &mut V, component: &Component) {
    visitor.visit_children(&component.children);
}

pub fn walk_children<V: NodeVisitor + ?Sized>(visitor: &mut V, children: &[Node]) {
    for node in children {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &Node) {
    for (key, binding) in &node.bindings {
        visitor.visit_binding(key, binding);
    }
    visitor.visit_children(&node.children);
    if let Some(branch) = &node.meta.else_branch {
        visitor.visit_node(branch);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Capitalized tag names that are not control-flow nodes, in first-use order.
#[derive(Default)]
pub struct ComponentsUsed {
    pub names: IndexSet<String>,
}

impl NodeVisitor for ComponentsUsed {
    fn visit_node(&mut self, node: &Node) {
        let is_component = node.name.chars().next().is_some_and(char::is_uppercase);
        if is_component && !BUILT_IN_COMPONENTS.contains(&node.name.as_str()) {
            self.names.insert(node.name.clone());
        }
        walk_node(self, node);
    }
}

/// Names captured by `ref` bindings anywhere in the view.
#[derive(Default)]
pub struct DomRefs {
    pub names: IndexSet<String>,
}

impl NodeVisitor for DomRefs {
    fn visit_binding(&mut self, key: &str, binding: &Binding) {
        let name = binding.code.trim();
        if key == "ref" && !name.is_empty() {
            self.names.insert(name.to_string());
        }
    }
}

/// Every binding code in the view, in traversal order.
#[derive(Default)]
pub struct BindingCode {
    pub codes: Vec<String>,
}

impl NodeVisitor for BindingCode {
    fn visit_binding(&mut self, _key: &str, binding: &Binding) {
        self.codes.push(binding.code.clone());
    }
}

pub fn components_used(component: &Component) -> Vec<String> {
    let mut collector = ComponentsUsed::default();
    collector.visit_component(component);
    collector.names.into_iter().collect()
}

pub fn dom_refs(component: &Component) -> IndexSet<String> {
    let mut collector = DomRefs::default();
    collector.visit_component(component);
    collector.names
}

pub fn binding_code(component: &Component) -> Vec<String> {
    let mut collector = BindingCode::default();
    collector.visit_component(component);
    collector.codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component() -> Component {
        let mut component = Component::new("Panel");
        component.children = vec![Node::new("div")
            .with_binding("ref", Binding::new("box"))
            .with_child(Node::new("Card"))
            .with_child(
                Node::show("state.open")
                    .with_child(Node::new("Fragment"))
                    .with_else(Node::new("Card").with_child(Node::new("Badge"))),
            )];
        component
    }

    #[test]
    fn test_components_used_skips_builtins() {
        assert_eq!(components_used(&component()), vec!["Card", "Badge"]);
    }

    #[test]
    fn test_dom_refs_collects_ref_bindings() {
        let refs = dom_refs(&component());
        assert!(refs.contains("box"));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_binding_code_includes_else_branch() {
        let mut component = component();
        component.children[0].children[1].meta.else_branch =
            Some(Box::new(Node::text_binding("state.fallback")));
        let codes = binding_code(&component);
        assert_eq!(codes, vec!["box", "state.open", "state.fallback"]);
    }
}
