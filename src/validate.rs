//! Structural checks run before generation.
//!
//! The backend renders whatever it is given; the rules here catch the IR
//! shapes that would otherwise produce broken views (a loop without an
//! iterable, a condition without a guard) and fail fast with the node path.

use crate::error::{CompileError, Result};
use crate::ir::{Component, Node, NodeKind};

pub fn validate_component(component: &Component) -> Result<()> {
    if component.name.trim().is_empty() {
        return Err(CompileError::malformed("<component>", "component name is empty"));
    }

    for (idx, child) in component.children.iter().enumerate() {
        validate_node(child, &format!("{} > {}[{}]", component.name, child.name, idx))?;
    }
    Ok(())
}

pub fn validate_node(node: &Node, path: &str) -> Result<()> {
    if node.name.trim().is_empty() {
        return Err(CompileError::malformed(path, "node name is empty"));
    }

    match node.kind() {
        NodeKind::For => {
            let has_iterable = node
                .bindings
                .get("each")
                .is_some_and(|b| !b.code.trim().is_empty());
            if !has_iterable {
                return Err(CompileError::malformed(path, "For node has no `each` binding"));
            }
            if node.scope.for_name.as_deref().map_or(true, str::is_empty) {
                return Err(CompileError::malformed(path, "For node has no loop variable name"));
            }
        }
        NodeKind::Show => {
            if !node.bindings.contains_key("when") {
                return Err(CompileError::malformed(path, "Show node has no `when` binding"));
            }
        }
        _ => {}
    }

    for (idx, child) in node.children.iter().enumerate() {
        validate_node(child, &format!("{} > {}[{}]", path, child.name, idx))?;
    }

    if let Some(branch) = &node.meta.else_branch {
        validate_node(branch, &format!("{} > else", path))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Binding;

    #[test]
    fn test_valid_tree_passes() {
        let mut component = Component::new("List");
        component.children = vec![Node::for_each("item", Some("i"), "state.items")
            .with_child(Node::show("item.visible").with_else(Node::text("hidden")))];
        assert!(validate_component(&component).is_ok());
    }

    #[test]
    fn test_for_without_iterable_is_rejected() {
        let mut component = Component::new("List");
        component.children = vec![Node::new("div").with_child(Node::new("For"))];

        let err = validate_component(&component).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MALFORMED_IR);
        assert!(err.to_string().contains("List > div[0] > For[0]"), "{err}");
    }

    #[test]
    fn test_show_without_condition_is_rejected() {
        let node = Node::new("Show").with_child(Node::text("x"));
        assert!(validate_node(&node, "Show").is_err());
    }

    #[test]
    fn test_malformed_else_branch_is_rejected() {
        let node = Node::show("state.open").with_else(Node::new(""));
        let err = validate_node(&node, "Root").unwrap_err();
        assert!(err.to_string().contains("Root > else"), "{err}");
    }

    #[test]
    fn test_empty_names_are_rejected() {
        assert!(validate_component(&Component::new(" ")).is_err());

        let mut component = Component::new("X");
        component.children = vec![Node::new("div").with_binding("title", Binding::new("t"))];
        component.children[0].children.push(Node::new(""));
        assert!(validate_component(&component).is_err());
    }
}
