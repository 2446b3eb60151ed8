//! Compile pipeline: IR in, Aurelia view-model source out.
//!
//! Stage order for one component:
//!
//! 1. pre-IR plugins, validation
//! 2. ref discovery and member scope
//! 3. post-IR plugins, validation
//! 4. import mapping over the channel protocol
//! 5. view rendering, import classification, prop collection
//! 6. assembly, pre-code plugins, formatting, post-code plugins
//!
//! Every call works on its own clone of the input. The only shared value is
//! the immutable default configuration.

use std::collections::HashSet;

use indexmap::IndexSet;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::assemble::ViewModel;
use crate::bindings::is_slot_property;
use crate::block::{BlockContext, BlockGenerator};
use crate::context::ContextBridge;
use crate::error::Result;
use crate::format::format_or_keep;
use crate::imports::{assigned_import_vars, classify_imports, custom_imports, resolve_imports};
use crate::ir::{Component, Node};
use crate::options::AureliaOptions;
use crate::plugins::{CodeStage, IrStage};
use crate::rewrite::{IdentifierRewriter, MemberScope};
use crate::validate::{validate_component, validate_node};
use crate::visitor;

lazy_static! {
    static ref PROPS_ACCESS_RE: Regex = Regex::new(r"(?:^|[^\w$.])props\.([A-Za-z_$][\w$]*)").unwrap();
}

pub fn compile_component(component: &Component, options: &AureliaOptions) -> Result<String> {
    if options.suppressed {
        debug!(component = %component.name, "generation suppressed");
        return Ok(String::new());
    }

    let plugins = &options.plugins;
    let component = plugins.run_ir(IrStage::Pre, component.clone())?;
    validate_component(&component)?;

    let ref_order = visitor::dom_refs(&component);
    let dom_refs: HashSet<String> = ref_order.iter().cloned().collect();

    let component = plugins.run_ir(IrStage::Post, component)?;
    validate_component(&component)?;

    let scope = MemberScope::for_component(&component, &dom_refs);
    let components_used = visitor::components_used(&component);
    let resolved = resolve_imports(&component, options, &components_used)?;
    debug!(
        component = %component.name,
        records = resolved.records.len(),
        components = components_used.len(),
        "imports resolved"
    );

    let callable = scope.method_names.clone();
    let generator = BlockGenerator::new(IdentifierRewriter::template(&scope), &callable);
    let block = generator.render_all(&component.children, &BlockContext::root(), "\n")?;

    let classification = classify_imports(resolved.records, &block.markup);
    let binding_code = visitor::binding_code(&component);
    let custom = custom_imports(&component, &binding_code);
    let assigned_imports = assigned_import_vars(&component, &classification, &custom);
    debug!(
        component = %component.name,
        custom_elements = classification.custom_elements.len(),
        code_imports = classification.code_imports.len(),
        assigned = assigned_imports.len(),
        "imports classified"
    );

    let props = collect_props(&component, &block.spreads);

    let view_model = ViewModel {
        component: &component,
        options,
        scope: &scope,
        template_imports: classification.template_imports(options.version),
        code_imports: classification
            .code_import_statements()
            .into_iter()
            .map(str::to_string)
            .collect(),
        local_exports: resolved.local_exports,
        template_body: block.markup,
        props,
        assigned_imports,
        dom_refs: ref_order.into_iter().collect(),
        bridge: ContextBridge::for_component(&component, &scope),
    };

    let code = plugins.run_code(CodeStage::Pre, view_model.assemble())?;
    let code = if options.format {
        format_or_keep(options.formatter.as_ref(), code)
    } else {
        code
    };
    plugins.run_code(CodeStage::Post, code)
}

/// Renders one node subtree as view markup, outside any component.
pub fn render_template(node: &Node, options: &AureliaOptions) -> Result<String> {
    if options.suppressed {
        return Ok(String::new());
    }

    validate_node(node, &node.name)?;
    let scope = MemberScope::default();
    let callable = HashSet::new();
    let generator = BlockGenerator::new(IdentifierRewriter::template(&scope), &callable);
    Ok(generator.render(node, &BlockContext::root())?.markup)
}

/// Compiles independent components in parallel; results keep input order.
pub fn compile_batch(components: &[Component], options: &AureliaOptions) -> Vec<Result<String>> {
    components
        .par_iter()
        .map(|component| compile_component(component, options))
        .collect()
}

/// Declared props plus every `props.x` read in component code, without
/// children, slots and outputs, followed by spread sources.
pub fn collect_props(component: &Component, spreads: &[String]) -> Vec<String> {
    let mut props: IndexSet<String> = component.props.iter().cloned().collect();

    for code in component_code(component) {
        for caps in PROPS_ACCESS_RE.captures_iter(&code) {
            props.insert(caps[1].to_string());
        }
    }

    props.retain(|name| {
        name != "children" && !is_slot_property(name) && !component.outputs.contains(name)
    });
    props.extend(spreads.iter().cloned());
    props.into_iter().collect()
}

fn component_code(component: &Component) -> Vec<String> {
    let hooks = &component.hooks;
    let mut code = visitor::binding_code(component);

    code.extend(component.state.values().map(|value| value.code.clone()));
    code.extend(component.refs.values().map(|decl| decl.argument.clone()));
    code.extend(
        [&hooks.on_init, &hooks.on_mount, &hooks.on_unmount]
            .into_iter()
            .flatten()
            .map(|hook| hook.code.clone()),
    );
    code.extend(hooks.on_update.iter().map(|hook| hook.code.clone()));
    for entry in &component.context.set {
        if let Some(value) = &entry.value {
            code.extend(value.values().map(|value| value.code.clone()));
        }
        if let Some(reference) = &entry.reference {
            code.push(reference.clone());
        }
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Binding, Hook, StateValue};

    #[test]
    fn test_collect_props_scans_code_and_filters() {
        let mut component = Component::new("Card");
        component.props = vec!["title".to_string()];
        component.outputs = vec!["onClose".to_string()];
        component.hooks.on_mount = Some(Hook {
            code: "console.log(props.size, myprops.nope)".to_string(),
        });
        component.state.insert(
            "label".to_string(),
            StateValue::data("props.prefix + props.children"),
        );
        component.children = vec![Node::new("div")
            .with_binding("onClick", Binding::new("props.onClose()"))
            .with_binding("slotHeader", Binding::new("props.slotHeader"))];

        assert_eq!(
            collect_props(&component, &["attrs".to_string()]),
            vec!["title", "prefix", "size", "attrs"]
        );
    }

    #[test]
    fn test_render_template_standalone() {
        let node = Node::new("span").with_child(Node::text_binding("state.label"));
        let markup = render_template(&node, &AureliaOptions::default()).unwrap();
        assert_eq!(markup, "<span>${label}\n</span>");
    }

    #[test]
    fn test_render_template_rejects_malformed_nodes() {
        let err = render_template(&Node::new("For"), &AureliaOptions::default()).unwrap_err();
        assert_eq!(err.code(), crate::error::ERR_MALFORMED_IR);
    }
}
