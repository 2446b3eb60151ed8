//! Final source assembly: module header, inline view and view-model class.
//!
//! Sections are concatenated in a fixed order and empty sections are left
//! out, so the same inputs always give the same string. Member code from the
//! IR is emitted as written (after relocation); only generated scaffolding is
//! indented.

use indexmap::IndexSet;

use crate::block::{indent, kebab_case};
use crate::context::{ContextBridge, AGGREGATOR_IMPORT};
use crate::ir::Component;
use crate::options::AureliaOptions;
use crate::rewrite::{IdentifierRewriter, MemberScope};
use crate::state::state_members;

pub const FRAMEWORK_MODULE: &str = "aurelia-framework";
pub const PROPERTY_OBSERVER: &str = "propertyObserver";

/// Everything the assembler needs, gathered by the pipeline.
pub struct ViewModel<'a> {
    pub component: &'a Component,
    pub options: &'a AureliaOptions,
    pub scope: &'a MemberScope,
    /// Rendered view markup for the component children.
    pub template_body: String,
    /// `<require>`/`<import>` markup for custom elements.
    pub template_imports: String,
    pub code_imports: Vec<String>,
    pub local_exports: String,
    pub props: Vec<String>,
    pub assigned_imports: Vec<String>,
    pub dom_refs: Vec<String>,
    pub bridge: ContextBridge,
}

/// Framework features referenced by the generated class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub autoinject: bool,
    pub bindable: bool,
    pub computed_from: bool,
    pub custom_element: bool,
}

impl Features {
    /// Sorted import line; `inlineView` is always present.
    pub fn import_line(&self) -> String {
        let mut names = vec!["inlineView"];
        if self.autoinject {
            names.push("autoinject");
        }
        if self.bindable {
            names.push("bindable");
        }
        if self.computed_from {
            names.push("computedFrom");
        }
        if self.custom_element {
            names.push("customElement");
        }
        names.sort_unstable();
        format!("import {{ {} }} from \"{FRAMEWORK_MODULE}\";", names.join(", "))
    }
}

impl<'a> ViewModel<'a> {
    pub fn assemble(&self) -> String {
        let members = self.class_members();
        let features = Features {
            autoinject: self.bridge.needs_aggregator(),
            bindable: members.iter().any(|member| member.contains("@bindable(")),
            computed_from: !self.component.hooks.on_update.is_empty(),
            custom_element: self.options.register_custom_element,
        };

        let mut header = Vec::new();
        if self.bridge.needs_aggregator() {
            header.push(AGGREGATOR_IMPORT.to_string());
        }
        header.push(features.import_line());
        if !self.code_imports.is_empty() {
            header.push(self.code_imports.join("\n"));
        }
        if !self.local_exports.trim().is_empty() {
            header.push(self.local_exports.clone());
        }
        if !self.component.types.is_empty() {
            header.push(self.component.types.join("\n"));
        }
        if let Some(table) = self.default_props_table() {
            header.push(table);
        }

        let mut decorators = Vec::new();
        if features.autoinject {
            decorators.push("@autoinject".to_string());
        }
        if features.custom_element {
            decorators.push(format!(
                "@customElement(\"{}\")",
                kebab_case(&self.component.name)
            ));
        }
        decorators.push(format!("@inlineView(`\n{}\n`)", self.inline_view()));

        let class = if members.is_empty() {
            format!("export class {} {{}}", self.component.name)
        } else {
            format!(
                "export class {} {{\n{}\n}}",
                self.component.name,
                members.join("\n\n")
            )
        };

        format!(
            "{}\n\n{}\n{}\n",
            header.join("\n\n"),
            decorators.join("\n"),
            class
        )
    }

    fn default_props_table(&self) -> Option<String> {
        if self.component.default_props.is_empty() {
            return None;
        }
        let entries: Vec<String> = self
            .component
            .default_props
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        Some(format!("const defaultProps = {{ {} }};", entries.join(", ")))
    }

    /// The view as it sits inside the `@inlineView` template literal.
    fn inline_view(&self) -> String {
        let mut body = self.template_body.clone();
        if !self.component.hooks.on_update.is_empty() {
            body.push_str(&format!("${{{PROPERTY_OBSERVER}}}"));
        }
        if let Some(css) = self.component.css.as_deref().filter(|css| !css.trim().is_empty()) {
            body.push_str(&format!("\n<style>{}</style>", css.trim()));
        }

        let mut content = String::new();
        if !self.template_imports.is_empty() {
            content.push_str(&self.template_imports);
            content.push('\n');
        }
        content.push_str(&body);

        let view = if self.options.version.wraps_template() {
            format!("<template>\n{}\n</template>", indent(&content, 2))
        } else {
            content
        };

        escape_template_literal(&indent(&view, 2))
    }

    fn class_members(&self) -> Vec<String> {
        let rewriter = IdentifierRewriter::instance(self.scope);
        let component = self.component;
        let mut members = Vec::new();

        let props: Vec<String> = self.props.iter().map(|prop| self.prop_field(prop)).collect();
        push_section(&mut members, props);

        push_section(
            &mut members,
            self.assigned_imports
                .iter()
                .map(|name| format!("{name} = {name};"))
                .collect(),
        );

        push_section(
            &mut members,
            component
                .outputs
                .iter()
                .map(|name| match &self.options.experimental.outputs {
                    Some(shape) => shape(component, name),
                    None => format!("@bindable() {name}: (...args: any[]) => void;"),
                })
                .collect(),
        );

        push_section(
            &mut members,
            self.dom_refs
                .iter()
                .map(|name| format!("{name}: HTMLElement;"))
                .collect(),
        );

        members.extend(state_members(&component.state, &rewriter));

        push_section(
            &mut members,
            component
                .refs
                .iter()
                .filter(|(name, _)| self.scope.value_refs.contains(*name))
                .map(|(name, decl)| {
                    let mut field = format!("private _{name}");
                    if let Some(ty) = &decl.type_parameter {
                        field.push_str(&format!(": {ty}"));
                    }
                    if !decl.argument.trim().is_empty() {
                        field.push_str(&format!(" = {}", rewriter.rewrite(&decl.argument)));
                    }
                    field.push(';');
                    field
                })
                .collect(),
        );

        if let Some(constructor) = self.constructor(&rewriter) {
            members.push(constructor);
        }
        if let Some(attached) = self.attached(&rewriter) {
            members.push(attached);
        }
        if let Some(observer) = self.property_observer(&rewriter) {
            members.push(observer);
        }
        if let Some(hook) = &component.hooks.on_unmount {
            members.push(format!("detached() {{\n{}\n}}", rewriter.rewrite(&hook.code)));
        }
        members.extend(self.bridge.methods());

        members
    }

    fn prop_field(&self, prop: &str) -> String {
        let type_ref = self
            .component
            .props_type_ref
            .as_deref()
            .map(str::trim)
            .filter(|ty| !ty.is_empty() && *ty != "any");

        let ty = match type_ref {
            Some(ty) if ty.contains("| never") => format!("({ty})[\"{prop}\"]"),
            Some(ty) => format!("{ty}[\"{prop}\"]"),
            None => "any".to_string(),
        };

        let mut field = format!("@bindable() {prop}: {ty}");
        if self.component.default_props.contains_key(prop) {
            field.push_str(&format!(" = defaultProps[\"{prop}\"]"));
        }
        field.push(';');
        field
    }

    fn injectables(&self) -> Vec<String> {
        let experimental = &self.options.experimental;
        self.component
            .context
            .get
            .iter()
            .map(|(name, source)| {
                let ty = source.type_name();
                match &experimental.injectables {
                    Some(shape) => shape(name, ty),
                    None if experimental.inject => {
                        format!("@Inject(forwardRef(() => {ty})) public {name}: {ty}")
                    }
                    None => format!("public {name}: {ty}"),
                }
            })
            .collect()
    }

    fn constructor(&self, rewriter: &IdentifierRewriter) -> Option<String> {
        let on_init = self.component.hooks.on_init.as_ref();
        let injectables = self.injectables();
        if injectables.is_empty() && on_init.is_none() && !self.bridge.needs_aggregator() {
            return None;
        }

        let mut params = Vec::new();
        if self.bridge.needs_aggregator() {
            params.push("private eventAggregator: EventAggregator".to_string());
        }
        params.extend(injectables);

        let params = if params.is_empty() {
            String::new()
        } else {
            format!("\n{}\n", indent(&params.join(",\n"), 2))
        };
        let body = on_init
            .map(|hook| rewriter.rewrite(&hook.code))
            .unwrap_or_default();
        Some(format!("constructor({params}) {{\n{body}\n}}"))
    }

    fn attached(&self, rewriter: &IdentifierRewriter) -> Option<String> {
        let on_mount = self.component.hooks.on_mount.as_ref();
        if on_mount.is_none() && self.bridge.is_empty() {
            return None;
        }

        let mut body = Vec::new();
        if let Some(hook) = on_mount {
            body.push(rewriter.rewrite(&hook.code));
        }
        body.extend(self.bridge.mount_calls());
        Some(format!("attached() {{\n{}\n}}", body.join("\n")))
    }

    /// `@computedFrom` getter over every update-hook dependency.
    fn property_observer(&self, rewriter: &IdentifierRewriter) -> Option<String> {
        let hooks = &self.component.hooks.on_update;
        if hooks.is_empty() {
            return None;
        }

        let template = IdentifierRewriter::template(self.scope);
        let deps: IndexSet<String> = hooks
            .iter()
            .flat_map(|hook| hook.deps.iter())
            .map(|dep| template.rewrite(dep).trim().to_string())
            .filter(|dep| !dep.is_empty())
            .collect();
        let deps: Vec<String> = deps.iter().map(|dep| format!("\"{dep}\"")).collect();

        let body: Vec<String> = hooks.iter().map(|hook| rewriter.rewrite(&hook.code)).collect();
        Some(format!(
            "@computedFrom({})\nget {PROPERTY_OBSERVER}() {{\n{}\nreturn;\n}}",
            deps.join(", "),
            body.join("\n")
        ))
    }
}

fn push_section(members: &mut Vec<String>, section: Vec<String>) {
    if !section.is_empty() {
        members.push(section.join("\n"));
    }
}

/// Escapes characters that would end or interpolate the host template literal.
pub fn escape_template_literal(view: &str) -> String {
    view.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
