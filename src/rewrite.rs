//! Identifier relocation for code snippets carried by the IR.
//!
//! Snippets reference component members either through the `state.` and
//! `props.` receivers or as bare names. In a class body those must resolve
//! through `this`. In a view they resolve against the view-model implicitly,
//! so the receivers are dropped.
//!
//! Rewriting is span based: the snippet is parsed with oxc, replacements are
//! collected as `(start, end, text)` and applied to the original text, so
//! formatting and comments survive. Names bound inside the snippet shadow
//! component members only within the scope that declares them (function,
//! arrow, block, catch clause or loop head). A snippet that does not parse in
//! any of the accepted shapes falls back to boundary-aware text substitution.

use std::collections::HashSet;

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingIdentifier, BindingPattern, BlockStatement, CatchClause, Class,
    Expression, ForInStatement, ForOfStatement, ForStatement, ForStatementInit, ForStatementLeft,
    FormalParameters, Function, IdentifierReference, ObjectProperty, Statement,
    StaticMemberExpression, TSInterfaceDeclaration, TSTypeAliasDeclaration, TSTypeAnnotation,
    VariableDeclaration, VariableDeclarationKind,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use oxc_syntax::scope::ScopeFlags;
use regex::{Captures, Regex};

use crate::ir::Component;

/// Member names known for one component, grouped by how they are stored.
#[derive(Debug, Clone, Default)]
pub struct MemberScope {
    pub context_vars: HashSet<String>,
    pub output_vars: HashSet<String>,
    /// Refs captured from the view; stored under their own name.
    pub dom_refs: HashSet<String>,
    /// Refs holding plain values; stored under `_name`.
    pub value_refs: HashSet<String>,
    pub state_vars: HashSet<String>,
    pub method_names: HashSet<String>,
}

impl MemberScope {
    pub fn for_component(component: &Component, dom_refs: &HashSet<String>) -> Self {
        let value_refs = component
            .refs
            .keys()
            .filter(|name| !dom_refs.contains(*name))
            .cloned()
            .collect();

        Self {
            context_vars: component.context.get.keys().cloned().collect(),
            output_vars: component.outputs.iter().cloned().collect(),
            dom_refs: dom_refs.clone(),
            value_refs,
            state_vars: component.state.keys().cloned().collect(),
            method_names: component.method_names().map(str::to_string).collect(),
        }
    }

    fn is_instance_member(&self, name: &str) -> bool {
        self.context_vars.contains(name)
            || self.output_vars.contains(name)
            || self.dom_refs.contains(name)
            || self.state_vars.contains(name)
            || self.method_names.contains(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// View expressions: `state.x` → `x`.
    Template,
    /// Class code: `state.x` → `this.x`, bare members → `this.member`.
    Instance,
}

#[derive(Debug, Clone)]
pub struct IdentifierRewriter<'s> {
    scope: &'s MemberScope,
    receiver: Receiver,
    relocate_bare: bool,
    children_alias: Option<&'s str>,
    /// Free references to `.0` become `.1`, whatever the receiver.
    rename: Option<(&'s str, &'s str)>,
}

const STATE_RECEIVERS: [&str; 2] = ["state", "props"];

/// Wrappers tried in order; the first one that parses wins.
const SHAPES: [(&str, &str); 4] = [
    ("(", "\n)"),
    ("", ""),
    ("function __body() {\n", "\n}"),
    ("class __Members {\n", "\n}"),
];

impl<'s> IdentifierRewriter<'s> {
    pub fn template(scope: &'s MemberScope) -> Self {
        Self {
            scope,
            receiver: Receiver::Template,
            relocate_bare: false,
            children_alias: None,
            rename: None,
        }
    }

    pub fn instance(scope: &'s MemberScope) -> Self {
        Self {
            scope,
            receiver: Receiver::Instance,
            relocate_bare: true,
            children_alias: None,
            rename: None,
        }
    }

    /// Only rewrite `state.`/`props.` receivers, leave bare names alone.
    pub fn receivers_only(mut self) -> Self {
        self.relocate_bare = false;
        self
    }

    /// Route `props.children` to another receptor, such as projected slot content.
    pub fn with_children_alias(mut self, alias: &'s str) -> Self {
        self.children_alias = Some(alias);
        self
    }

    /// Also renames free references to `from`, leaving strings and property
    /// names alone.
    pub fn renaming(mut self, from: &'s str, to: &'s str) -> Self {
        self.rename = Some((from, to));
        self
    }

    pub fn rewrite(&self, code: &str) -> String {
        if code.trim().is_empty() {
            return code.to_string();
        }

        match self.collect_replacements(code) {
            Some(replacements) => apply_replacements(code, replacements),
            None => self.rewrite_text(code),
        }
    }

    fn member_prefix(&self) -> &'static str {
        match self.receiver {
            Receiver::Template => "",
            Receiver::Instance => "this.",
        }
    }

    /// Replacement for a whole `state.x` / `props.x` expression, if it is not
    /// a plain prefix change.
    fn member_override(&self, receiver: &str, property: &str) -> Option<String> {
        match (receiver, property, self.children_alias) {
            ("props", "children", Some(alias)) => Some(alias.to_string()),
            _ => None,
        }
    }

    fn bare_replacement(&self, name: &str) -> Option<String> {
        if let Some((from, to)) = self.rename {
            if from == name {
                return Some(to.to_string());
            }
        }

        if self.scope.value_refs.contains(name) {
            return match self.receiver {
                Receiver::Template => Some(format!("_{name}")),
                Receiver::Instance if self.relocate_bare => Some(format!("this._{name}")),
                Receiver::Instance => None,
            };
        }

        if self.relocate_bare && self.scope.is_instance_member(name) {
            return Some(format!("{}{}", self.member_prefix(), name));
        }

        None
    }

    fn collect_replacements(&self, code: &str) -> Option<Vec<(usize, usize, String)>> {
        let source_type = SourceType::default()
            .with_typescript(true)
            .with_module(true)
            .with_jsx(true);

        for (prefix, suffix) in SHAPES {
            let source = format!("{prefix}{code}{suffix}");
            let allocator = Allocator::default();
            let ret = Parser::new(&allocator, &source, source_type).parse();
            if !ret.errors.is_empty() {
                continue;
            }

            let mut collector = RelocationCollector {
                rewriter: self,
                scopes: vec![DeclaredNames::of_statements(&ret.program.body)],
                replacements: Vec::new(),
            };
            collector.visit_program(&ret.program);

            let offset = prefix.len();
            let replacements = collector
                .replacements
                .into_iter()
                .filter_map(|(start, end, text)| {
                    let start = (start as usize).checked_sub(offset)?;
                    let end = (end as usize).checked_sub(offset)?;
                    (end <= code.len()).then_some((start, end, text))
                })
                .collect();
            return Some(replacements);
        }

        None
    }

    fn rewrite_text(&self, code: &str) -> String {
        lazy_static! {
            static ref RECEIVER_RE: Regex =
                Regex::new(r"(^|[^\w$.])(state|props)\.([A-Za-z_$][\w$]*)").unwrap();
        }

        let relocated = RECEIVER_RE.replace_all(code, |caps: &Captures| {
            let property = &caps[3];
            let replaced = self
                .member_override(&caps[2], property)
                .unwrap_or_else(|| format!("{}{}", self.member_prefix(), property));
            format!("{}{}", &caps[1], replaced)
        });

        let renamed = self.rename.map(|(from, _)| from.to_string());
        let mut names: Vec<&String> = self
            .scope
            .value_refs
            .iter()
            .chain(self.scope.context_vars.iter())
            .chain(self.scope.output_vars.iter())
            .chain(self.scope.dom_refs.iter())
            .chain(self.scope.state_vars.iter())
            .chain(self.scope.method_names.iter())
            .chain(renamed.iter())
            .collect();
        names.sort();
        names.dedup();

        names.into_iter().fold(relocated.into_owned(), |acc, name| {
            match self.bare_replacement(name) {
                Some(replacement) => replace_identifier(&acc, name, &replacement),
                None => acc,
            }
        })
    }
}

fn apply_replacements(code: &str, mut replacements: Vec<(usize, usize, String)>) -> String {
    replacements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut out = code.to_string();
    let mut floor = usize::MAX;
    for (start, end, text) in replacements {
        // overlapping edits keep the outermost-first one
        if end > floor || !out.is_char_boundary(start) || !out.is_char_boundary(end) {
            continue;
        }
        out.replace_range(start..end, &text);
        floor = start;
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Names one scope declares: its own declarations plus `var`s hoisted out of
/// nested blocks. Nested functions and classes only contribute their own name.
#[derive(Default)]
struct DeclaredNames {
    names: HashSet<String>,
    nested: bool,
}

impl DeclaredNames {
    fn of_statements(statements: &[Statement<'_>]) -> HashSet<String> {
        let mut collector = Self::default();
        for statement in statements {
            collector.visit_statement(statement);
        }
        collector.names
    }

    fn of_params(params: &FormalParameters<'_>) -> HashSet<String> {
        let mut collector = Self::default();
        collector.visit_formal_parameters(params);
        collector.names
    }

    fn of_pattern(pattern: &BindingPattern<'_>) -> HashSet<String> {
        let mut collector = Self::default();
        collector.visit_binding_pattern(pattern);
        collector.names
    }

    fn of_declaration(decl: &VariableDeclaration<'_>) -> HashSet<String> {
        let mut collector = Self::default();
        for declarator in &decl.declarations {
            collector.visit_binding_pattern(&declarator.id);
        }
        collector.names
    }

    fn within_nested(&mut self, visit: impl FnOnce(&mut Self)) {
        let outer = std::mem::replace(&mut self.nested, true);
        visit(self);
        self.nested = outer;
    }
}

impl<'a> Visit<'a> for DeclaredNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.names.insert(ident.name.to_string());
    }

    // initializers, defaults and types declare nothing in this scope
    fn visit_expression(&mut self, _expr: &Expression<'a>) {}

    fn visit_ts_type_annotation(&mut self, _annotation: &TSTypeAnnotation<'a>) {}

    fn visit_ts_interface_declaration(&mut self, _decl: &TSInterfaceDeclaration<'a>) {}

    fn visit_ts_type_alias_declaration(&mut self, _decl: &TSTypeAliasDeclaration<'a>) {}

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        if let (false, Some(id)) = (self.nested, &func.id) {
            self.names.insert(id.name.to_string());
        }
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if let (false, Some(id)) = (self.nested, &class.id) {
            self.names.insert(id.name.to_string());
        }
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        if self.nested && decl.kind != VariableDeclarationKind::Var {
            return;
        }
        for declarator in &decl.declarations {
            self.visit_binding_pattern(&declarator.id);
        }
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        self.within_nested(|this| walk::walk_block_statement(this, block));
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        self.within_nested(|this| this.visit_block_statement(&clause.body));
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        self.within_nested(|this| walk::walk_for_statement(this, stmt));
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        self.within_nested(|this| walk::walk_for_in_statement(this, stmt));
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        self.within_nested(|this| walk::walk_for_of_statement(this, stmt));
    }
}

struct RelocationCollector<'r, 's> {
    rewriter: &'r IdentifierRewriter<'s>,
    /// Innermost scope last.
    scopes: Vec<HashSet<String>>,
    replacements: Vec<(u32, u32, String)>,
}

impl<'r, 's> RelocationCollector<'r, 's> {
    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn scoped(&mut self, names: HashSet<String>, visit: impl FnOnce(&mut Self)) {
        self.scopes.push(names);
        visit(self);
        self.scopes.pop();
    }
}

impl<'a, 'r, 's> Visit<'a> for RelocationCollector<'r, 's> {
    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        let mut names = DeclaredNames::of_params(&func.params);
        if let Some(id) = &func.id {
            names.insert(id.name.to_string());
        }
        if let Some(body) = &func.body {
            names.extend(DeclaredNames::of_statements(&body.statements));
        }
        self.scoped(names, |this| walk::walk_function(this, func, flags));
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let mut names = DeclaredNames::of_params(&arrow.params);
        names.extend(DeclaredNames::of_statements(&arrow.body.statements));
        self.scoped(names, |this| walk::walk_arrow_function_expression(this, arrow));
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        let names = DeclaredNames::of_statements(&block.body);
        self.scoped(names, |this| walk::walk_block_statement(this, block));
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let names = clause
            .param
            .as_ref()
            .map(|param| DeclaredNames::of_pattern(&param.pattern))
            .unwrap_or_default();
        self.scoped(names, |this| walk::walk_catch_clause(this, clause));
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let names = match &stmt.init {
            Some(ForStatementInit::VariableDeclaration(decl)) => DeclaredNames::of_declaration(decl),
            _ => HashSet::new(),
        };
        self.scoped(names, |this| walk::walk_for_statement(this, stmt));
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let names = loop_head_names(&stmt.left);
        self.scoped(names, |this| walk::walk_for_in_statement(this, stmt));
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let names = loop_head_names(&stmt.left);
        self.scoped(names, |this| walk::walk_for_of_statement(this, stmt));
    }

    fn visit_static_member_expression(&mut self, expr: &StaticMemberExpression<'a>) {
        if let Expression::Identifier(object) = &expr.object {
            let receiver = object.name.as_str();
            if STATE_RECEIVERS.contains(&receiver) && !self.is_local(receiver) {
                let property = expr.property.name.as_str();
                match self.rewriter.member_override(receiver, property) {
                    Some(text) => self
                        .replacements
                        .push((expr.span.start, expr.span.end, text)),
                    None => self.replacements.push((
                        expr.object.span().start,
                        expr.property.span.start,
                        self.rewriter.member_prefix().to_string(),
                    )),
                }
                return;
            }
        }

        walk::walk_static_member_expression(self, expr);
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        let name = ident.name.as_str();
        if self.is_local(name) {
            return;
        }
        if let Some(text) = self.rewriter.bare_replacement(name) {
            self.replacements
                .push((ident.span.start, ident.span.end, text));
        }
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(ident) = &prop.value {
                let name = ident.name.as_str();
                if !self.is_local(name) {
                    if let Some(text) = self.rewriter.bare_replacement(name) {
                        self.replacements.push((
                            ident.span.start,
                            ident.span.end,
                            format!("{name}: {text}"),
                        ));
                    }
                }
                return;
            }
        }

        walk::walk_object_property(self, prop);
    }
}

fn loop_head_names(left: &ForStatementLeft<'_>) -> HashSet<String> {
    match left {
        ForStatementLeft::VariableDeclaration(decl) => DeclaredNames::of_declaration(decl),
        _ => HashSet::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Byte offsets of `name` occurrences that stand alone as identifiers: not
/// part of a longer identifier and not a property access (`a.name`).
fn free_occurrences<'c>(code: &'c str, name: &'c str) -> impl Iterator<Item = usize> + 'c {
    code.match_indices(name).filter_map(move |(idx, _)| {
        let head = &code[..idx];
        let before_ok = match head.chars().next_back() {
            None => true,
            Some('.') => head.ends_with("..."),
            Some(c) => !is_ident_char(c),
        };
        let after_ok = code[idx + name.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident_char(c));
        (before_ok && after_ok).then_some(idx)
    })
}

/// Replaces every free occurrence of identifier `name` with `replacement`.
pub fn replace_identifier(code: &str, name: &str, replacement: &str) -> String {
    if name.is_empty() {
        return code.to_string();
    }

    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for idx in free_occurrences(code, name) {
        if idx < last {
            continue;
        }
        out.push_str(&code[last..idx]);
        out.push_str(replacement);
        last = idx + name.len();
    }
    out.push_str(&code[last..]);
    out
}

pub fn contains_identifier(code: &str, name: &str) -> bool {
    !name.is_empty() && free_occurrences(code, name).next().is_some()
}
