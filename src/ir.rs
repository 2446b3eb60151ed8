//! Component IR consumed by the Aurelia backend.
//!
//! The tree is produced upstream by a source-framework parser and arrives
//! either as Rust values or as the JSON those parsers emit. Nothing here has
//! behavior beyond small lookups; the rendering rules live in `block` and
//! `assemble`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// RESERVED NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Control-flow node names lowered to target constructs instead of tags.
pub const BUILT_IN_COMPONENTS: [&str; 4] = ["Show", "For", "Fragment", "Slot"];

/// Literal/interpolated text sentinel, used both as property and binding key.
pub const TEXT_KEY: &str = "_text";

/// Binding keys starting with this prefix are internal and never emitted.
pub const INTERNAL_PREFIX: char = '$';

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub state: IndexMap<String, StateValue>,
    /// Declared prop names. Props referenced as `props.x` in code are added
    /// during generation even when undeclared.
    #[serde(default)]
    pub props: Vec<String>,
    /// External type used to annotate prop fields (`T["name"]`).
    #[serde(default)]
    pub props_type_ref: Option<String>,
    /// Prop name → default value expression.
    #[serde(default)]
    pub default_props: IndexMap<String, String>,
    #[serde(default)]
    pub refs: IndexMap<String, RefDecl>,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(default)]
    pub context: ContextDecls,
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    #[serde(default)]
    pub exports: IndexMap<String, ExportDecl>,
    /// Event outputs exposed to the parent.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Raw type declarations emitted ahead of the class.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub meta: IndexMap<String, serde_json::Value>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// State entries that may be turned into explicit calls.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.state
            .iter()
            .filter(|(_, value)| value.kind.is_callable())
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    #[default]
    #[serde(alias = "property")]
    Data,
    Function,
    Method,
    Getter,
}

impl StateKind {
    pub fn is_callable(self) -> bool {
        matches!(self, StateKind::Function | StateKind::Method)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateValue {
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: StateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_parameter: Option<String>,
}

impl StateValue {
    pub fn data(code: impl Into<String>) -> Self {
        Self::with_kind(StateKind::Data, code)
    }

    pub fn with_kind(kind: StateKind, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind,
            type_parameter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefDecl {
    #[serde(default)]
    pub argument: String,
    #[serde(default)]
    pub type_parameter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Hook {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UpdateHook {
    pub code: String,
    #[serde(default, alias = "rawDeps")]
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Hooks {
    #[serde(default)]
    pub on_init: Option<Hook>,
    #[serde(default)]
    pub on_mount: Option<Hook>,
    #[serde(default)]
    pub on_update: Vec<UpdateHook>,
    #[serde(default, alias = "onUnMount")]
    pub on_unmount: Option<Hook>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContextDecls {
    /// Local field name → source context.
    #[serde(default)]
    pub get: IndexMap<String, ContextGet>,
    #[serde(default)]
    pub set: Vec<ContextSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextGet {
    /// Source context key; also the injected type unless `type` is given.
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
}

impl ContextGet {
    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSet {
    pub name: String,
    #[serde(default)]
    pub value: Option<IndexMap<String, StateValue>>,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Default,
    #[serde(alias = "*")]
    Star,
    Named,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    /// Local name → import kind, in declaration order.
    #[serde(default)]
    pub imports: IndexMap<String, ImportKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDecl {
    pub code: String,
    #[serde(default)]
    pub used_in_local: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub bindings: IndexMap<String, Binding>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub scope: LoopScope,
    #[serde(default)]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    #[default]
    Normal,
    Spread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub code: String,
    #[serde(default)]
    pub raw_code: String,
    #[serde(rename = "type", default)]
    pub kind: BindingKind,
    /// Callback parameter names for event bindings.
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
}

impl Binding {
    pub fn new(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            raw_code: code.clone(),
            code,
            kind: BindingKind::Normal,
            arguments: None,
        }
    }

    pub fn spread(code: impl Into<String>) -> Self {
        Self {
            kind: BindingKind::Spread,
            ..Self::new(code)
        }
    }

    pub fn with_arguments(mut self, arguments: &[&str]) -> Self {
        self.arguments = Some(arguments.iter().map(|a| a.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoopScope {
    #[serde(default)]
    pub for_name: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeMeta {
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_branch: Option<Box<Node>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Rendering rule selected by a node's name and text sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Fragment,
    Slot,
    /// Passthrough for content projected by the parent.
    Children,
    LiteralText,
    BoundText,
    For,
    Show,
    Element,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new("div").with_property(TEXT_KEY, value)
    }

    pub fn text_binding(code: impl Into<String>) -> Self {
        Self::new("div").with_binding(TEXT_KEY, Binding::new(code))
    }

    pub fn for_each(item: &str, index: Option<&str>, each: impl Into<String>) -> Self {
        let mut node = Self::new("For").with_binding("each", Binding::new(each));
        node.scope = LoopScope {
            for_name: Some(item.to_string()),
            index_name: index.map(str::to_string),
        };
        node
    }

    pub fn show(when: impl Into<String>) -> Self {
        Self::new("Show").with_binding("when", Binding::new(when))
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_binding(mut self, key: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(key.into(), binding);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_else(mut self, branch: Node) -> Self {
        self.meta.else_branch = Some(Box::new(branch));
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.name.as_str() {
            "Fragment" => return NodeKind::Fragment,
            "Slot" => return NodeKind::Slot,
            _ => {}
        }

        if let Some(text) = self.bindings.get(TEXT_KEY) {
            let code = text.code.trim();
            if code == "props.children" || code == "children" {
                return NodeKind::Children;
            }
        }

        if self.properties.contains_key(TEXT_KEY) {
            return NodeKind::LiteralText;
        }

        if self
            .bindings
            .get(TEXT_KEY)
            .is_some_and(|b| !b.code.trim().is_empty())
        {
            return NodeKind::BoundText;
        }

        match self.name.as_str() {
            "For" => NodeKind::For,
            "Show" => NodeKind::Show,
            _ => NodeKind::Element,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_dispatch() {
        assert_eq!(Node::new("Fragment").kind(), NodeKind::Fragment);
        assert_eq!(Node::new("Slot").kind(), NodeKind::Slot);
        assert_eq!(Node::text("hi").kind(), NodeKind::LiteralText);
        assert_eq!(Node::text_binding("state.name").kind(), NodeKind::BoundText);
        assert_eq!(
            Node::text_binding("props.children").kind(),
            NodeKind::Children
        );
        assert_eq!(Node::for_each("item", None, "items").kind(), NodeKind::For);
        assert_eq!(Node::show("state.open").kind(), NodeKind::Show);
        assert_eq!(Node::new("button").kind(), NodeKind::Element);
    }

    #[test]
    fn test_decode_ir_json() {
        let json = serde_json::json!({
            "name": "MyComponent",
            "state": {
                "name": { "code": "\"Steve\"", "type": "property" },
                "greet": { "code": "greet() { return 1 }", "type": "method" }
            },
            "hooks": { "onUnMount": { "code": "cleanup()" } },
            "children": [{
                "name": "Show",
                "bindings": { "when": { "code": "state.open" } },
                "meta": { "else": { "name": "span" }, "custom": 1 }
            }],
            "imports": [{ "path": "./child.lite", "imports": { "Child": "default", "ns": "*" } }]
        });
        let component: Component = serde_json::from_value(json).unwrap();

        assert_eq!(component.state["name"].kind, StateKind::Data);
        assert_eq!(component.method_names().collect::<Vec<_>>(), vec!["greet"]);
        assert!(component.hooks.on_unmount.is_some());
        let show = &component.children[0];
        assert_eq!(show.meta.else_branch.as_ref().unwrap().name, "span");
        assert!(show.meta.extra.contains_key("custom"));
        assert_eq!(component.imports[0].imports["ns"], ImportKind::Star);
    }
}
