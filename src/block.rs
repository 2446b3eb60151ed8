//! View rendering: walks a node subtree and produces Aurelia template markup.
//!
//! Accumulators are threaded explicitly. Loop index names flow down through
//! [`BlockContext`]; spread sources discovered in a subtree flow back up in
//! the returned [`Block`] and are merged at every recursive boundary, so
//! sibling order cannot leak state between subtrees.

use std::collections::HashSet;

use convert_case::{Case, Casing};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::bindings::{classify_bindings, is_slot_property, strip_slot_prefix, BindingRule};
use crate::error::{CompileError, Result};
use crate::ir::{Binding, Node, NodeKind, INTERNAL_PREFIX, TEXT_KEY};
use crate::rewrite::IdentifierRewriter;

/// Aurelia's positional index inside `repeat.for`.
pub const INDEX_TOKEN: &str = "$index";
/// Aurelia's event object inside `.delegate` handlers.
pub const EVENT_TOKEN: &str = "$event";

lazy_static! {
    static ref SELF_CLOSING_TAGS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();
    static ref TAG_END_RE: Regex = Regex::new(r"/>|>").unwrap();
}

/// Where in the tree a node is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Root,
    ForBody,
    ShowBody,
    ElseBody,
    Fragment,
    Slot,
    Children,
}

#[derive(Debug, Clone)]
pub struct BlockContext {
    pub placement: Placement,
    /// Loop index names in scope for the current subtree.
    pub index_names: Vec<String>,
}

impl BlockContext {
    pub fn root() -> Self {
        Self {
            placement: Placement::Root,
            index_names: Vec::new(),
        }
    }

    fn nested(&self, placement: Placement) -> Self {
        Self {
            placement,
            index_names: self.index_names.clone(),
        }
    }

    fn tracks_index(&self, code: &str) -> bool {
        self.index_names.iter().any(|name| name == code)
    }
}

/// Rendered markup plus the spread sources found while rendering it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub markup: String,
    pub spreads: Vec<String>,
}

impl Block {
    fn markup(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            spreads: Vec::new(),
        }
    }
}

pub struct BlockGenerator<'g> {
    rewriter: IdentifierRewriter<'g>,
    /// Fields that hold callables; a handler naming one is turned into a call.
    callable: &'g HashSet<String>,
}

impl<'g> BlockGenerator<'g> {
    pub fn new(rewriter: IdentifierRewriter<'g>, callable: &'g HashSet<String>) -> Self {
        Self { rewriter, callable }
    }

    pub fn render(&self, node: &Node, ctx: &BlockContext) -> Result<Block> {
        trace!(node = %node.name, placement = ?ctx.placement, "render node");

        match node.kind() {
            NodeKind::Fragment => {
                self.render_all(&node.children, &ctx.nested(Placement::Fragment), "\n")
            }
            NodeKind::Slot => self.render_slot(node, ctx),
            NodeKind::Children => Ok(Block::markup("<slot></slot>")),
            NodeKind::LiteralText => Ok(Block::markup(
                node.properties.get(TEXT_KEY).cloned().unwrap_or_default(),
            )),
            NodeKind::BoundText => Ok(self.render_text(node, ctx)),
            NodeKind::For => self.render_for(node, ctx),
            NodeKind::Show => self.render_show(node, ctx),
            NodeKind::Element => self.render_element(node, ctx),
        }
    }

    /// Renders siblings in order, joining their markup with `separator`.
    pub fn render_all(&self, nodes: &[Node], ctx: &BlockContext, separator: &str) -> Result<Block> {
        let mut markup = Vec::with_capacity(nodes.len());
        let mut spreads = Vec::new();
        for node in nodes {
            let block = self.render(node, ctx)?;
            markup.push(block.markup);
            spreads.extend(block.spreads);
        }
        Ok(Block {
            markup: markup.join(separator),
            spreads,
        })
    }

    /// View expression for an attribute value or interpolation.
    fn expression(&self, code: &str) -> String {
        encode_quotes(self.rewriter.rewrite(code).trim())
    }

    fn render_text(&self, node: &Node, ctx: &BlockContext) -> Block {
        let code = node
            .bindings
            .get(TEXT_KEY)
            .map(|b| self.expression(&b.code))
            .unwrap_or_default();

        if is_slot_property(&code) {
            let selector = kebab_case(strip_slot_prefix(&code));
            return Block::markup(format!("<slot select=\"[{selector}]\"></slot>"));
        }

        if ctx.tracks_index(&code) {
            return Block::markup(format!("${{{INDEX_TOKEN}}}"));
        }

        Block::markup(format!("${{{code}}}"))
    }

    fn render_slot(&self, node: &Node, ctx: &BlockContext) -> Result<Block> {
        let name = node
            .properties
            .get("name")
            .cloned()
            .or_else(|| node.bindings.get("name").map(|b| self.expression(&b.code)));

        let mut markup = String::from("\n<slot");
        if let Some(name) = name {
            let selector = kebab_case(strip_slot_prefix(name.trim()));
            markup.push_str(&format!(" name=\"{selector}\""));
        }
        markup.push('>');

        let content: Vec<String> = node
            .bindings
            .iter()
            .filter(|(key, _)| key.as_str() != "name")
            .map(|(_, binding)| self.expression(&binding.code))
            .collect();
        markup.push_str(&content.join("\n"));

        let children = self.render_all(&node.children, &ctx.nested(Placement::Slot), "\n")?;
        markup.push_str(&children.markup);
        markup.push_str("</slot>");

        Ok(Block {
            markup,
            spreads: children.spreads,
        })
    }

    fn render_for(&self, node: &Node, ctx: &BlockContext) -> Result<Block> {
        let each = node
            .bindings
            .get("each")
            .filter(|b| !b.code.trim().is_empty())
            .ok_or_else(|| CompileError::malformed(&node.name, "For node has no `each` binding"))?;
        let item = node
            .scope
            .for_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CompileError::malformed(&node.name, "For node has no loop variable name"))?;

        let mut inner = ctx.nested(Placement::ForBody);
        if let Some(index) = node.scope.index_name.as_deref().filter(|i| !i.is_empty()) {
            inner.index_names.push(index.to_string());
        }

        let body = self.render_all(&node.children, &inner, "\n")?;
        Ok(Block {
            markup: format!(
                "<template repeat.for=\"{} of {}\">{}</template>",
                item,
                self.expression(&each.code),
                body.markup
            ),
            spreads: body.spreads,
        })
    }

    fn render_show(&self, node: &Node, ctx: &BlockContext) -> Result<Block> {
        let when = node
            .bindings
            .get("when")
            .ok_or_else(|| CompileError::malformed(&node.name, "Show node has no `when` binding"))?;

        let body = self.render_all(&node.children, &ctx.nested(Placement::ShowBody), "\n")?;
        let mut block = Block {
            markup: format!(
                "<template if.bind=\"{}\">{}</template>",
                self.expression(&when.code),
                body.markup
            ),
            spreads: body.spreads,
        };

        if let Some(branch) = &node.meta.else_branch {
            let other = self.render(branch, &ctx.nested(Placement::ElseBody))?;
            block
                .markup
                .push_str(&format!("<template else>\n{}\n</template>", other.markup));
            block.spreads.extend(other.spreads);
        }

        Ok(block)
    }

    fn render_element(&self, node: &Node, ctx: &BlockContext) -> Result<Block> {
        let tag = kebab_case(&node.name);
        let mut markup = format!("<{tag}");
        let mut spreads = Vec::new();
        let mut projected = Vec::new();

        for (key, value) in &node.properties {
            if key.starts_with(INTERNAL_PREFIX) || key == TEXT_KEY {
                continue;
            }
            markup.push_str(&format!(" {key}=\"{value}\""));
        }

        for (key, binding, rule) in classify_bindings(node) {
            match rule {
                BindingRule::Spread { index } => {
                    let source = self.expression(&binding.code);
                    let suffix = index.map(|i| i.to_string()).unwrap_or_default();
                    markup.push_str(&format!(" spreadProps{suffix}.bind=\"{source}\""));
                    spreads.push(source);
                }
                BindingRule::UnresolvedSpread | BindingRule::Internal => {}
                BindingRule::Event {
                    suppressed: true, ..
                } => {}
                BindingRule::Event { event, .. } => {
                    let handler = self.event_handler(binding);
                    markup.push_str(&format!(" {event}.delegate=\"{handler}\""));
                }
                BindingRule::Class => {
                    let code = self.expression(&binding.code);
                    markup.push_str(&format!(" class=\"${{{code}}}\""));
                }
                BindingRule::Ref => {
                    let code = self.expression(&binding.code);
                    markup.push_str(&format!(" ref=\"{code}\""));
                }
                BindingRule::SlotContent { attribute } => {
                    // markup, not an attribute value: no quote encoding
                    let content = self.rewriter.rewrite(&binding.code);
                    let tagged = TAG_END_RE.replace(content.trim(), format!(" {attribute}>"));
                    projected.push(tagged.into_owned());
                }
                BindingRule::Mapped { target } => {
                    let code = self.expression(&binding.code);
                    markup.push_str(&format!(" {target}.bind=\"{code}\""));
                }
                BindingRule::Attribute => {
                    let code = self.expression(&binding.code);
                    let value = if ctx.tracks_index(&code) {
                        INDEX_TOKEN.to_string()
                    } else {
                        code
                    };
                    markup.push_str(&format!(" {key}.bind=\"{value}\""));
                }
            }
        }

        if SELF_CLOSING_TAGS.contains(node.name.as_str()) {
            markup.push_str(" />");
            return Ok(Block { markup, spreads });
        }

        markup.push('>');
        markup.push_str(&projected.join(""));

        let children = self.render_all(&node.children, &ctx.nested(Placement::Children), "\n")?;
        markup.push_str(&children.markup);
        spreads.extend(children.spreads);

        markup.push_str(&format!("\n</{tag}>"));
        Ok(Block { markup, spreads })
    }

    fn event_handler(&self, binding: &Binding) -> String {
        let param = binding
            .arguments
            .as_ref()
            .and_then(|args| args.first())
            .map(String::as_str)
            .unwrap_or("event");

        let code = self
            .rewriter
            .clone()
            .renaming(param, EVENT_TOKEN)
            .rewrite(&binding.code);
        let mut handler = remove_surrounding_block(code.trim()).trim().to_string();
        if self.callable.contains(&handler) {
            handler.push_str("()");
        }
        encode_quotes(&handler)
    }
}

/// `MyButton` → `my-button`; lowercase tags such as `h1` are kept as written.
pub fn kebab_case(name: &str) -> String {
    let needs_conversion = name
        .chars()
        .any(|c| c.is_uppercase() || c == '_' || c.is_whitespace());
    if needs_conversion {
        name.to_case(Case::Kebab)
    } else {
        name.to_string()
    }
}

/// Prefixes every non-blank line with `width` spaces.
pub fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn encode_quotes(code: &str) -> String {
    code.replace('"', "&quot;")
}

fn remove_surrounding_block(code: &str) -> &str {
    code.strip_prefix('{')
        .and_then(|inner| inner.strip_suffix('}'))
        .unwrap_or(code)
}
