use indexmap::IndexMap;

use crate::ir::{StateKind, StateValue};
use crate::rewrite::IdentifierRewriter;

/// Class members for the component state, one entry per state value.
pub fn state_members(
    state: &IndexMap<String, StateValue>,
    rewriter: &IdentifierRewriter,
) -> Vec<String> {
    state
        .iter()
        .map(|(name, value)| {
            let code = rewriter.rewrite(&value.code);
            match value.kind {
                StateKind::Data | StateKind::Function => match &value.type_parameter {
                    Some(ty) => format!("{name}: {ty} = {code};"),
                    None => format!("{name} = {code};"),
                },
                StateKind::Method | StateKind::Getter => code,
            }
        })
        .collect()
}

/// Object literal for a context value, keeping methods and getters as members.
pub fn stringify_context_value(value: &IndexMap<String, StateValue>) -> String {
    let members: Vec<String> = value
        .iter()
        .map(|(name, entry)| match entry.kind {
            StateKind::Data | StateKind::Function => format!("{name}: {}", entry.code),
            StateKind::Method | StateKind::Getter => entry.code.clone(),
        })
        .collect();

    if members.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", members.join(", "))
    }
}
