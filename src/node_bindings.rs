//! JavaScript host bindings. JSON in, source text out.

use napi_derive::napi;

use crate::generate::{compile_component, render_template};
use crate::ir::{Component, Node};
use crate::options::AureliaOptions;

fn options_from(options_json: Option<String>) -> napi::Result<AureliaOptions> {
    match options_json {
        Some(json) => {
            AureliaOptions::from_json(&json).map_err(|e| napi::Error::from_reason(e.to_string()))
        }
        None => Ok(AureliaOptions::default()),
    }
}

#[napi]
pub fn compile_component_native(
    component_json: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let component =
        Component::from_json(&component_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let options = options_from(options_json)?;
    compile_component(&component, &options).map_err(|e| {
        napi::Error::from_reason(format!("[{}] {}", e.code(), e))
    })
}

#[napi]
pub fn render_template_native(
    node_json: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let node: Node =
        serde_json::from_str(&node_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let options = options_from(options_json)?;
    render_template(&node, &options).map_err(|e| {
        napi::Error::from_reason(format!("[{}] {}", e.code(), e))
    })
}
