//! # Aurelia Code Generator
//!
//! Backend of a cross-target component compiler. It takes the framework
//! agnostic component IR ([`ir::Component`]) and emits an Aurelia view-model:
//! a TypeScript class decorated with `@inlineView` whose template is rendered
//! from the node tree.
//!
//! ## Pipeline
//!
//! 1. **IR plugins** run before and after ref discovery ([`plugins`]).
//! 2. **View rendering** walks the node tree ([`block`]), classifying every
//!    binding ([`bindings`]) and relocating identifiers ([`rewrite`]).
//! 3. **Imports** are resolved through the caller's mapper and classified by
//!    their usage in the rendered view ([`imports`]).
//! 4. **Assembly** concatenates header, view and class ([`assemble`]), with
//!    the context bridge ([`context`]) and state block ([`state`]).
//! 5. **Code plugins** run around best-effort formatting ([`format`]).
//!
//! ## Invariants
//!
//! - Output is a pure function of IR and options; each call clones its input.
//! - A formatter failure never fails a compile; the unformatted code is kept.
//! - `AureliaOptions::suppressed` turns a compile into a no-op returning `""`.

#[cfg(feature = "napi")]
mod node_bindings;

pub mod assemble;
pub mod bindings;
pub mod block;
pub mod context;
pub mod error;
pub mod format;
pub mod generate;
pub mod imports;
pub mod ir;
pub mod options;
pub mod plugins;
pub mod rewrite;
pub mod state;
pub mod validate;
pub mod visitor;

#[cfg(test)]
mod generate_tests;

pub use error::{CompileError, FormatError, Result};
pub use format::{Formatter, OxcFormatter};
pub use generate::{compile_batch, compile_component, render_template};
pub use imports::{ImportRecord, ImportShape, IMPORT_RECORD_MARKER};
pub use ir::{Binding, Component, Node};
pub use options::{AureliaOptions, Experimental, OptionOverrides, TargetVersion, DEFAULT_OPTIONS};
pub use plugins::{CodeStage, IrStage, PluginStage, Plugins};

#[cfg(feature = "napi")]
pub use node_bindings::{compile_component_native, render_template_native};
