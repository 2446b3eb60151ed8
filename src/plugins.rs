//! Caller-supplied transforms run at four fixed points of the pipeline.
//!
//! IR stages receive and return a `Component`; code stages receive and return
//! the generated source. Transforms in a stage run in registration order and
//! the first `Err` aborts the compile.

use std::fmt;
use std::sync::Arc;

use crate::error::{CompileError, PluginError, Result};
use crate::ir::Component;

pub type PluginResult<T> = std::result::Result<T, PluginError>;

pub type IrTransform = Arc<dyn Fn(Component) -> PluginResult<Component> + Send + Sync>;
pub type CodeTransform = Arc<dyn Fn(String) -> PluginResult<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStage {
    PreIr,
    PostIr,
    PreCode,
    PostCode,
}

impl fmt::Display for PluginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginStage::PreIr => "pre-ir",
            PluginStage::PostIr => "post-ir",
            PluginStage::PreCode => "pre-code",
            PluginStage::PostCode => "post-code",
        };
        f.write_str(name)
    }
}

/// Stages operating on the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrStage {
    /// Before any metadata is collected.
    Pre,
    /// After refs and imports are known, before the template renders.
    Post,
}

/// Stages operating on the generated source, around formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStage {
    Pre,
    Post,
}

impl From<IrStage> for PluginStage {
    fn from(stage: IrStage) -> Self {
        match stage {
            IrStage::Pre => PluginStage::PreIr,
            IrStage::Post => PluginStage::PostIr,
        }
    }
}

impl From<CodeStage> for PluginStage {
    fn from(stage: CodeStage) -> Self {
        match stage {
            CodeStage::Pre => PluginStage::PreCode,
            CodeStage::Post => PluginStage::PostCode,
        }
    }
}

#[derive(Clone, Default)]
pub struct Plugins {
    pre_ir: Vec<IrTransform>,
    post_ir: Vec<IrTransform>,
    pre_code: Vec<CodeTransform>,
    post_code: Vec<CodeTransform>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pre_ir<F>(mut self, transform: F) -> Self
    where
        F: Fn(Component) -> PluginResult<Component> + Send + Sync + 'static,
    {
        self.pre_ir.push(Arc::new(transform));
        self
    }

    pub fn post_ir<F>(mut self, transform: F) -> Self
    where
        F: Fn(Component) -> PluginResult<Component> + Send + Sync + 'static,
    {
        self.post_ir.push(Arc::new(transform));
        self
    }

    pub fn pre_code<F>(mut self, transform: F) -> Self
    where
        F: Fn(String) -> PluginResult<String> + Send + Sync + 'static,
    {
        self.pre_code.push(Arc::new(transform));
        self
    }

    pub fn post_code<F>(mut self, transform: F) -> Self
    where
        F: Fn(String) -> PluginResult<String> + Send + Sync + 'static,
    {
        self.post_code.push(Arc::new(transform));
        self
    }

    pub fn run_ir(&self, stage: IrStage, component: Component) -> Result<Component> {
        let transforms = match stage {
            IrStage::Pre => &self.pre_ir,
            IrStage::Post => &self.post_ir,
        };
        transforms.iter().try_fold(component, |acc, transform| {
            transform(acc).map_err(|source| CompileError::Plugin {
                stage: stage.into(),
                source,
            })
        })
    }

    pub fn run_code(&self, stage: CodeStage, code: String) -> Result<String> {
        let transforms = match stage {
            CodeStage::Pre => &self.pre_code,
            CodeStage::Post => &self.post_code,
        };
        transforms.iter().try_fold(code, |acc, transform| {
            transform(acc).map_err(|source| CompileError::Plugin {
                stage: stage.into(),
                source,
            })
        })
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugins")
            .field("pre_ir", &self.pre_ir.len())
            .field("post_ir", &self.post_ir.len())
            .field("pre_code", &self.pre_code.len())
            .field("post_code", &self.post_code.len())
            .finish()
    }
}
