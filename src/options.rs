//! Generator configuration.
//!
//! `DEFAULT_OPTIONS` is a process-wide snapshot that is only ever cloned.
//! Per-call settings are layered on top with [`AureliaOptions::merged`],
//! which returns a fresh value.

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::{Formatter, OxcFormatter};
use crate::imports::ImportShape;
use crate::ir::{Component, ImportDecl};
use crate::plugins::Plugins;

/// `(component, import, shape, components_used, path) -> markup or record`
pub type ImportMapper =
    Arc<dyn Fn(&Component, &ImportDecl, &ImportShape, &[String], &str) -> String + Send + Sync>;

/// `(field_name, type_name) -> constructor parameter`
pub type InjectableShape = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// `(component, output_name) -> field declaration`
pub type OutputShape = Arc<dyn Fn(&Component, &str) -> String + Send + Sync>;

lazy_static! {
    pub static ref DEFAULT_OPTIONS: AureliaOptions = AureliaOptions {
        version: TargetVersion::V1,
        preserve_imports: true,
        preserve_file_extensions: false,
        format: true,
        suppressed: false,
        register_custom_element: true,
        import_mapper: None,
        experimental: Experimental::default(),
        plugins: Plugins::default(),
        formatter: Arc::new(OxcFormatter),
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET VERSION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum TargetVersion {
    #[default]
    V1,
    V2,
}

impl TargetVersion {
    /// V1 views must be wrapped in a `<template>` root.
    pub fn wraps_template(self) -> bool {
        match self {
            TargetVersion::V1 => true,
            TargetVersion::V2 => false,
        }
    }

    /// Element used to pull a custom element into a view.
    pub fn import_keyword(self) -> &'static str {
        match self {
            TargetVersion::V1 => "require",
            TargetVersion::V2 => "import",
        }
    }
}

impl TryFrom<u8> for TargetVersion {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(TargetVersion::V1),
            2 => Ok(TargetVersion::V2),
            other => Err(format!("unsupported Aurelia version {other}")),
        }
    }
}

impl From<TargetVersion> for u8 {
    fn from(version: TargetVersion) -> Self {
        match version {
            TargetVersion::V1 => 1,
            TargetVersion::V2 => 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Overrides for generated dependency-injection and output code.
#[derive(Clone, Default)]
pub struct Experimental {
    pub injectables: Option<InjectableShape>,
    pub inject: bool,
    pub outputs: Option<OutputShape>,
}

#[derive(Clone)]
pub struct AureliaOptions {
    pub version: TargetVersion,
    /// Keep imports of other component sources.
    pub preserve_imports: bool,
    pub preserve_file_extensions: bool,
    /// Run the formatter over the assembled code.
    pub format: bool,
    /// Dry run: the compile returns an empty string without doing any work.
    /// Set by callers that invoke the generator while building diagnostics.
    pub suppressed: bool,
    /// Emit `@customElement("…")` on the view-model.
    pub register_custom_element: bool,
    pub import_mapper: Option<ImportMapper>,
    pub experimental: Experimental,
    pub plugins: Plugins,
    pub formatter: Arc<dyn Formatter>,
}

impl Default for AureliaOptions {
    fn default() -> Self {
        DEFAULT_OPTIONS.clone()
    }
}

impl AureliaOptions {
    pub fn with_version(mut self, version: TargetVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_import_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Component, &ImportDecl, &ImportShape, &[String], &str) -> String
            + Send
            + Sync
            + 'static,
    {
        self.import_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_plugins(mut self, plugins: Plugins) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn with_experimental(mut self, experimental: Experimental) -> Self {
        self.experimental = experimental;
        self
    }

    pub fn unformatted(mut self) -> Self {
        self.format = false;
        self
    }

    pub fn suppressed(mut self) -> Self {
        self.suppressed = true;
        self
    }

    /// Returns a copy with every set override applied.
    pub fn merged(&self, overrides: &OptionOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(version) = overrides.aurelia_version {
            merged.version = version;
        }
        if let Some(value) = overrides.preserve_imports {
            merged.preserve_imports = value;
        }
        if let Some(value) = overrides.preserve_file_extensions {
            merged.preserve_file_extensions = value;
        }
        if let Some(value) = overrides.format {
            merged.format = value;
        }
        if let Some(value) = overrides.suppressed {
            merged.suppressed = value;
        }
        if let Some(value) = overrides.register_custom_element {
            merged.register_custom_element = value;
        }
        if let Some(value) = overrides.experimental.inject {
            merged.experimental.inject = value;
        }
        merged
    }

    /// Defaults merged with overrides decoded from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: OptionOverrides = serde_json::from_str(json)?;
        Ok(DEFAULT_OPTIONS.merged(&overrides))
    }
}

impl fmt::Debug for AureliaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AureliaOptions")
            .field("version", &self.version)
            .field("preserve_imports", &self.preserve_imports)
            .field("preserve_file_extensions", &self.preserve_file_extensions)
            .field("format", &self.format)
            .field("suppressed", &self.suppressed)
            .field("register_custom_element", &self.register_custom_element)
            .field("import_mapper", &self.import_mapper.is_some())
            .field("inject", &self.experimental.inject)
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Serializable subset of [`AureliaOptions`]; unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionOverrides {
    #[serde(default)]
    pub aurelia_version: Option<TargetVersion>,
    #[serde(default)]
    pub preserve_imports: Option<bool>,
    #[serde(default)]
    pub preserve_file_extensions: Option<bool>,
    #[serde(default)]
    pub format: Option<bool>,
    #[serde(default)]
    pub suppressed: Option<bool>,
    #[serde(default)]
    pub register_custom_element: Option<bool>,
    #[serde(default)]
    pub experimental: ExperimentalOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalOverrides {
    #[serde(default)]
    pub inject: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AureliaOptions::default();
        assert_eq!(options.version, TargetVersion::V1);
        assert!(options.preserve_imports);
        assert!(!options.preserve_file_extensions);
        assert!(options.format);
        assert!(!options.suppressed);
    }

    #[test]
    fn test_merge_leaves_defaults_untouched() {
        let options = AureliaOptions::from_json(r#"{ "aureliaVersion": 2, "format": false }"#)
            .unwrap();
        assert_eq!(options.version, TargetVersion::V2);
        assert!(!options.format);
        assert!(options.preserve_imports, "unset fields keep the default");

        assert_eq!(DEFAULT_OPTIONS.version, TargetVersion::V1);
        assert!(DEFAULT_OPTIONS.format);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        assert!(AureliaOptions::from_json(r#"{ "aureliaVersion": 3 }"#).is_err());
    }

    #[test]
    fn test_version_keywords() {
        assert_eq!(TargetVersion::V1.import_keyword(), "require");
        assert_eq!(TargetVersion::V2.import_keyword(), "import");
        assert!(TargetVersion::V1.wraps_template());
        assert!(!TargetVersion::V2.wraps_template());
    }
}
