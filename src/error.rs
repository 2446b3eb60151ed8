use thiserror::Error;

use crate::plugins::PluginStage;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_MALFORMED_IR: &str = "AUR001";
pub const ERR_IMPORT_RECORD: &str = "AUR002";
pub const ERR_PLUGIN: &str = "AUR003";
pub const ERR_JSON: &str = "AUR004";

pub type Result<T> = std::result::Result<T, CompileError>;

/// Boxed error a caller-supplied transform may return.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum CompileError {
    /// A required node or component field is missing. `path` locates the
    /// node, e.g. `MyComponent > div[0] > For[1]`.
    #[error("malformed IR at {path}: {message}")]
    MalformedIr { path: String, message: String },

    #[error("import record could not be decoded: {segment}")]
    ImportRecord {
        segment: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage} plugin failed: {source}")]
    Plugin {
        stage: PluginStage,
        #[source]
        source: PluginError,
    },

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::MalformedIr {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::MalformedIr { .. } => ERR_MALFORMED_IR,
            CompileError::ImportRecord { .. } => ERR_IMPORT_RECORD,
            CompileError::Plugin { .. } => ERR_PLUGIN,
            CompileError::Json(_) => ERR_JSON,
        }
    }
}

/// Returned by formatters. Never escapes a compile call.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("source does not parse: {0}")]
    Syntax(String),
}
