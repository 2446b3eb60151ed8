//! Import resolution and usage-based classification.
//!
//! Each declared import goes through the caller's mapper, which answers with
//! either plain code or a JSON [`ImportRecord`] followed by
//! [`IMPORT_RECORD_MARKER`]. The concatenated answers form one channel string.
//! After a split on the marker the last segment is the local-exports payload
//! and every other non-empty segment decodes as a record.
//!
//! Usage detection is textual: a record is a custom element iff its closing
//! tag occurs in the rendered template, and a named binding is re-exposed iff
//! its name occurs anywhere in the template text.

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::kebab_case;
use crate::error::{CompileError, Result};
use crate::ir::{Component, ImportDecl, ImportKind};
use crate::options::{AureliaOptions, TargetVersion};
use crate::rewrite::contains_identifier;

/// Terminates one JSON import record on the mapper channel.
pub const IMPORT_RECORD_MARKER: &str = "/*__AURELIA_IMPORT_RECORD__*/";

lazy_static! {
    static ref COMPONENT_SOURCE_RE: Regex = Regex::new(r"\.lite(\.tsx|\.jsx)?$").unwrap();
}

/// Local names of one import declaration, grouped by import kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportShape {
    pub default_import: Option<String>,
    pub star_import: Option<String>,
    pub named_imports: Vec<String>,
}

impl ImportShape {
    pub fn from_decl(decl: &ImportDecl) -> Self {
        let mut shape = Self::default();
        for (name, kind) in &decl.imports {
            match kind {
                ImportKind::Default => shape.default_import = Some(name.clone()),
                ImportKind::Star => shape.star_import = Some(name.clone()),
                ImportKind::Named => shape.named_imports.push(name.clone()),
            }
        }
        shape
    }

    /// Plain ES import statement for `path`.
    pub fn to_es_import(&self, path: &str) -> String {
        if let Some(star) = &self.star_import {
            return match &self.default_import {
                Some(default) => format!("import {default}, * as {star} from '{path}';"),
                None => format!("import * as {star} from '{path}';"),
            };
        }

        let mut clauses = Vec::new();
        if let Some(default) = &self.default_import {
            clauses.push(default.clone());
        }
        if !self.named_imports.is_empty() {
            clauses.push(format!("{{ {} }}", self.named_imports.join(", ")));
        }

        if clauses.is_empty() {
            format!("import '{path}';")
        } else {
            format!("import {} from '{path}';", clauses.join(", "))
        }
    }
}

/// Structured answer of an import mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Canonical name; its kebab-case closing tag marks template usage.
    pub name: String,
    /// Module path used by the template import.
    pub path: String,
    /// Code-level import statement.
    pub js_path: String,
    #[serde(default)]
    pub imports: IndexMap<String, ImportKind>,
}

impl ImportRecord {
    /// Record for `decl` with the canonical name taken from its default import.
    pub fn for_decl(decl: &ImportDecl, path: &str) -> Self {
        let shape = ImportShape::from_decl(decl);
        let name = shape
            .default_import
            .clone()
            .or_else(|| shape.star_import.clone())
            .or_else(|| shape.named_imports.first().cloned())
            .unwrap_or_default();

        Self {
            name,
            path: path.to_string(),
            js_path: shape.to_es_import(path),
            imports: decl.imports.clone(),
        }
    }

    /// Channel encoding: the JSON record followed by the marker.
    pub fn encode(&self) -> Result<String> {
        Ok(format!("{}{}", serde_json::to_string(self)?, IMPORT_RECORD_MARKER))
    }

    fn closing_tag(&self) -> String {
        format!("</{}>", kebab_case(&self.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImports {
    /// Decoded records in declaration order.
    pub records: Vec<ImportRecord>,
    /// Trailing payload: mapper output without a marker plus local export code.
    pub local_exports: String,
}

pub fn is_component_source(path: &str) -> bool {
    path.contains(".lite")
}

pub fn strip_component_extension(path: &str) -> String {
    COMPONENT_SOURCE_RE.replace(path, "").into_owned()
}

/// Runs every kept import through the mapper and decodes the channel.
pub fn resolve_imports(
    component: &Component,
    options: &AureliaOptions,
    components_used: &[String],
) -> Result<ResolvedImports> {
    let mut channel = Vec::new();

    for decl in &component.imports {
        if !options.preserve_imports && is_component_source(&decl.path) {
            continue;
        }

        let path = if options.preserve_file_extensions {
            decl.path.clone()
        } else {
            strip_component_extension(&decl.path)
        };
        let shape = ImportShape::from_decl(decl);

        let rendered = match &options.import_mapper {
            Some(mapper) => mapper(component, decl, &shape, components_used, &path),
            None => shape.to_es_import(&path),
        };
        channel.push(rendered);
    }

    for export in component.exports.values() {
        channel.push(export.code.clone());
    }

    split_channel(&channel.join("\n"))
}

/// Splits a channel string into records and the trailing local-exports payload.
pub fn split_channel(channel: &str) -> Result<ResolvedImports> {
    let mut segments: Vec<&str> = channel.split(IMPORT_RECORD_MARKER).collect();
    segments.reverse();

    let mut segments = segments.into_iter();
    let local_exports = segments.next().unwrap_or_default().trim().to_string();

    let mut records = Vec::new();
    for segment in segments {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(segment).map_err(|source| CompileError::ImportRecord {
            segment: segment.to_string(),
            source,
        })?;
        records.push(record);
    }
    records.reverse();

    Ok(ResolvedImports {
        records,
        local_exports,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportClassification {
    /// Records used as elements in the view; listed as template imports.
    pub custom_elements: Vec<ImportRecord>,
    /// Everything else; emitted as code-level import statements.
    pub code_imports: Vec<ImportRecord>,
    /// Named bindings of non-element records that occur in the view text.
    pub template_vars: IndexSet<String>,
}

impl ImportClassification {
    pub fn is_custom_element(&self, name: &str) -> bool {
        self.custom_elements.iter().any(|record| record.name == name)
    }

    /// Template-level import markup for the target version.
    pub fn template_imports(&self, version: TargetVersion) -> String {
        let keyword = version.import_keyword();
        self.custom_elements
            .iter()
            .map(|record| format!("<{keyword} from=\"{}\"></{keyword}>", record.path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn code_import_statements(&self) -> Vec<&str> {
        self.code_imports
            .iter()
            .map(|record| record.js_path.as_str())
            .filter(|statement| !statement.trim().is_empty())
            .collect()
    }
}

pub fn classify_imports(records: Vec<ImportRecord>, template: &str) -> ImportClassification {
    let mut classification = ImportClassification::default();

    for record in records {
        if template.contains(&record.closing_tag()) {
            classification.custom_elements.push(record);
        } else {
            classification.code_imports.push(record);
        }
    }

    for record in &classification.code_imports {
        for name in record.imports.keys() {
            if !name.is_empty() && template.contains(name.as_str()) {
                classification.template_vars.insert(name.clone());
            }
        }
    }

    classification
}

/// Declared import names referenced from binding code.
pub fn custom_imports(component: &Component, binding_code: &[String]) -> Vec<String> {
    component
        .imports
        .iter()
        .flat_map(|decl| decl.imports.keys())
        .filter(|name| binding_code.iter().any(|code| contains_identifier(code, name)))
        .cloned()
        .collect()
}

/// Names re-exposed as `name = name` fields so the view can reach them.
pub fn assigned_import_vars(
    component: &Component,
    classification: &ImportClassification,
    custom_imports: &[String],
) -> Vec<String> {
    let local_exports = component
        .exports
        .iter()
        .filter(|(_, export)| export.used_in_local)
        .map(|(name, _)| name);

    classification
        .template_vars
        .iter()
        .chain(custom_imports)
        .chain(local_exports)
        .filter(|name| !classification.is_custom_element(name))
        .cloned()
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
