//! Best-effort pretty printing of the assembled component.

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::warn;

use crate::error::FormatError;

pub trait Formatter: Send + Sync {
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Reprints TypeScript through the oxc parser and code generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcFormatter;

impl Formatter for OxcFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_typescript(true)
            .with_module(true);
        let ret = Parser::new(&allocator, source, source_type).parse();

        if let Some(first) = ret.errors.first() {
            return Err(FormatError::Syntax(first.to_string()));
        }

        Ok(Codegen::new().build(&ret.program).code)
    }
}

/// Formats `source`, returning it unchanged when the formatter rejects it.
pub fn format_or_keep(formatter: &dyn Formatter, source: String) -> String {
    match formatter.format(&source) {
        Ok(formatted) => formatted,
        Err(err) => {
            warn!(error = %err, "could not format generated component, keeping unformatted output");
            source
        }
    }
}
