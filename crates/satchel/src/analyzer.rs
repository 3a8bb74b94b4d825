//! Module analysis: read a module, find its dependencies and compile it
//!
//! The [`SourceTransformer`] trait is the seam between the bundler and the
//! JavaScript toolchain. [`SwcTransformer`] is the shipped implementation;
//! [`ModuleAnalyzer`] combines a transformer with a [`FileSystem`].

use std::path::{Path, PathBuf};

use log::{debug, warn};
use sha2::{Digest, Sha256};
use swc_core::{
    common::{BytePos, Span, Spanned},
    ecma::{
        ast::{EsVersion, Module},
        parser::{Parser, StringInput, Syntax, lexer::Lexer},
    },
};
use thiserror::Error;

use crate::{
    error::{BundleError, BundleResult},
    fs::FileSystem,
    transformations::lower_to_commonjs,
    visitors::{DynamicImportDetector, ImportDiscovery},
};

/// Position of the first byte of a parsed source
pub(crate) const START_POS: BytePos = BytePos(1);

/// A source that failed to parse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct TransformError {
    /// 1-based line of the first error
    pub line: usize,
    /// 1-based column, counted in characters
    pub column: usize,
    pub message: String,
}

/// Dependencies and factory code of one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedModule {
    pub import_specifiers: Vec<String>,
    pub compiled_code: String,
    /// `import()` calls left for the host to resolve at run time
    pub dynamic_imports: usize,
}

/// Turns module source text into dependencies and runnable factory code
pub trait SourceTransformer: std::fmt::Debug {
    /// Import specifiers in source order, duplicates preserved
    fn extract_imports(&self, source: &str) -> Result<Vec<String>, TransformError>;

    /// Code that runs inside `function (require, module, exports) { ... }`
    fn compile(&self, source: &str) -> Result<String, TransformError>;

    fn transform(&self, source: &str) -> Result<TransformedModule, TransformError> {
        Ok(TransformedModule {
            import_specifiers: self.extract_imports(source)?,
            compiled_code: self.compile(source)?,
            dynamic_imports: 0,
        })
    }
}

/// ECMAScript module transformer built on swc
#[derive(Debug, Default, Clone, Copy)]
pub struct SwcTransformer;

impl SwcTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl SourceTransformer for SwcTransformer {
    fn extract_imports(&self, source: &str) -> Result<Vec<String>, TransformError> {
        let parsed = parse_module(source)?;
        Ok(ImportDiscovery::specifiers(&parsed.module))
    }

    fn compile(&self, source: &str) -> Result<String, TransformError> {
        let parsed = parse_module(source)?;
        Ok(lower_to_commonjs(&parsed))
    }

    fn transform(&self, source: &str) -> Result<TransformedModule, TransformError> {
        let parsed = parse_module(source)?;
        Ok(TransformedModule {
            import_specifiers: ImportDiscovery::specifiers(&parsed.module),
            compiled_code: lower_to_commonjs(&parsed),
            dynamic_imports: DynamicImportDetector::count(&parsed.module),
        })
    }
}

/// A parsed module together with the text it was parsed from
#[derive(Debug)]
pub struct ParsedModule<'src> {
    pub source: &'src str,
    pub module: Module,
}

impl<'src> ParsedModule<'src> {
    /// Byte offset where the module body starts, after any `#!` line
    pub fn body_start(&self) -> usize {
        if self.source.starts_with("#!") {
            self.source
                .find('\n')
                .map_or(self.source.len(), |newline| newline + 1)
        } else {
            0
        }
    }

    /// Byte range of `span` within the source
    pub fn range(&self, span: Span) -> (usize, usize) {
        let len = self.source.len();
        let start = (span.lo.0.saturating_sub(START_POS.0) as usize).min(len);
        let end = (span.hi.0.saturating_sub(START_POS.0) as usize).clamp(start, len);
        (start, end)
    }

    pub fn text(&self, start: usize, end: usize) -> &'src str {
        self.source.get(start..end).unwrap_or_default()
    }

    pub fn slice(&self, span: Span) -> &'src str {
        let (start, end) = self.range(span);
        self.text(start, end)
    }
}

/// Parse `source` as an ECMAScript module
///
/// Recoverable errors that swc only records are treated as fatal too.
pub fn parse_module(source: &str) -> Result<ParsedModule<'_>, TransformError> {
    let end = BytePos(START_POS.0 + source.len() as u32);
    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::EsNext,
        StringInput::new(source, START_POS, end),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|err| parse_error(source, err.span(), &err.kind().msg()))?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(parse_error(source, err.span(), &err.kind().msg()));
    }

    Ok(ParsedModule { source, module })
}

fn parse_error(source: &str, span: Span, message: &str) -> TransformError {
    let offset = (span.lo.0.saturating_sub(START_POS.0) as usize).min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
    let column = before[line_start..].chars().count() + 1;
    TransformError {
        line,
        column,
        message: message.to_owned(),
    }
}

/// A module that has been read and transformed but not yet placed in a graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedModule {
    pub location: PathBuf,
    pub import_specifiers: Vec<String>,
    pub compiled_code: String,
    /// Hex SHA-256 of the source text
    pub content_hash: String,
}

/// Reads modules through a [`FileSystem`] and runs a [`SourceTransformer`]
#[derive(Debug, Clone, Copy)]
pub struct ModuleAnalyzer<'a> {
    fs: &'a dyn FileSystem,
    transformer: &'a dyn SourceTransformer,
}

impl<'a> ModuleAnalyzer<'a> {
    pub fn new(fs: &'a dyn FileSystem, transformer: &'a dyn SourceTransformer) -> Self {
        Self { fs, transformer }
    }

    pub fn analyze(&self, location: &Path) -> BundleResult<AnalyzedModule> {
        let source = self
            .fs
            .read_file(location)
            .map_err(|source| BundleError::Read {
                path: location.to_path_buf(),
                source,
            })?;

        let transformed =
            self.transformer
                .transform(&source)
                .map_err(|err| BundleError::Parse {
                    path: location.to_path_buf(),
                    line: err.line,
                    column: err.column,
                    message: err.message,
                })?;

        if transformed.dynamic_imports > 0 {
            warn!(
                "{} uses {} dynamic import(s); they are left to the host and not bundled",
                location.display(),
                transformed.dynamic_imports
            );
        }

        let content_hash = format!("{:x}", Sha256::digest(source.as_bytes()));
        debug!(
            "Analyzed {} ({} imports, {} bytes compiled)",
            location.display(),
            transformed.import_specifiers.len(),
            transformed.compiled_code.len()
        );

        Ok(AnalyzedModule {
            location: location.to_path_buf(),
            import_specifiers: transformed.import_specifiers,
            compiled_code: transformed.compiled_code,
            content_hash,
        })
    }
}
