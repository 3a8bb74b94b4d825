//! Error types for the bundling pipeline

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors that abort a build
///
/// Every variant carries the location it originated from so the failure can be
/// reported against the offending module or output file.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A module source could not be read
    #[error("failed to read module {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A module source is not valid ECMAScript
    #[error("failed to parse {}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// An import does not start with `./` or `../`
    #[error(
        "unsupported import specifier '{specifier}' in {}: only relative specifiers can be bundled",
        importer.display()
    )]
    UnsupportedSpecifier { specifier: String, importer: PathBuf },

    /// The bundle (or its directory) could not be written
    #[error("failed to write bundle to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The module collection violates its identity invariants
    #[error("invalid module graph: {0}")]
    InvalidGraph(String),
}

/// Result type alias for bundling operations
pub type BundleResult<T> = Result<T, BundleError>;
