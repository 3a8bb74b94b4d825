//! AST visitor implementations for satchel
//!
//! This module contains visitors over swc's ECMAScript AST, used to discover
//! module dependencies before the module is lowered to a factory body.

mod dynamic_import_detector;
mod import_discovery;

pub use dynamic_import_detector::DynamicImportDetector;
pub use import_discovery::{DiscoveredImport, ImportDiscovery, ImportKind};
