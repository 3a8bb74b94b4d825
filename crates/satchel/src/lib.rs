//! satchel: bundle an ECMAScript entry module and its relative imports into
//! one self-hosting script

pub mod analyzer;
pub mod bundle_vm;
pub mod code_generator;
pub mod config;
pub mod dirs;
pub mod error;
pub mod fs;
pub mod graph_builder;
pub mod module_registry;
pub mod orchestrator;
pub mod resolver;
pub mod transformations;
pub mod types;
pub mod visitors;
