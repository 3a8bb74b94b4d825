//! Import discovery for ECMAScript modules
//!
//! Finds every static module dependency of a module: `import` declarations
//! plus the sources of `export ... from` and `export * from` re-exports, in
//! source order. Duplicates are preserved so callers see exactly what the
//! module wrote.

use swc_core::{
    common::Span,
    ecma::ast::{Module, ModuleDecl, ModuleItem},
};

/// How a dependency was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import x from "./a.js"`, `import "./a.js"`, ...
    Import,
    /// `export { x } from "./a.js"`, `export * as ns from "./a.js"`
    ReExport,
    /// `export * from "./a.js"`
    ReExportAll,
}

/// A static dependency discovered in a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImport {
    /// The specifier exactly as written in the source
    pub specifier: String,
    pub kind: ImportKind,
    /// Span of the whole declaration
    pub span: Span,
}

/// Collects the static dependencies of a module
#[derive(Debug, Default)]
pub struct ImportDiscovery {
    imports: Vec<DiscoveredImport>,
}

impl ImportDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze a module and return its dependencies in source order
    pub fn analyze(module: &Module) -> Vec<DiscoveredImport> {
        let mut discovery = Self::new();
        for item in &module.body {
            if let ModuleItem::ModuleDecl(decl) = item {
                discovery.visit_module_decl(decl);
            }
        }
        discovery.imports
    }

    /// Specifiers only, in source order
    pub fn specifiers(module: &Module) -> Vec<String> {
        Self::analyze(module)
            .into_iter()
            .map(|import| import.specifier)
            .collect()
    }

    fn visit_module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) if !import.type_only => {
                self.push(import.src.value.to_string(), ImportKind::Import, import.span);
            }
            ModuleDecl::ExportNamed(named) if !named.type_only => {
                if let Some(src) = &named.src {
                    self.push(src.value.to_string(), ImportKind::ReExport, named.span);
                }
            }
            ModuleDecl::ExportAll(all) if !all.type_only => {
                self.push(all.src.value.to_string(), ImportKind::ReExportAll, all.span);
            }
            _ => {}
        }
    }

    fn push(&mut self, specifier: String, kind: ImportKind, span: Span) {
        log::trace!("Discovered {kind:?} of '{specifier}'");
        self.imports.push(DiscoveredImport {
            specifier,
            kind,
            span,
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analyzer::parse_module;

    fn specifiers(source: &str) -> Vec<String> {
        let parsed = parse_module(source).unwrap();
        ImportDiscovery::specifiers(&parsed.module)
    }

    #[test]
    fn test_discovers_imports_in_source_order() {
        let source = r#"
import name from './name.js';
import { a, b as c } from "../lib/ab.js";
import * as ns from './ns.js';
import './side-effect.js';
console.log(name, a, c, ns);
"#;
        assert_eq!(
            specifiers(source),
            vec!["./name.js", "../lib/ab.js", "./ns.js", "./side-effect.js"]
        );
    }

    #[test]
    fn test_preserves_duplicate_specifiers() {
        let source = "import a from './util.js';\nimport { b } from './util.js';\n";
        assert_eq!(specifiers(source), vec!["./util.js", "./util.js"]);
    }

    #[test]
    fn test_includes_re_export_sources() {
        let source = r#"
export { helper } from './helper.js';
export const local = 1;
export * from './all.js';
export * as everything from './everything.js';
import first from './first.js';
"#;
        let parsed = parse_module(source).unwrap();
        let kinds: Vec<(String, ImportKind)> = ImportDiscovery::analyze(&parsed.module)
            .into_iter()
            .map(|import| (import.specifier, import.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("./helper.js".to_owned(), ImportKind::ReExport),
                ("./all.js".to_owned(), ImportKind::ReExportAll),
                ("./everything.js".to_owned(), ImportKind::ReExport),
                ("./first.js".to_owned(), ImportKind::Import),
            ]
        );
    }

    #[test]
    fn test_ignores_dynamic_imports_and_local_exports() {
        let source = "export function f() { return import('./lazy.js'); }\nexport { f as g };\n";
        assert!(specifiers(source).is_empty());
    }
}
