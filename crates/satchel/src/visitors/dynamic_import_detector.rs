//! Detection of `import()` expressions
//!
//! Dynamic imports are not bundled; the analyzer only reports them so users
//! know those modules will be requested from the host at run time.

use swc_core::ecma::{
    ast::{CallExpr, Callee, Module},
    visit::{Visit, VisitWith},
};

/// Counts dynamic `import()` calls anywhere in a module
#[derive(Debug, Default)]
pub struct DynamicImportDetector {
    count: usize,
}

impl DynamicImportDetector {
    pub fn count(module: &Module) -> usize {
        let mut detector = Self::default();
        module.visit_with(&mut detector);
        detector.count
    }
}

impl Visit for DynamicImportDetector {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if matches!(call.callee, Callee::Import(_)) {
            self.count += 1;
        }
        call.visit_children_with(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_module;

    #[test]
    fn test_counts_nested_dynamic_imports() {
        let source = r"
import a from './a.js';
const lazy = () => import('./lazy.js');
function later() {
    return Promise.all([import('./one.js'), import('./two.js')]);
}
";
        let parsed = parse_module(source).unwrap();
        assert_eq!(DynamicImportDetector::count(&parsed.module), 3);
    }

    #[test]
    fn test_static_imports_are_not_counted() {
        let parsed = parse_module("import a from './a.js';\nexport default a;\n").unwrap();
        assert_eq!(DynamicImportDetector::count(&parsed.module), 0);
    }
}
