//! Lowering of ECMAScript module syntax to a CommonJS factory body
//!
//! The output runs inside `function (require, module, exports) { ... }`:
//!
//! - every `import` and re-export source becomes a hoisted `require` call, in
//!   source order
//! - references to imported bindings read through the required module, so
//!   they stay live the way ESM bindings are
//! - exports become enumerable getters on `exports`, defined before any
//!   dependency is required so cyclic importers can see the export names
//! - top-level bindings named `require`, `module` or `exports` are renamed so
//!   they cannot shadow the factory parameters
//! - everything else is copied verbatim
//!
//! Only module syntax is rewritten; the rest of the language is left as the
//! author wrote it.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use swc_core::{
    common::{GLOBALS, Globals, Mark, Spanned, SyntaxContext},
    ecma::{
        ast::{
            AssignPatProp, BreakStmt, CallExpr, Callee, ContinueStmt, Decl, DefaultDecl, Expr,
            ExportSpecifier, Id, Ident, ImportSpecifier, LabeledStmt, MemberProp, Module,
            ModuleDecl, ModuleExportName, ModuleItem, Prop, PropName, SuperProp, TaggedTpl,
        },
        transforms::base::resolver,
        utils::find_pat_ids,
        visit::{Visit, VisitMutWith, VisitWith},
    },
};

use crate::analyzer::ParsedModule;

/// Prefix of the local variables that hold required modules
const IMPORT_HANDLE_PREFIX: &str = "__satchel_import_";

/// Names the factory wrapper binds
const FACTORY_PARAMS: [&str; 3] = ["require", "module", "exports"];

/// How references to a top-level binding are written in the output
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rewrite {
    /// An imported binding, read from the required module on every use
    Import(String),
    /// A local binding moved out of the way of a factory parameter
    Rename(String),
}

impl Rewrite {
    fn text(&self) -> &str {
        match self {
            Self::Import(text) | Self::Rename(text) => text,
        }
    }
}

/// Replacement of a byte range of the source
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Lower a parsed module to a factory body
pub fn lower_to_commonjs(parsed: &ParsedModule<'_>) -> String {
    GLOBALS.set(&Globals::new(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();
        let mut resolved = parsed.module.clone();
        resolved.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));
        let top_level = SyntaxContext::empty().apply_mark(top_level_mark);
        CommonJsLowering::new(parsed, &resolved, top_level).run()
    })
}

struct CommonJsLowering<'p, 'src> {
    parsed: &'p ParsedModule<'src>,
    /// The parsed module with scopes resolved; spans match `parsed`
    module: &'p Module,
    top_level: SyntaxContext,
    rewrites: FxHashMap<Id, Rewrite>,
    edits: Vec<Edit>,
    /// Require handles of re-export declarations, by body index
    handles: FxHashMap<usize, String>,
    /// `require` calls and interop helpers, in source order
    requires: String,
    /// Export getters as `(exported name, value expression)`, emitted before
    /// the requires
    exports: Vec<(String, String)>,
    /// `export *` forwarding, emitted after the requires
    star_exports: String,
    body: String,
    next_handle: usize,
}

impl<'p, 'src> CommonJsLowering<'p, 'src> {
    fn new(parsed: &'p ParsedModule<'src>, module: &'p Module, top_level: SyntaxContext) -> Self {
        Self {
            parsed,
            module,
            top_level,
            rewrites: FxHashMap::default(),
            edits: Vec::new(),
            handles: FxHashMap::default(),
            requires: String::new(),
            exports: Vec::new(),
            star_exports: String::new(),
            body: String::new(),
            next_handle: 0,
        }
    }

    fn run(mut self) -> String {
        let parsed = self.parsed;
        let module = self.module;
        let has_module_syntax = module
            .body
            .iter()
            .any(|item| matches!(item, ModuleItem::ModuleDecl(_)));

        self.hoist_requires();
        self.rename_factory_params();
        self.edits = ReferenceRewriter::collect(parsed, module, &self.rewrites);

        let mut cursor = parsed.body_start();
        for (index, item) in module.body.iter().enumerate() {
            let ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            let (start, end) = parsed.range(decl.span());
            let before = self.splice(cursor, start);
            self.body.push_str(&before);
            cursor = end;
            self.lower_module_decl(index, decl);
        }
        let rest = self.splice(cursor, parsed.source.len());
        self.body.push_str(&rest);

        let mut out = String::from("\"use strict\";\n");
        if has_module_syntax {
            out.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
        }
        for (exported, value) in &self.exports {
            let _ = writeln!(
                out,
                "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ return {value}; }} }});",
                quote(exported)
            );
        }
        out.push_str(&self.requires);
        out.push_str(&self.star_exports);
        out.push_str(self.body.trim_start_matches(['\n', '\r']));
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Emit the `require` calls in source order and record how each imported
    /// binding is read
    fn hoist_requires(&mut self) {
        let module = self.module;
        for (index, item) in module.body.iter().enumerate() {
            let ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            match decl {
                ModuleDecl::Import(import) if !import.type_only => {
                    if import.specifiers.is_empty() {
                        let _ = writeln!(self.requires, "require({});", quote(&import.src.value));
                        continue;
                    }
                    let handle = self.require_handle(&import.src.value);
                    let mut default_handle = None;
                    for spec in &import.specifiers {
                        let (local, value) = match spec {
                            ImportSpecifier::Default(default) => (
                                &default.local,
                                self.default_member(&handle, &mut default_handle),
                            ),
                            ImportSpecifier::Namespace(namespace) => {
                                (&namespace.local, handle.clone())
                            }
                            ImportSpecifier::Named(named) => {
                                if named.is_type_only {
                                    continue;
                                }
                                let imported = named
                                    .imported
                                    .as_ref()
                                    .map_or_else(|| named.local.sym.to_string(), export_name);
                                let value = if imported == "default" {
                                    self.default_member(&handle, &mut default_handle)
                                } else {
                                    member(&handle, &imported)
                                };
                                (&named.local, value)
                            }
                        };
                        self.rewrites.insert(local.to_id(), Rewrite::Import(value));
                    }
                }
                ModuleDecl::ExportNamed(named) if !named.type_only => {
                    if let Some(src) = &named.src {
                        let handle = self.require_handle(&src.value);
                        self.handles.insert(index, handle);
                    }
                }
                ModuleDecl::ExportAll(all) if !all.type_only => {
                    let handle = self.require_handle(&all.src.value);
                    self.handles.insert(index, handle);
                }
                _ => {}
            }
        }
    }

    /// `<handle>_default.default`, declaring the interop variable on first use
    fn default_member(&mut self, handle: &str, declared: &mut Option<String>) -> String {
        let interop = declared.get_or_insert_with(|| {
            let interop = format!("{handle}_default");
            let _ = writeln!(
                self.requires,
                "var {interop} = {handle} && {handle}.__esModule ? {handle} : {{ default: {handle} }};"
            );
            interop
        });
        format!("{interop}.default")
    }

    fn rename_factory_params(&mut self) {
        let scan = BindingScan::collect(self.module, self.top_level);
        for id in scan.shadowing {
            if self.rewrites.contains_key(&id) {
                continue;
            }
            let mut renamed = format!("_{}", id.0);
            while scan.used.contains(&renamed) {
                renamed.insert(0, '_');
            }
            self.rewrites.insert(id, Rewrite::Rename(renamed));
        }
    }

    /// Source text of `start..end` with reference edits applied
    fn splice(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        let mut cursor = start;
        let first = self.edits.partition_point(|edit| edit.start < start);
        for edit in self.edits[first..]
            .iter()
            .take_while(|edit| edit.end <= end)
        {
            out.push_str(self.parsed.text(cursor, edit.start));
            out.push_str(&edit.text);
            cursor = edit.end;
        }
        out.push_str(self.parsed.text(cursor, end));
        out
    }

    /// Output text of a top-level binding of this module
    fn binding_text(&self, id: &Id) -> String {
        let key = (id.0.clone(), self.top_level);
        self.rewrites
            .get(&key)
            .map_or_else(|| id.0.to_string(), |rewrite| rewrite.text().to_owned())
    }

    fn lower_module_decl(&mut self, index: usize, decl: &ModuleDecl) {
        let (start, end) = self.parsed.range(decl.span());
        let text = self.splice(start, end);
        match decl {
            // Hoisted by `hoist_requires`
            ModuleDecl::Import(_) => {}
            ModuleDecl::ExportDecl(export) => {
                self.body.push_str(strip_keyword(&text, "export"));
                for id in declared_ids(&export.decl) {
                    let value = self.binding_text(&id);
                    self.exports.push((id.0.to_string(), value));
                }
            }
            ModuleDecl::ExportNamed(named) => {
                if named.type_only {
                    return;
                }
                match self.handles.get(&index).cloned() {
                    Some(handle) => {
                        for spec in &named.specifiers {
                            let (exported, value) = match spec {
                                ExportSpecifier::Named(spec) => {
                                    let orig = export_name(&spec.orig);
                                    let exported =
                                        spec.exported.as_ref().map_or_else(|| orig.clone(), export_name);
                                    let value = if orig == "default" {
                                        interop_default(&handle)
                                    } else {
                                        member(&handle, &orig)
                                    };
                                    (exported, value)
                                }
                                ExportSpecifier::Namespace(spec) => {
                                    (export_name(&spec.name), handle.clone())
                                }
                                ExportSpecifier::Default(spec) => {
                                    (spec.exported.sym.to_string(), interop_default(&handle))
                                }
                            };
                            self.exports.push((exported, value));
                        }
                    }
                    None => {
                        for spec in &named.specifiers {
                            if let ExportSpecifier::Named(spec) = spec
                                && !spec.is_type_only
                                && let ModuleExportName::Ident(orig) = &spec.orig
                            {
                                let exported = spec
                                    .exported
                                    .as_ref()
                                    .map_or_else(|| orig.sym.to_string(), export_name);
                                let value = self.binding_text(&orig.to_id());
                                self.exports.push((exported, value));
                            }
                        }
                    }
                }
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                let declaration = strip_keyword(strip_keyword(&text, "export"), "default");
                let name = match &export.decl {
                    DefaultDecl::Fn(function) => function.ident.as_ref(),
                    DefaultDecl::Class(class) => class.ident.as_ref(),
                    DefaultDecl::TsInterfaceDecl(_) => return,
                };
                match name {
                    Some(ident) => {
                        self.body.push_str(declaration);
                        let value = self.binding_text(&ident.to_id());
                        self.exports.push(("default".to_owned(), value));
                    }
                    None => {
                        let _ = write!(
                            self.body,
                            "exports.default = {};",
                            without_semicolon(declaration)
                        );
                    }
                }
            }
            ModuleDecl::ExportDefaultExpr(_) => {
                let expression = strip_keyword(strip_keyword(&text, "export"), "default");
                let _ = write!(
                    self.body,
                    "exports.default = {};",
                    without_semicolon(expression)
                );
            }
            ModuleDecl::ExportAll(all) => {
                if all.type_only {
                    return;
                }
                let Some(handle) = self.handles.get(&index) else {
                    return;
                };
                let _ = writeln!(
                    self.star_exports,
                    "Object.keys({handle}).forEach(function (key) {{ if (key === \"default\" || key === \"__esModule\" || Object.prototype.hasOwnProperty.call(exports, key)) return; Object.defineProperty(exports, key, {{ enumerable: true, get: function () {{ return {handle}[key]; }} }}); }});"
                );
            }
            // TypeScript-only declarations never reach here without the TS syntax
            _ => self.body.push_str(&text),
        }
    }

    /// Emit `var <handle> = require("<specifier>");` and return the handle
    fn require_handle(&mut self, specifier: &str) -> String {
        let handle = format!("{IMPORT_HANDLE_PREFIX}{}", self.next_handle);
        self.next_handle += 1;
        let _ = writeln!(self.requires, "var {handle} = require({});", quote(specifier));
        handle
    }
}

/// Every identifier name in a module, and the top-level bindings that would
/// shadow a factory parameter
#[derive(Debug, Default)]
struct BindingScan {
    top_level: SyntaxContext,
    used: FxHashSet<String>,
    shadowing: Vec<Id>,
}

impl BindingScan {
    fn collect(module: &Module, top_level: SyntaxContext) -> Self {
        let mut scan = Self {
            top_level,
            ..Self::default()
        };
        module.visit_with(&mut scan);
        scan
    }
}

impl Visit for BindingScan {
    fn visit_ident(&mut self, ident: &Ident) {
        self.used.insert(ident.sym.to_string());
        let id = ident.to_id();
        if id.1 == self.top_level
            && FACTORY_PARAMS.iter().any(|param| *param == &*id.0)
            && !self.shadowing.contains(&id)
        {
            self.shadowing.push(id);
        }
    }
}

/// Finds every reference to a rewritten binding outside module declarations
struct ReferenceRewriter<'a, 'p, 'src> {
    parsed: &'a ParsedModule<'src>,
    rewrites: &'p FxHashMap<Id, Rewrite>,
    edits: Vec<Edit>,
}

impl<'a, 'p, 'src> ReferenceRewriter<'a, 'p, 'src> {
    fn collect(
        parsed: &'a ParsedModule<'src>,
        module: &Module,
        rewrites: &'p FxHashMap<Id, Rewrite>,
    ) -> Vec<Edit> {
        let mut rewriter = Self {
            parsed,
            rewrites,
            edits: Vec::new(),
        };
        if !rewrites.is_empty() {
            module.visit_with(&mut rewriter);
        }
        let mut edits = rewriter.edits;
        edits.sort_by_key(|edit| edit.start);
        edits.dedup_by_key(|edit| edit.start);
        edits
    }

    fn rewrite_of(&self, ident: &Ident) -> Option<&'p Rewrite> {
        self.rewrites.get(&ident.to_id())
    }

    fn replace(&mut self, ident: &Ident, text: String) {
        let (start, end) = self.parsed.range(ident.span);
        self.edits.push(Edit { start, end, text });
    }

    /// `{ name }` shorthand keeps its key and reads the rewritten binding
    fn replace_shorthand(&mut self, ident: &Ident) -> bool {
        match self.rewrite_of(ident) {
            Some(rewrite) => {
                let text = format!("{}: {}", ident.sym, rewrite.text());
                self.replace(ident, text);
                true
            }
            None => false,
        }
    }

    /// A called import keeps `this` undefined, as a direct call would
    fn replace_callee(&mut self, callee: &Expr) -> bool {
        if let Expr::Ident(ident) = callee
            && let Some(Rewrite::Import(value)) = self.rewrite_of(ident)
        {
            let text = format!("(0, {value})");
            self.replace(ident, text);
            return true;
        }
        false
    }
}

impl Visit for ReferenceRewriter<'_, '_, '_> {
    fn visit_module_decl(&mut self, decl: &ModuleDecl) {
        match decl {
            ModuleDecl::Import(_) | ModuleDecl::ExportNamed(_) | ModuleDecl::ExportAll(_) => {}
            _ => decl.visit_children_with(self),
        }
    }

    fn visit_ident(&mut self, ident: &Ident) {
        if let Some(rewrite) = self.rewrite_of(ident) {
            let text = rewrite.text().to_owned();
            self.replace(ident, text);
        }
    }

    fn visit_prop(&mut self, prop: &Prop) {
        if let Prop::Shorthand(ident) = prop
            && self.replace_shorthand(ident)
        {
            return;
        }
        prop.visit_children_with(self);
    }

    fn visit_assign_pat_prop(&mut self, prop: &AssignPatProp) {
        if !self.replace_shorthand(&prop.key.id) {
            prop.key.visit_with(self);
        }
        prop.value.visit_with(self);
    }

    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee
            && self.replace_callee(callee)
        {
            call.args.visit_with(self);
            return;
        }
        call.visit_children_with(self);
    }

    fn visit_tagged_tpl(&mut self, tagged: &TaggedTpl) {
        if self.replace_callee(&tagged.tag) {
            tagged.tpl.visit_with(self);
            return;
        }
        tagged.visit_children_with(self);
    }

    fn visit_member_prop(&mut self, prop: &MemberProp) {
        if let MemberProp::Computed(computed) = prop {
            computed.visit_with(self);
        }
    }

    fn visit_super_prop(&mut self, prop: &SuperProp) {
        if let SuperProp::Computed(computed) = prop {
            computed.visit_with(self);
        }
    }

    fn visit_prop_name(&mut self, name: &PropName) {
        if let PropName::Computed(computed) = name {
            computed.visit_with(self);
        }
    }

    fn visit_labeled_stmt(&mut self, stmt: &LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _: &BreakStmt) {}

    fn visit_continue_stmt(&mut self, _: &ContinueStmt) {}
}

/// Bindings introduced by an exported declaration
fn declared_ids(decl: &Decl) -> Vec<Id> {
    match decl {
        Decl::Fn(function) => vec![function.ident.to_id()],
        Decl::Class(class) => vec![class.ident.to_id()],
        Decl::Var(var) => var
            .decls
            .iter()
            .flat_map(|declarator| find_pat_ids::<_, Id>(&declarator.name))
            .collect(),
        _ => Vec::new(),
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(str) => str.value.to_string(),
    }
}

/// `handle.name`, or `handle["name"]` when the name is not an identifier
fn member(handle: &str, name: &str) -> String {
    if is_identifier(name) {
        format!("{handle}.{name}")
    } else {
        format!("{handle}[{}]", quote(name))
    }
}

/// The default export of a required module, falling back to the whole
/// exports object for modules that were not compiled from ESM
fn interop_default(handle: &str) -> String {
    format!("{handle} && {handle}.__esModule ? {handle}.default : {handle}")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric())
}

/// A JavaScript string literal for `value`
fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> &'a str {
    let trimmed = text.trim_start();
    trimmed
        .strip_prefix(keyword)
        .map_or(trimmed, str::trim_start)
}

fn without_semicolon(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::analyzer::parse_module;

    fn lower(source: &str) -> String {
        lower_to_commonjs(&parse_module(source).unwrap())
    }

    #[test]
    fn test_default_import_and_plain_statements() {
        let output = lower("import name from './name.js';\nconsole.log('hello ' + name);\n");
        assert_eq!(
            output,
            "\"use strict\";\n\
             Object.defineProperty(exports, \"__esModule\", { value: true });\n\
             var __satchel_import_0 = require(\"./name.js\");\n\
             var __satchel_import_0_default = __satchel_import_0 && __satchel_import_0.__esModule ? __satchel_import_0 : { default: __satchel_import_0 };\n\
             console.log('hello ' + __satchel_import_0_default.default);\n"
        );
    }

    #[test]
    fn test_default_export_expression() {
        let output = lower("export default 'World';\n");
        assert_eq!(
            output,
            "\"use strict\";\n\
             Object.defineProperty(exports, \"__esModule\", { value: true });\n\
             exports.default = 'World';\n"
        );
    }

    #[test]
    fn test_named_exports_become_getters_before_requires() {
        let output = lower(
            "import { helper as h } from './helper.js';\nexport const a = h(1), { b, c: [d] } = obj;\nexport function f() {}\n",
        );
        let getters: Vec<&str> = output
            .lines()
            .filter(|line| line.starts_with("Object.defineProperty(exports, \"") && line.contains("get:"))
            .collect();
        assert_eq!(getters.len(), 4);
        assert!(getters[0].contains("\"a\""));
        assert!(getters[1].contains("\"b\""));
        assert!(getters[2].contains("\"d\""));
        assert!(getters[3].contains("\"f\"") && getters[3].contains("return f;"));

        let first_require = output.find("require(").unwrap();
        let last_getter = output.rfind("get: function").unwrap();
        assert!(last_getter < first_require);

        assert!(!output.contains("var h"));
        assert!(output.contains("const a = (0, __satchel_import_0.helper)(1), { b, c: [d] } = obj;"));
        assert!(output.contains("function f() {}"));
        assert!(!output.contains("export "));
    }

    #[test]
    fn test_local_export_list_and_named_default() {
        let output = lower("const x = 1;\nexport { x as y, x };\nexport default function main() { return x; }\n");
        assert!(output.contains("\"y\", { enumerable: true, get: function () { return x; } }"));
        assert!(output.contains("\"x\", { enumerable: true, get: function () { return x; } }"));
        assert!(output.contains("\"default\", { enumerable: true, get: function () { return main; } }"));
        assert!(output.contains("function main() { return x; }"));
    }

    #[test]
    fn test_anonymous_default_function() {
        let output = lower("export default function () { return 1; }\n");
        assert!(output.contains("exports.default = function () { return 1; };"));
    }

    #[test]
    fn test_re_exports_require_their_source() {
        let output = lower(
            "export { a, default as b, 'odd-name' as c } from './a.js';\nexport * from './all.js';\nexport * as ns from './ns.js';\n",
        );
        assert!(output.contains("var __satchel_import_0 = require(\"./a.js\");\n"));
        assert!(output.contains("var __satchel_import_1 = require(\"./all.js\");\n"));
        assert!(output.contains("var __satchel_import_2 = require(\"./ns.js\");\n"));
        assert!(output.contains("return __satchel_import_0.a;"));
        assert!(output.contains("return __satchel_import_0[\"odd-name\"];"));
        assert!(output.contains("return __satchel_import_2;"));
        assert!(output.contains("Object.keys(__satchel_import_1).forEach"));
    }

    #[test]
    fn test_side_effect_import_and_namespace() {
        let output = lower("import './polyfill.js';\nimport * as util from './util.js';\nutil.run();\n");
        assert!(output.contains("require(\"./polyfill.js\");\n"));
        assert!(!output.contains("var util"));
        assert!(output.ends_with("__satchel_import_0.run();\n"));
    }

    #[test]
    fn test_script_without_module_syntax_has_no_marker() {
        let output = lower("console.log('plain');\n");
        assert_eq!(output, "\"use strict\";\nconsole.log('plain');\n");
    }

    #[test]
    fn test_shebang_is_dropped() {
        let output = lower("#!/usr/bin/env node\nconsole.log(1);\n");
        assert_eq!(output, "\"use strict\";\nconsole.log(1);\n");
    }

    #[test]
    fn test_imported_bindings_are_read_on_every_use() {
        let output = lower(
            "import { count, inc } from './counter.js';\ninc();\nconsole.log(count);\ntag`x${count}`;\n",
        );
        assert!(!output.contains("var count"));
        assert!(output.contains("(0, __satchel_import_0.inc)();\n"));
        assert!(output.contains("console.log(__satchel_import_0.count);\n"));
        assert!(output.contains("tag`x${__satchel_import_0.count}`;"));
    }

    #[test]
    fn test_shadowed_and_property_names_are_untouched() {
        let output = lower(
            "import { a } from './a.js';\nfunction f(a) { return a; }\nconst o = { a, b: a, a() {} };\no.a;\nconst { a: z } = o;\nconsole.log(a);\n",
        );
        assert!(output.contains("function f(a) { return a; }"));
        assert!(output.contains(
            "const o = { a: __satchel_import_0.a, b: __satchel_import_0.a, a() {} };"
        ));
        assert!(output.contains("o.a;\n"));
        assert!(output.contains("const { a: z } = o;\n"));
        assert!(output.ends_with("console.log(__satchel_import_0.a);\n"));
    }

    #[test]
    fn test_re_exported_import_reads_through_handle() {
        let output = lower("import { a } from './a.js';\nexport { a as b };\nexport default a;\n");
        assert!(output.contains("\"b\", { enumerable: true, get: function () { return __satchel_import_0.a; } }"));
        assert!(output.contains("exports.default = __satchel_import_0.a;"));
    }

    #[test]
    fn test_factory_parameter_names_are_renamed() {
        let output = lower(
            "import v from './v.js';\nconst module = 'm';\nlet exports = { module };\nfunction require() { return v; }\nrequire();\nexport { module };\n",
        );
        assert!(output.contains("var __satchel_import_0 = require(\"./v.js\");\n"));
        assert!(output.contains("const _module = 'm';\n"));
        assert!(output.contains("let _exports = { module: _module };\n"));
        assert!(output.contains("function _require() { return __satchel_import_0_default.default; }\n"));
        assert!(output.contains("_require();\n"));
        assert!(output.contains("\"module\", { enumerable: true, get: function () { return _module; } }"));
        assert!(output.starts_with("\"use strict\";\nObject.defineProperty(exports, "));
    }

    #[test]
    fn test_renamed_binding_avoids_existing_names() {
        let output = lower("export const module = 1;\nconst _module = 2;\nconsole.log(module, _module);\n");
        assert!(output.contains("const __module = 1;\n"));
        assert!(output.contains("console.log(__module, _module);\n"));
        assert!(output.contains("return __module;"));
    }

    #[test]
    fn test_free_commonjs_references_are_kept() {
        let output = lower("module.exports = { value: exports.value };\n");
        assert_eq!(
            output,
            "\"use strict\";\nmodule.exports = { value: exports.value };\n"
        );
    }

    #[test]
    fn test_identifier_detection() {
        assert!(is_identifier("name"));
        assert!(is_identifier("$el"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("odd-name"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier(""));
    }
}
