//! Bundle Virtual Machine - an interpreter for the emitted loader
//!
//! The emitted bundle wires modules together with closures: a `require(id)`
//! function, a per-call `localRequire(specifier)` and a table of
//! `[factory, mapping]` entries. This module models the same loader with
//! explicit types so its behaviour can be exercised without a JavaScript
//! host:
//!
//! - [`ModuleTable`] is the lookup table, one `(factory, mapping)` per identity
//! - [`Runtime::require_by_id`] is the global `require`
//! - [`LocalRequire`] is the per-module `localRequire`
//! - [`ModuleObject`] is the `module` object handed to each factory
//!
//! Factories are Rust closures; export values are [`serde_json::Value`]s.

use std::{
    cell::RefCell,
    fmt::{self, Write as _},
    rc::Rc,
};

use log::{debug, trace};
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::{
    module_registry::{ModuleCollection, ModuleRecord},
    types::{FxIndexMap, ModuleId},
};

/// A module's exports object, shared between the module and its importers
pub type Exports = Rc<RefCell<FxIndexMap<String, Value>>>;

/// A module body: `function (require, module, exports) { ... }`
pub type ModuleFactory = Rc<dyn Fn(&LocalRequire<'_>, &ModuleObject) -> Result<(), RuntimeError>>;

/// Wrap a closure as a [`ModuleFactory`]
pub fn factory<F>(body: F) -> ModuleFactory
where
    F: Fn(&LocalRequire<'_>, &ModuleObject) -> Result<(), RuntimeError> + 'static,
{
    Rc::new(body)
}

/// Failures raised while running a bundle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("Cannot find module with id {id}")]
    UnknownModule { id: ModuleId },

    #[error("Cannot resolve '{specifier}' from module {importer}")]
    UnresolvedSpecifier {
        specifier: String,
        importer: ModuleId,
    },

    /// A module was required again while its factory was still running.
    /// Only possible with the evaluation cache disabled, where a JavaScript
    /// host would recurse until the stack overflows.
    #[error("module {id} required while still evaluating (chain: {})", display_chain(.chain))]
    CircularEvaluation { id: ModuleId, chain: Vec<ModuleId> },

    #[error("module {id} failed: {message}")]
    Factory { id: ModuleId, message: String },
}

fn display_chain(chain: &[ModuleId]) -> String {
    let mut out = String::new();
    for (index, id) in chain.iter().enumerate() {
        if index > 0 {
            out.push_str(" -> ");
        }
        let _ = write!(out, "{id}");
    }
    out
}

/// The `module` object passed to a factory
pub struct ModuleObject {
    exports: RefCell<Exports>,
}

impl fmt::Debug for ModuleObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleObject")
            .field("exports", &self.exports.borrow().borrow())
            .finish()
    }
}

impl Default for ModuleObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleObject {
    /// `{ exports: {} }`
    pub fn new() -> Self {
        Self {
            exports: RefCell::new(Rc::new(RefCell::new(FxIndexMap::default()))),
        }
    }

    /// The current `module.exports`
    pub fn exports(&self) -> Exports {
        Rc::clone(&self.exports.borrow())
    }

    /// `exports[name] = value`
    pub fn export(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.exports
            .borrow()
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    /// `module.exports = exports`
    pub fn set_exports(&self, exports: Exports) {
        *self.exports.borrow_mut() = exports;
    }
}

struct TableEntry {
    factory: ModuleFactory,
    mapping: FxIndexMap<String, ModuleId>,
}

/// The `[factory, mapping]` lookup table, indexed by identity
#[derive(Default)]
pub struct ModuleTable {
    entries: Vec<TableEntry>,
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.mapping))
            .finish()
    }
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its identity
    pub fn insert(
        &mut self,
        factory: ModuleFactory,
        mapping: FxIndexMap<String, ModuleId>,
    ) -> ModuleId {
        let id = ModuleId::new(self.entries.len() as u32);
        self.entries.push(TableEntry { factory, mapping });
        id
    }

    /// Build a table with the mappings of `collection`, asking `provider`
    /// for the factory of each record
    pub fn from_collection<F>(collection: &ModuleCollection, mut provider: F) -> Self
    where
        F: FnMut(&ModuleRecord) -> ModuleFactory,
    {
        let mut table = Self::new();
        for record in collection {
            table.insert(provider(record), record.specifier_to_identity.clone());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, id: ModuleId) -> Option<&TableEntry> {
        self.entries.get(id.index())
    }
}

/// Executes a [`ModuleTable`] the way the emitted loader does
#[derive(Debug)]
pub struct Runtime {
    table: ModuleTable,
    cache_enabled: bool,
    cache: RefCell<FxHashMap<ModuleId, Rc<ModuleObject>>>,
    /// Modules whose factory is currently on the stack
    evaluating: RefCell<Vec<ModuleId>>,
    /// Every factory invocation, in call order
    evaluations: RefCell<Vec<ModuleId>>,
}

impl Runtime {
    pub fn new(table: ModuleTable, cache_enabled: bool) -> Self {
        Self {
            table,
            cache_enabled,
            cache: RefCell::default(),
            evaluating: RefCell::default(),
            evaluations: RefCell::default(),
        }
    }

    /// Require the entry module, the bundle's only top-level action
    pub fn run(&self) -> Result<Exports, RuntimeError> {
        debug!(
            "Running bundle with {} modules (cache {})",
            self.table.len(),
            if self.cache_enabled { "on" } else { "off" }
        );
        self.require_by_id(ModuleId::ENTRY)
    }

    /// The global `require(id)`
    pub fn require_by_id(&self, id: ModuleId) -> Result<Exports, RuntimeError> {
        if self.cache_enabled
            && let Some(module) = self.cache.borrow().get(&id)
        {
            trace!("Module {id} served from cache");
            return Ok(module.exports());
        }

        let entry = self.table.get(id).ok_or(RuntimeError::UnknownModule { id })?;

        if self.evaluating.borrow().contains(&id) {
            let mut chain = self.evaluating.borrow().clone();
            chain.push(id);
            return Err(RuntimeError::CircularEvaluation { id, chain });
        }

        let module = Rc::new(ModuleObject::new());
        if self.cache_enabled {
            self.cache.borrow_mut().insert(id, Rc::clone(&module));
        }

        trace!("Evaluating module {id}");
        self.evaluating.borrow_mut().push(id);
        self.evaluations.borrow_mut().push(id);
        let local = LocalRequire {
            runtime: self,
            importer: id,
            mapping: &entry.mapping,
        };
        let result = (entry.factory)(&local, &*module);
        self.evaluating.borrow_mut().pop();
        result?;

        Ok(module.exports())
    }

    /// Identities in the order their factories were invoked
    pub fn evaluation_order(&self) -> Vec<ModuleId> {
        self.evaluations.borrow().clone()
    }
}

/// The `require` handed to one module's factory
#[derive(Debug)]
pub struct LocalRequire<'r> {
    runtime: &'r Runtime,
    importer: ModuleId,
    mapping: &'r FxIndexMap<String, ModuleId>,
}

impl LocalRequire<'_> {
    /// `localRequire(specifier)`: translate through the module's mapping
    pub fn require(&self, specifier: &str) -> Result<Exports, RuntimeError> {
        let id = self.mapping.get(specifier).copied().ok_or_else(|| {
            RuntimeError::UnresolvedSpecifier {
                specifier: specifier.to_owned(),
                importer: self.importer,
            }
        })?;
        self.runtime.require_by_id(id)
    }

    /// Identity of the module this require belongs to
    pub fn importer(&self) -> ModuleId {
        self.importer
    }

    /// An error thrown by the calling module's own code
    pub fn error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::Factory {
            id: self.importer,
            message: message.into(),
        }
    }
}
