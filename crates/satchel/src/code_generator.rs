//! Bundle emission
//!
//! Serializes a [`ModuleCollection`] into one self-hosting script: an
//! immediately invoked loader that receives a table of
//! `[factory, mapping]` entries keyed by module identity and requires the
//! entry module. Emission is a pure function of the collection and the
//! options, so equal inputs produce byte-identical bundles.

use std::fmt::Write as _;

use log::{debug, trace};

use crate::{
    error::{BundleError, BundleResult},
    module_registry::{ModuleCollection, ModuleRecord},
};

/// Options that change the emitted runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Cache each module object before running its factory, so every module
    /// is evaluated at most once per run
    pub runtime_cache: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            runtime_cache: true,
        }
    }
}

const RUNTIME_CACHE_DECL: &str = "  var cache = {};\n\n";

const RUNTIME_CACHE_LOOKUP: &str = "    if (Object.prototype.hasOwnProperty.call(cache, id)) {
      return cache[id].exports;
    }
";

const RUNTIME_LOOKUP: &str = "    var entry = modules[id];
    if (!entry) {
      throw new Error(\"Cannot find module with id \" + id);
    }
    var factory = entry[0];
    var mapping = entry[1];

    function localRequire(specifier) {
      if (!Object.prototype.hasOwnProperty.call(mapping, specifier)) {
        throw new Error(\"Cannot resolve '\" + specifier + \"' from module \" + id);
      }
      return require(mapping[specifier]);
    }

    var module = { exports: {} };
";

const RUNTIME_CACHE_STORE: &str = "    cache[id] = module;\n";

const RUNTIME_INVOKE: &str = "    factory(localRequire, module, module.exports);
    return module.exports;
  }

  require(0);
})({
";

/// Emit the bundle for `collection`
///
/// The collection is validated first; a collection that breaks its
/// identity invariants is rejected with [`BundleError::InvalidGraph`].
pub fn emit(collection: &ModuleCollection, options: &EmitOptions) -> BundleResult<String> {
    collection.validate()?;

    let mut out = String::from("(function (modules) {\n");
    if options.runtime_cache {
        out.push_str(RUNTIME_CACHE_DECL);
    }
    out.push_str("  function require(id) {\n");
    if options.runtime_cache {
        out.push_str(RUNTIME_CACHE_LOOKUP);
    }
    out.push_str(RUNTIME_LOOKUP);
    if options.runtime_cache {
        out.push_str(RUNTIME_CACHE_STORE);
    }
    out.push_str(RUNTIME_INVOKE);

    for record in collection {
        emit_entry(&mut out, record)?;
    }
    out.push_str("});\n");

    debug!(
        "Emitted bundle with {} modules ({} bytes, runtime cache {})",
        collection.len(),
        out.len(),
        if options.runtime_cache { "on" } else { "off" }
    );
    Ok(out)
}

/// One `"<id>": [factory, mapping],` table entry
fn emit_entry(out: &mut String, record: &ModuleRecord) -> BundleResult<()> {
    let mapping = serde_json::to_string(&record.specifier_to_identity).map_err(|err| {
        BundleError::InvalidGraph(format!(
            "cannot serialize mapping of {}: {err}",
            record.location.display()
        ))
    })?;
    trace!("Module {} mapping {mapping}", record.id);

    let _ = write!(
        out,
        "  \"{}\": [function (require, module, exports) {{\n{}",
        record.id, record.compiled_code
    );
    if !record.compiled_code.is_empty() && !record.compiled_code.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "  }}, {mapping}],");
    Ok(())
}
