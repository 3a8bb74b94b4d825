//! Module registry for the records produced by a build
//!
//! A [`ModuleCollection`] is the single source of truth for module identity:
//! the record at position `i` always carries `ModuleId(i)`, and every
//! specifier mapping points at a record of the same collection.

use std::path::PathBuf;

use petgraph::{algo::tarjan_scc, graph::DiGraph};

use crate::{
    analyzer::AnalyzedModule,
    error::{BundleError, BundleResult},
    types::{FxIndexMap, ModuleId},
};

/// Everything the emitter needs to know about one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// Absolute location the module was read from
    pub location: PathBuf,
    /// Import specifiers in source order, duplicates preserved
    pub import_specifiers: Vec<String>,
    /// Factory body for `function (require, module, exports) { ... }`
    pub compiled_code: String,
    /// Specifier as written -> identity of the module it resolved to
    pub specifier_to_identity: FxIndexMap<String, ModuleId>,
    /// Hex SHA-256 of the module source
    pub content_hash: String,
}

impl ModuleRecord {
    pub fn from_analyzed(id: ModuleId, module: AnalyzedModule) -> Self {
        Self {
            id,
            location: module.location,
            import_specifiers: module.import_specifiers,
            compiled_code: module.compiled_code,
            specifier_to_identity: FxIndexMap::default(),
            content_hash: module.content_hash,
        }
    }

    /// Identity a specifier of this module maps to
    pub fn resolve(&self, specifier: &str) -> Option<ModuleId> {
        self.specifier_to_identity.get(specifier).copied()
    }
}

/// Ordered module records, entry first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleCollection {
    modules: Vec<ModuleRecord>,
}

impl ModuleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; its identity must equal its position
    pub fn push(&mut self, record: ModuleRecord) {
        debug_assert_eq!(record.id.index(), self.modules.len());
        self.modules.push(record);
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.modules.get(id.index())
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut ModuleRecord> {
        self.modules.get_mut(id.index())
    }

    pub fn entry(&self) -> Option<&ModuleRecord> {
        self.get(ModuleId::ENTRY)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter()
    }

    /// Check that identities are positional and every mapping is in range
    pub fn validate(&self) -> BundleResult<()> {
        if self.modules.is_empty() {
            return Err(BundleError::InvalidGraph(
                "collection has no entry module".to_owned(),
            ));
        }

        for (index, record) in self.modules.iter().enumerate() {
            if record.id.index() != index {
                return Err(BundleError::InvalidGraph(format!(
                    "module {} is stored at position {index} but has identity {}",
                    record.location.display(),
                    record.id
                )));
            }
            for (specifier, target) in &record.specifier_to_identity {
                if target.index() >= self.modules.len() {
                    return Err(BundleError::InvalidGraph(format!(
                        "'{specifier}' in {} maps to unknown module {target}",
                        record.location.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Groups of modules that import each other, directly or transitively
    ///
    /// Each group lists identities in ascending order; a module importing
    /// itself forms a group of one.
    pub fn import_cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut graph = DiGraph::<ModuleId, ()>::new();
        let nodes: Vec<_> = self.modules.iter().map(|m| graph.add_node(m.id)).collect();

        for record in &self.modules {
            let Some(&from) = nodes.get(record.id.index()) else {
                continue;
            };
            for target in record.specifier_to_identity.values() {
                if let Some(&to) = nodes.get(target.index()) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut ids: Vec<ModuleId> = component.into_iter().map(|n| graph[n]).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }
}

impl<'a> IntoIterator for &'a ModuleCollection {
    type Item = &'a ModuleRecord;
    type IntoIter = std::slice::Iter<'a, ModuleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: u32, edges: &[(&str, u32)]) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId::new(id),
            location: PathBuf::from(format!("/m{id}.js")),
            import_specifiers: edges.iter().map(|(s, _)| (*s).to_owned()).collect(),
            compiled_code: String::new(),
            specifier_to_identity: edges
                .iter()
                .map(|(s, target)| ((*s).to_owned(), ModuleId::new(*target)))
                .collect(),
            content_hash: String::new(),
        }
    }

    fn collection(records: Vec<ModuleRecord>) -> ModuleCollection {
        ModuleCollection { modules: records }
    }

    #[test]
    fn test_validate_accepts_positional_identities() {
        let modules = collection(vec![
            record(0, &[("./a.js", 1), ("./b.js", 2)]),
            record(1, &[("./b.js", 2)]),
            record(2, &[]),
        ]);
        modules.validate().unwrap();
        assert_eq!(modules.entry().unwrap().resolve("./b.js"), Some(ModuleId::new(2)));
    }

    #[test]
    fn test_validate_rejects_misplaced_identity() {
        let modules = collection(vec![record(0, &[]), record(2, &[])]);
        let err = modules.validate().unwrap_err();
        assert!(err.to_string().contains("position 1"), "{err}");
    }

    #[test]
    fn test_validate_rejects_dangling_mapping() {
        let modules = collection(vec![record(0, &[("./gone.js", 5)])]);
        let err = modules.validate().unwrap_err();
        assert!(matches!(err, BundleError::InvalidGraph(ref msg) if msg.contains("./gone.js")));
    }

    #[test]
    fn test_validate_rejects_empty_collection() {
        assert!(ModuleCollection::new().validate().is_err());
    }

    #[test]
    fn test_import_cycles() {
        let modules = collection(vec![
            record(0, &[("./a.js", 1), ("./self.js", 3)]),
            record(1, &[("./b.js", 2)]),
            record(2, &[("./a.js", 1)]),
            record(3, &[("./self.js", 3)]),
        ]);
        assert_eq!(
            modules.import_cycles(),
            vec![
                vec![ModuleId::new(1), ModuleId::new(2)],
                vec![ModuleId::new(3)]
            ]
        );
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let modules = collection(vec![record(0, &[("./a.js", 1)]), record(1, &[])]);
        assert!(modules.import_cycles().is_empty());
    }
}
