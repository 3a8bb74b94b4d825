//! Dependency graph construction
//!
//! Starting from the entry module, every module is analyzed, its specifiers
//! are resolved, and newly discovered modules are queued. The queue is FIFO,
//! so identities follow breadth-first discovery order with the entry at 0.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use log::{debug, info, trace, warn};
use rustc_hash::FxHashMap;

use crate::{
    analyzer::{ModuleAnalyzer, SourceTransformer},
    error::{BundleError, BundleResult},
    fs::FileSystem,
    module_registry::{ModuleCollection, ModuleRecord},
    resolver::{normalize_path, resolve_specifier},
    types::{DedupPolicy, ModuleId},
};

/// Builds a [`ModuleCollection`] from an entry module
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    analyzer: ModuleAnalyzer<'a>,
    policy: DedupPolicy,
    /// Identity for the next discovered module; reset by every build
    next_id: u32,
}

/// Per-build bookkeeping
#[derive(Debug, Default)]
struct BuildState {
    collection: ModuleCollection,
    queue: VecDeque<ModuleId>,
    /// Location -> identity, consulted under [`DedupPolicy::Shared`]
    by_location: FxHashMap<PathBuf, ModuleId>,
    /// Importer of each module, indexed by identity
    parents: Vec<Option<ModuleId>>,
    /// How many times each location was analyzed
    analyses: FxHashMap<PathBuf, usize>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        transformer: &'a dyn SourceTransformer,
        policy: DedupPolicy,
    ) -> Self {
        Self {
            analyzer: ModuleAnalyzer::new(fs, transformer),
            policy,
            next_id: 0,
        }
    }

    /// Build the module collection reachable from `entry`
    ///
    /// Any read, parse or resolution failure aborts the build.
    pub fn build(&mut self, entry: &Path) -> BundleResult<ModuleCollection> {
        self.next_id = 0;
        let mut state = BuildState::default();

        let entry = normalize_path(entry);
        debug!("Building module graph from {} ({} dedup)", entry.display(), self.policy);
        self.discover(&mut state, entry, None)?;

        while let Some(id) = state.queue.pop_front() {
            let record = state.collection.get(id).ok_or_else(|| {
                BundleError::InvalidGraph(format!("queued module {id} is not in the collection"))
            })?;
            let importer = record.location.clone();
            let specifiers = record.import_specifiers.clone();

            for specifier in specifiers {
                let location = resolve_specifier(&importer, &specifier)?;
                let target = match self.policy {
                    DedupPolicy::Shared => match state.by_location.get(&location) {
                        Some(&known) => known,
                        None => self.discover(&mut state, location, Some(id))?,
                    },
                    DedupPolicy::Legacy => match state.ancestor_at(id, &location) {
                        Some(ancestor) => ancestor,
                        None => self.discover(&mut state, location, Some(id))?,
                    },
                };

                trace!("Module {id}: '{specifier}' -> {target}");
                if let Some(record) = state.collection.get_mut(id) {
                    record.specifier_to_identity.insert(specifier, target);
                }
            }
        }

        for cycle in state.collection.import_cycles() {
            let members: Vec<String> = cycle
                .iter()
                .filter_map(|&id| state.collection.get(id))
                .map(|record| record.location.display().to_string())
                .collect();
            warn!("Import cycle detected: {}", members.join(" -> "));
        }

        info!(
            "Discovered {} modules from {}",
            state.collection.len(),
            state
                .collection
                .entry()
                .map_or_else(String::new, |record| record.location.display().to_string())
        );
        Ok(state.collection)
    }

    /// Analyze a newly discovered module and queue it
    fn discover(
        &mut self,
        state: &mut BuildState,
        location: PathBuf,
        importer: Option<ModuleId>,
    ) -> BundleResult<ModuleId> {
        let analyzed = self.analyzer.analyze(&location)?;
        let id = self.allocate_id();

        let analyses = state.analyses.entry(location.clone()).or_default();
        *analyses += 1;
        if *analyses > 1 {
            warn!(
                "Analyzing {} again as module {id} (analysis #{analyses})",
                location.display()
            );
        }

        debug!(
            "Discovered module {id}: {} ({} imports)",
            location.display(),
            analyzed.import_specifiers.len()
        );
        state.by_location.entry(location).or_insert(id);
        state.parents.push(importer);
        state.collection.push(ModuleRecord::from_analyzed(id, analyzed));
        state.queue.push_back(id);
        Ok(id)
    }

    fn allocate_id(&mut self) -> ModuleId {
        let id = ModuleId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl BuildState {
    /// The module at `location` on the import chain leading to `id`, if any
    fn ancestor_at(&self, id: ModuleId, location: &Path) -> Option<ModuleId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let record = self.collection.get(candidate)?;
            if record.location == location {
                return Some(candidate);
            }
            current = self.parents.get(candidate.index()).copied().flatten();
        }
        None
    }
}
