//! Build orchestration: graph -> bundle text -> output file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    analyzer::SourceTransformer,
    code_generator::emit,
    config::Config,
    error::BundleError,
    fs::FileSystem,
    graph_builder::GraphBuilder,
    module_registry::ModuleCollection,
    resolver::absolutize,
};

/// What a completed build wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    pub output: PathBuf,
    pub module_count: usize,
    pub bytes: usize,
}

/// Drives a build with one configuration
#[derive(Debug)]
pub struct BundleOrchestrator<'a> {
    config: Config,
    fs: &'a dyn FileSystem,
    transformer: &'a dyn SourceTransformer,
    /// Base for relative entry and output paths; the process working
    /// directory when unset
    working_dir: Option<PathBuf>,
}

impl<'a> BundleOrchestrator<'a> {
    pub fn new(
        config: Config,
        fs: &'a dyn FileSystem,
        transformer: &'a dyn SourceTransformer,
    ) -> Self {
        Self {
            config,
            fs,
            transformer,
            working_dir: None,
        }
    }

    /// Resolve relative paths against `dir` instead of the process directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the graph from `entry` and return the bundle text
    pub fn bundle_to_string(&self, entry: &Path) -> Result<String> {
        self.build_and_emit(entry).map(|(_, bundle)| bundle)
    }

    /// Build the graph from `entry` and write the bundle to the configured
    /// output, replacing any previous bundle
    pub fn bundle(&self, entry: &Path) -> Result<BundleSummary> {
        let (modules, bundle) = self.build_and_emit(entry)?;
        let output = absolutize(&self.config.output, &self.working_dir()?);

        if let Some(dir) = output.parent()
            && !self.fs.exists(dir)
        {
            debug!("Creating output directory {}", dir.display());
            self.fs
                .create_dir_all(dir)
                .map_err(|source| BundleError::Write {
                    path: dir.to_path_buf(),
                    source,
                })
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }

        self.fs
            .write_file(&output, &bundle)
            .map_err(|source| BundleError::Write {
                path: output.clone(),
                source,
            })?;
        info!(
            "Wrote {} ({} modules, {} bytes)",
            output.display(),
            modules.len(),
            bundle.len()
        );

        Ok(BundleSummary {
            output,
            module_count: modules.len(),
            bytes: bundle.len(),
        })
    }

    fn build_and_emit(&self, entry: &Path) -> Result<(ModuleCollection, String)> {
        let entry = absolutize(entry, &self.working_dir()?);
        info!(
            "Bundling {} ({} dedup, runtime cache {})",
            entry.display(),
            self.config.dedup_policy(),
            if self.config.runtime_cache { "on" } else { "off" }
        );

        let mut builder = GraphBuilder::new(self.fs, self.transformer, self.config.dedup_policy());
        let modules = builder
            .build(&entry)
            .with_context(|| format!("Failed to build module graph from {}", entry.display()))?;
        let bundle = emit(&modules, &self.config.emit_options())
            .context("Failed to emit bundle")?;
        Ok((modules, bundle))
    }

    fn working_dir(&self) -> Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to determine the current directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{analyzer::SwcTransformer, fs::MemoryFileSystem};

    fn hello_fs() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            (
                "/project/static/entry.js",
                "import name from './name.js';\nconsole.log('hello ' + name);\n",
            ),
            ("/project/static/name.js", "export default 'World';\n"),
        ])
    }

    #[test]
    fn test_bundle_writes_output_and_creates_directory() {
        let fs = hello_fs();
        let transformer = SwcTransformer::new();
        let orchestrator = BundleOrchestrator::new(Config::default(), &fs, &transformer)
            .with_working_dir("/project");

        let summary = orchestrator.bundle(Path::new("static/entry.js")).unwrap();
        assert_eq!(summary.output, PathBuf::from("/project/build/bundle.js"));
        assert_eq!(summary.module_count, 2);

        let written = fs.file(&summary.output).unwrap();
        assert_eq!(written.len(), summary.bytes);
        assert!(written.contains("  \"1\": [function (require, module, exports) {"));
        assert_eq!(
            written,
            orchestrator
                .bundle_to_string(Path::new("/project/static/entry.js"))
                .unwrap()
        );
    }

    #[test]
    fn test_bundle_overwrites_previous_output() {
        let fs = hello_fs();
        fs.insert("/project/build/bundle.js", "stale");
        let transformer = SwcTransformer::new();
        let orchestrator = BundleOrchestrator::new(Config::default(), &fs, &transformer)
            .with_working_dir("/project");

        orchestrator.bundle(Path::new("static/entry.js")).unwrap();
        let written = fs.file(Path::new("/project/build/bundle.js")).unwrap();
        assert!(written.starts_with("(function (modules) {"));
    }

    #[test]
    fn test_failed_build_writes_nothing() {
        let fs = MemoryFileSystem::with_files([(
            "/project/entry.js",
            "import './missing.js';\n",
        )]);
        let transformer = SwcTransformer::new();
        let orchestrator = BundleOrchestrator::new(Config::default(), &fs, &transformer)
            .with_working_dir("/project");

        let err = orchestrator.bundle(Path::new("entry.js")).unwrap_err();
        assert!(format!("{err:#}").contains("/project/missing.js"), "{err:#}");
        assert!(fs.file(Path::new("/project/build/bundle.js")).is_none());
        assert!(!fs.exists(Path::new("/project/build")));
    }

    #[test]
    fn test_legacy_config_changes_bundle_shape() {
        let fs = MemoryFileSystem::with_files([
            ("/p/entry.js", "import './a.js';\nimport './b.js';\n"),
            ("/p/a.js", "import './shared.js';\n"),
            ("/p/b.js", "import './shared.js';\n"),
            ("/p/shared.js", "export const x = 1;\n"),
        ]);
        let transformer = SwcTransformer::new();

        let fixed = BundleOrchestrator::new(Config::default(), &fs, &transformer)
            .bundle_to_string(Path::new("/p/entry.js"))
            .unwrap();
        let legacy = BundleOrchestrator::new(Config::legacy(), &fs, &transformer)
            .bundle_to_string(Path::new("/p/entry.js"))
            .unwrap();

        assert!(fixed.contains("var cache = {};"));
        assert!(!fixed.contains("  \"4\": ["));
        assert!(!legacy.contains("var cache"));
        assert!(legacy.contains("  \"4\": ["));
    }
}
