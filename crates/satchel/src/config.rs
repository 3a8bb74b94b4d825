//! Configuration loading
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the user file, `<config_dir>/satchel/satchel.toml`
//! 3. `satchel.toml` in the working directory
//! 4. a file passed explicitly with `--config`
//!
//! Command line flags are applied on top by the binary. Files use kebab-case
//! keys and unknown keys are rejected.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::{
    code_generator::EmitOptions,
    dirs::{CONFIG_FILE_NAME, user_config_file},
    types::DedupPolicy,
};

/// Default location of the emitted bundle
pub const DEFAULT_OUTPUT: &str = "build/bundle.js";

/// Effective bundler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where the bundle is written
    pub output: PathBuf,
    /// Analyze each module location once and share its identity
    pub dedupe_modules: bool,
    /// Evaluate each module once at run time
    pub runtime_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            dedupe_modules: true,
            runtime_cache: true,
        }
    }
}

/// One configuration file; absent keys leave the lower layer untouched
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialConfig {
    pub output: Option<PathBuf>,
    pub dedupe_modules: Option<bool>,
    pub runtime_cache: Option<bool>,
}

impl PartialConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid satchel configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

impl Config {
    /// Both deduplication fixes turned off: every import edge gets its own
    /// module and modules are re-evaluated on every require
    pub fn legacy() -> Self {
        Self {
            dedupe_modules: false,
            runtime_cache: false,
            ..Self::default()
        }
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        DedupPolicy::from_dedupe_flag(self.dedupe_modules)
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            runtime_cache: self.runtime_cache,
        }
    }

    /// Load the layered configuration for the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(user_config_file().as_deref(), Path::new("."), explicit)
    }

    /// Load the layered configuration from explicit locations
    ///
    /// Missing user and project files are skipped; a missing explicit file is
    /// an error.
    pub fn load_from(
        user_file: Option<&Path>,
        project_dir: &Path,
        explicit: Option<&Path>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = user_file
            && user_file.is_file()
        {
            debug!("Loading user config from {}", user_file.display());
            config.merge(PartialConfig::from_file(user_file)?);
        }

        let project_file = project_dir.join(CONFIG_FILE_NAME);
        if project_file.is_file() {
            debug!("Loading project config from {}", project_file.display());
            config.merge(PartialConfig::from_file(&project_file)?);
        }

        if let Some(explicit) = explicit {
            debug!("Loading config from {}", explicit.display());
            config.merge(PartialConfig::from_file(explicit)?);
        }

        debug!("Effective config: {config:?}");
        Ok(config)
    }

    /// Overlay the keys present in `partial`
    pub fn merge(&mut self, partial: PartialConfig) {
        if let Some(output) = partial.output {
            self.output = output;
        }
        if let Some(dedupe_modules) = partial.dedupe_modules {
            self.dedupe_modules = dedupe_modules;
        }
        if let Some(runtime_cache) = partial.runtime_cache {
            self.runtime_cache = runtime_cache;
        }
    }
}
