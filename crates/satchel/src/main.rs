use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{LevelFilter, error, info};
use satchel::{
    analyzer::SwcTransformer, config::Config, fs::OsFileSystem, orchestrator::BundleOrchestrator,
};

/// Bundle an ECMAScript entry module and its relative imports into one script
#[derive(Parser, Debug)]
#[command(name = "satchel", version, about, long_about = None)]
struct Cli {
    /// Entry module
    entry: PathBuf,

    /// Where to write the bundle [default: build/bundle.js]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file applied on top of the user and project files
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analyze every import edge separately and re-evaluate modules on
    /// every require
    #[arg(long)]
    legacy: bool,

    /// Analyze every import edge separately
    #[arg(long)]
    no_dedupe: bool,

    /// Re-evaluate modules on every require
    #[arg(long)]
    no_runtime_cache: bool,

    /// Print the bundle to stdout instead of writing it
    #[arg(long)]
    stdout: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Apply command line overrides to the file configuration
    fn apply(&self, config: &mut Config) {
        if self.legacy {
            let legacy = Config::legacy();
            config.dedupe_modules = legacy.dedupe_modules;
            config.runtime_cache = legacy.runtime_cache;
        }
        if self.no_dedupe {
            config.dedupe_modules = false;
        }
        if self.no_runtime_cache {
            config.runtime_cache = false;
        }
        if let Some(output) = &self.output {
            config.output.clone_from(output);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG, when set, overrides the verbosity flags
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let fs = OsFileSystem;
    let transformer = SwcTransformer::new();
    let orchestrator = BundleOrchestrator::new(config, &fs, &transformer);

    if cli.stdout {
        let bundle = orchestrator.bundle_to_string(&cli.entry)?;
        io::stdout()
            .lock()
            .write_all(bundle.as_bytes())
            .context("Failed to write bundle to stdout")?;
        return Ok(());
    }

    let summary = orchestrator.bundle(&cli.entry)?;
    info!(
        "Bundled {} modules into {} ({} bytes)",
        summary.module_count,
        summary.output.display(),
        summary.bytes
    );
    Ok(())
}
