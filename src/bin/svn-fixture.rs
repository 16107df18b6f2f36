//! # svn-fixture CLI
//!
//! Build fixture repositories from JSON manifests and print revision
//! metadata of existing repositories.
//!
//! ## Usage
//! ```bash
//! # Build a fixture under the default base path
//! svn-fixture build fixtures/hello_world.json
//!
//! # Build with the Subversion tools into a chosen directory
//! svn-fixture build fixtures/hello_world.json --base-path /tmp/fixtures --backend svn
//!
//! # Show log, author and date of every revision
//! svn-fixture log /tmp/fixtures/repo_hello_world
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use humantime::format_duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use svn_fixture::{
    Backend, CommitOutcome, FixtureConfig, FixtureManifest, LocalBackend, Registry, SvnBackend,
    PROP_REVISION_AUTHOR, PROP_REVISION_DATE, PROP_REVISION_LOG,
};
use tracing_subscriber::EnvFilter;

/// svn-fixture - declarative version-controlled fixture trees
#[derive(Parser)]
#[command(name = "svn-fixture")]
#[command(version)]
#[command(about = "Build version-controlled fixture repositories revision by revision")]
#[command(long_about = None)]
struct Cli {
    /// Engine used to create and read repositories
    #[arg(short, long, global = true, value_enum, default_value = "local")]
    backend: BackendKind,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the repository described by a manifest
    Build {
        /// Manifest file (JSON)
        manifest: PathBuf,

        /// Directory default repository locations live under
        #[arg(long)]
        base_path: Option<PathBuf>,

        /// Remove the created directories after building
        #[arg(long)]
        destroy: bool,
    },

    /// Print revision metadata of a repository
    Log {
        /// Repository storage directory
        storage: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Local,
    Svn,
}

impl BackendKind {
    fn build(self) -> Result<Arc<dyn Backend>> {
        match self {
            BackendKind::Local => Ok(Arc::new(LocalBackend::new())),
            BackendKind::Svn => {
                let backend = SvnBackend::new();
                if !backend.is_available() {
                    bail!("the svn, svnadmin and svnlook tools were not found on PATH");
                }
                Ok(Arc::new(backend))
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("svn_fixture=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let backend = cli.backend.build()?;
    match cli.command {
        Commands::Build {
            manifest,
            base_path,
            destroy,
        } => cmd_build(backend, &manifest, base_path, destroy),
        Commands::Log { storage } => cmd_log(backend, &storage),
    }
}

/// Load a manifest, commit every revision and report the outcome
fn cmd_build(
    backend: Arc<dyn Backend>,
    manifest_path: &Path,
    base_path: Option<PathBuf>,
    destroy: bool,
) -> Result<()> {
    let manifest = FixtureManifest::from_path(manifest_path)
        .with_context(|| format!("failed to load manifest {}", manifest_path.display()))?;

    let mut config = FixtureConfig::from_env();
    if let Some(base_path) = base_path {
        config = config.with_base_path(base_path);
    }

    let mut registry = Registry::new(config, backend);
    let start = Instant::now();
    let repository = registry
        .load_manifest(manifest)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let name = repository.name().to_string();

    println!(
        "{} {} ({} revisions)",
        "Building".blue().bold(),
        name,
        repository.revisions().len()
    );

    let reports = repository.commit_all()?;
    for report in &reports {
        match report.outcome {
            CommitOutcome::Committed(rev) => {
                println!("  {} r{:<4} {}", "✓".green().bold(), rev, report.name);
            }
            CommitOutcome::NoChange => {
                println!("  {} {:<5} {}", "-".yellow(), "", report.name.dimmed());
            }
        }
    }

    println!(
        "{} {} in {}",
        "✓".green().bold(),
        repository.uri(),
        format_duration(start.elapsed())
    );
    println!("  working copy: {}", repository.working_copy_path().display());

    if destroy {
        registry.destroy(&name)?;
        println!("{} Removed fixture directories", "✓".green().bold());
    }
    Ok(())
}

/// Print `svn:log`, `svn:author` and `svn:date` of every revision
fn cmd_log(backend: Arc<dyn Backend>, storage: &Path) -> Result<()> {
    if !backend.is_repository(storage) {
        bail!("no {} repository at {}", backend.name(), storage.display());
    }
    let repository = backend.open(storage)?;
    let youngest = repository.youngest_revision()?;

    for rev in (1..=youngest).rev() {
        let field = |name: &str| -> Result<String> {
            Ok(repository.revision_property(name, rev)?.unwrap_or_default())
        };
        println!(
            "{} | {} | {}",
            format!("r{rev}").yellow().bold(),
            field(PROP_REVISION_AUTHOR)?.cyan(),
            field(PROP_REVISION_DATE)?
        );
        let message = field(PROP_REVISION_LOG)?;
        if !message.is_empty() {
            println!("    {}", message);
        }
    }
    if youngest == 0 {
        println!("{}", "No revisions".dimmed());
    }
    Ok(())
}
