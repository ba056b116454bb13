//! Command-line interface for loopcheck.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::CallCatalog;
use crate::detect::{Analyzer, Severity};
use crate::report;
use crate::tree::SyntaxTree;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default catalog file names to search for next to the analyzed path.
const DEFAULT_CATALOG_NAMES: &[&str] = &["loopcheck.yaml", ".loopcheck.yaml"];

/// Extensions recognized as serialized syntax trees.
const TREE_EXTENSIONS: &[&str] = &["json"];

/// Flag loops that repeat loop-invariant lookups on every iteration.
///
/// Loopcheck consumes syntax trees serialized as JSON by an external
/// front-end and reports calls whose result cannot change between
/// iterations, dead default assignments, and reads of unbound variables.
#[derive(Parser)]
#[command(name = "loopcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a serialized tree file or a directory of them
    #[command(visible_alias = "analyze")]
    Check(CheckArgs),
    /// Write a starter call-side-effect catalog
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to a tree JSON file or a directory of them
    pub path: PathBuf,

    /// Path to a catalog YAML file (default: auto-discover)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Exit non-zero when findings reach this severity
    #[arg(long, default_value = "warning")]
    pub fail_on: Severity,

    /// Stop each tree's analysis after this many node visits
    #[arg(long)]
    pub node_budget: Option<usize>,

    /// Analyze trees in parallel
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "loopcheck.yaml")]
    pub output: PathBuf,
}

/// Starter catalog written by `loopcheck init`.
const CATALOG_TEMPLATE: &str = include_str!("templates/catalog.yaml");

/// Run the check command. Returns the process exit code.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    let catalog = load_catalog(args)?;

    let mut analyzer = Analyzer::new().with_catalog(catalog);
    if let Some(budget) = args.node_budget {
        analyzer = analyzer.with_node_budget(budget);
    }

    let trees = load_trees(&args.path)?;
    if trees.is_empty() {
        anyhow::bail!("no tree files found under {}", args.path.display());
    }

    let batch = if args.parallel {
        analyzer.run_batch_parallel(&trees)
    } else {
        analyzer.run_batch(&trees)
    };

    for failure in &batch.failures {
        eprintln!("Warning: failed to analyze {}: {}", failure.name, failure.error);
    }

    match args.format.as_str() {
        "json" => println!("{}", report::render_batch_json(&batch)?),
        "pretty" => print!("{}", report::render_batch_pretty(&batch)),
        other => anyhow::bail!("unknown output format: {} (expected pretty or json)", other),
    }

    let failed = !batch.failures.is_empty()
        || batch
            .max_severity()
            .map(|s| s >= args.fail_on)
            .unwrap_or(false);
    Ok(if failed { EXIT_FAILED } else { EXIT_SUCCESS })
}

/// Run the init command. Returns the process exit code.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        anyhow::bail!("{} already exists", args.output.display());
    }
    fs::write(&args.output, CATALOG_TEMPLATE)?;
    println!("Wrote {}", args.output.display());
    Ok(EXIT_SUCCESS)
}

fn load_catalog(args: &CheckArgs) -> anyhow::Result<CallCatalog> {
    if let Some(ref path) = args.catalog {
        return CallCatalog::parse_file(path);
    }
    if let Some(path) = discover_catalog(&args.path) {
        return CallCatalog::parse_file(path);
    }
    Ok(CallCatalog::with_builtins())
}

/// Search for a default-named catalog next to the analyzed path.
fn discover_catalog(path: &Path) -> Option<PathBuf> {
    let dir = if path.is_dir() {
        path
    } else {
        path.parent()?
    };
    for name in DEFAULT_CATALOG_NAMES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn is_tree_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TREE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Load one tree file, or every tree file under a directory.
fn load_trees(path: &Path) -> anyhow::Result<Vec<(String, SyntaxTree)>> {
    let mut trees = Vec::new();

    if path.is_file() {
        let tree = SyntaxTree::parse_file(path)?;
        trees.push((path.display().to_string(), tree));
        return Ok(trees);
    }

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_tree_file(entry.path()) {
            continue;
        }
        match SyntaxTree::parse_file(entry.path()) {
            Ok(tree) => trees.push((entry.path().display().to_string(), tree)),
            Err(e) => {
                // A directory may hold unrelated JSON; skip with a warning.
                eprintln!("Warning: skipping {}: {}", entry.path().display(), e);
            }
        }
    }
    Ok(trees)
}
