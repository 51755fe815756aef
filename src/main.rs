//! treescan - Concurrent filesystem tree scanner.
//!
//! Usage:
//!   treescan scan [PATHS]...     Scan and show a summary
//!   treescan hash [PATHS]...     Print digests of every regular file
//!   treescan export [PATHS]...   Export entry snapshots to JSON
//!   treescan --help              Show help

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use treescan_core::{EntrySnapshot, HashAlgorithm, Registry, ScanConfig};
use treescan_scan::TreeScanner;

#[derive(Parser)]
#[command(
    name = "treescan",
    version,
    about = "A concurrent filesystem tree scanner",
    long_about = "treescan walks one or more directory trees with a pool of \
                  worker threads and reports every file, directory and \
                  symbolic link it finds."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand that runs a scan.
#[derive(clap::Args)]
struct ScanArgs {
    /// Root paths to scan
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Skip this exact path (repeatable)
    #[arg(short, long)]
    exclude: Vec<PathBuf>,

    /// Do not descend into symlinked directories
    #[arg(long)]
    no_follow_links: bool,

    /// Number of worker threads (defaults to half the CPUs)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and show a summary
    Scan {
        #[command(flatten)]
        args: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print digests of every regular file
    Hash {
        #[command(flatten)]
        args: ScanArgs,

        /// Digest algorithm (repeatable: md5, sha1, sha256, blake3)
        #[arg(short, long = "algo", default_value = "sha256")]
        algorithms: Vec<HashAlgorithm>,
    },

    /// Export entry snapshots to JSON
    Export {
        #[command(flatten)]
        args: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// One exported entry.
#[derive(Serialize)]
struct ExportedEntry<'a> {
    path: &'a Path,
    resolved_path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<EntrySnapshot>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Scan { args, format } => run_scan(&args, format),
        Command::Hash { args, algorithms } => run_hash(&args, &algorithms),
        Command::Export { args, output } => run_export(&args, output),
    }
}

fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("treescan=info,warn"),
        _ => EnvFilter::new("treescan=debug,warn"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the config and run the scan.
fn scan(args: &ScanArgs) -> Result<Registry> {
    let mut builder = ScanConfig::builder();
    builder
        .roots(args.paths.clone())
        .exclude(args.exclude.clone())
        .follow_links(!args.no_follow_links);
    if let Some(threads) = args.threads {
        builder.threads(threads);
    }
    let config = builder.build().context("Invalid scan options")?;

    eprintln!("Scanning {} root(s)...", config.roots.len());

    TreeScanner::new().scan(&config).context("Scan failed")
}

/// Run a scan and display a summary.
fn run_scan(args: &ScanArgs, format: OutputFormat) -> Result<()> {
    let registry = scan(args)?;
    let stats = registry.stats();

    match format {
        OutputFormat::Text => {
            let total_size: u64 = registry
                .regular_files()
                .filter_map(|entry| entry.size().ok())
                .sum();

            println!();
            println!("{}", "─".repeat(60));
            println!(" {} entries - {}", registry.len(), format_size(total_size));
            println!(
                " {} files, {} directories, {} links",
                registry.regular_file_count(),
                registry.directory_count(),
                registry.symlink_count()
            );
            println!(
                " Scanned in {:.2}s with {} worker(s)",
                stats.duration.as_secs_f64(),
                stats.workers
            );
            println!("{}", "─".repeat(60));

            if registry.has_warnings() {
                println!();
                println!("{} warning(s) during scan", registry.warnings().len());
                for warning in registry.warnings() {
                    println!("   {:?}: {}", warning.kind, warning.message);
                }
            }
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Summary<'a> {
                entries: usize,
                files: usize,
                directories: usize,
                symlinks: usize,
                stats: &'a treescan_core::ScanStats,
                warnings: &'a [treescan_core::ScanWarning],
            }

            let summary = Summary {
                entries: registry.len(),
                files: registry.regular_file_count(),
                directories: registry.directory_count(),
                symlinks: registry.symlink_count(),
                stats,
                warnings: registry.warnings(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Hash every regular file found by the scan.
fn run_hash(args: &ScanArgs, algorithms: &[HashAlgorithm]) -> Result<()> {
    let registry = scan(args)?;

    let mut files: Vec<_> = registry
        .regular_files()
        .filter(|entry| !entry.is_symlink().unwrap_or(true))
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));

    eprintln!("Hashing {} file(s)...", files.len());

    let results: Vec<_> = files
        .par_iter()
        .map(|entry| (entry.path(), entry.hash(algorithms)))
        .collect();

    for (path, result) in results {
        match result {
            Ok(digests) => println!("{}  {}", digests.join("  "), path.display()),
            Err(e) => tracing::warn!("skipping {}: {e}", path.display()),
        }
    }

    Ok(())
}

/// Export entry snapshots to JSON.
fn run_export(args: &ScanArgs, output: Option<PathBuf>) -> Result<()> {
    let registry = scan(args)?;

    let mut entries: Vec<_> = registry
        .iter()
        .map(|entry| ExportedEntry {
            path: entry.path(),
            resolved_path: entry.resolved_path(),
            snapshot: entry.snapshot().ok(),
        })
        .collect();
    entries.sort_by(|a, b| a.path.cmp(b.path));

    let json = serde_json::to_string_pretty(&entries)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Exported {} entries to {}", entries.len(), output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
