//! # embedfs CLI - Embed directory trees in your binary
//!
//! Command-line front end for the embedfs snapshot compiler, plus a few
//! commands for inspecting binary bundles through the embedded runtime.
//!
//! ## Usage
//! ```bash
//! # Generate src/assets_vfsdata.rs from ./static
//! embedfs generate --dir ./static --output src/assets_vfsdata.rs
//!
//! # Only embed in release builds, skip source maps
//! embedfs generate --dir ./static --cfg 'not(debug_assertions)' --ignore '\.map$'
//!
//! # Produce a binary bundle and look inside it
//! embedfs generate --dir ./static --format bundle --output assets.bin
//! embedfs ls assets.bin /css
//! embedfs cat assets.bin /css/site.css
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use embedfs::artifact::Artifact;
use embedfs::compiler::{CompilerBuilder, OutputFormat};
use embedfs::vfs::Metadata;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// embedfs CLI - compile directories into embeddable read-only filesystems
#[derive(Parser)]
#[command(name = "embedfs")]
#[command(version)]
#[command(about = "Compile a directory tree into a read-only filesystem embedded in your binary")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a directory into Rust source or a binary bundle
    #[command(alias = "gen")]
    Generate {
        /// Directory to embed
        #[arg(short, long)]
        dir: PathBuf,

        /// Output file (defaults to <module>_vfsdata.rs, or .bin for bundles)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Name of the generated module
        #[arg(short, long, default_value = "assets")]
        module: String,

        /// Name of the exported static
        #[arg(long, default_value = "ASSETS")]
        var: String,

        /// Path generated code uses to reach the embedfs runtime
        #[arg(long, default_value = "::embedfs")]
        crate_path: String,

        /// cfg predicate placed on the generated module (repeatable)
        #[arg(long = "cfg")]
        cfg: Vec<String>,

        /// Regex matched against full virtual paths to skip (repeatable)
        #[arg(short, long)]
        ignore: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "rust")]
        format: FormatArg,

        /// Include symbolic links to regular files
        #[arg(long)]
        follow_symlinks: bool,

        /// Compression worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print the compile report as JSON
        #[arg(long)]
        json: bool,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// List a directory inside a bundle
    Ls {
        /// Bundle file
        bundle: PathBuf,

        /// Directory to list
        #[arg(default_value = "/")]
        path: String,

        /// List every entry recursively
        #[arg(short, long)]
        recursive: bool,
    },

    /// Write a file from a bundle to stdout
    Cat {
        /// Bundle file
        bundle: PathBuf,

        /// File to print
        path: String,
    },

    /// Show metadata for an entry in a bundle
    Stat {
        /// Bundle file
        bundle: PathBuf,

        /// Entry to describe
        path: String,
    },

    /// Print the SHA-256 digest of a bundle's snapshot
    Digest {
        /// Bundle file
        bundle: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Rust source defining an EmbeddedFs static
    Rust,
    /// Binary bundle for include_bytes!
    Bundle,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Rust => OutputFormat::RustSource,
            FormatArg::Bundle => OutputFormat::Bundle,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            dir,
            output,
            module,
            var,
            crate_path,
            cfg,
            ignore,
            format,
            follow_symlinks,
            workers,
            json,
            progress,
        } => {
            let mut builder = CompilerBuilder::new()
                .module_name(module)
                .static_name(var)
                .crate_path(crate_path)
                .cfg_predicates(cfg)
                .ignore_patterns(ignore)
                .follow_symlinks(follow_symlinks)
                .output_format(format.into());
            if let Some(workers) = workers {
                builder = builder.parallel_workers(workers);
            }
            cmd_generate(builder, &dir, output, json, progress)
        }
        Commands::Ls { bundle, path, recursive } => cmd_ls(&bundle, &path, recursive),
        Commands::Cat { bundle, path } => cmd_cat(&bundle, &path),
        Commands::Stat { bundle, path } => cmd_stat(&bundle, &path),
        Commands::Digest { bundle } => cmd_digest(&bundle),
    }
}

/// Compile a directory
///
/// Output is written to a temporary file first and renamed into place, so
/// an interrupted run never leaves a truncated file behind.
fn cmd_generate(
    builder: CompilerBuilder,
    dir: &Path,
    output: Option<PathBuf>,
    json: bool,
    show_progress: bool,
) -> anyhow::Result<()> {
    let compiler = builder.build().context("invalid configuration")?;
    let output = output.unwrap_or_else(|| compiler.default_output_file());

    if !json {
        println!("{} {}", "Embedding".blue().bold(), dir.display().to_string().cyan());
    }

    let progress = if show_progress && !json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message("Compressing files...");
        Some(pb)
    } else {
        None
    };

    let result = compiler.compile_dir_with_progress(dir, &output, |file| {
        if let Some(pb) = &progress {
            pb.set_message(file.to_string());
            pb.tick();
        }
    });

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let report = result.with_context(|| format!("failed to compile {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} Wrote {}", "✓".green().bold(), output.display().to_string().yellow().bold());
    println!("  Files: {}", report.files.to_string().cyan());
    println!("  Directories: {}", report.directories.to_string().cyan());
    println!(
        "  Compressed: {} ({} stored raw, {} saved)",
        report.compression.files_compressed.to_string().cyan(),
        report.compression.files_stored_raw,
        format_bytes(report.compression.bytes_saved).cyan()
    );
    println!("  Size: {}", format_bytes(report.total_size).cyan());
    println!("  Digest: {}", report.digest.dimmed());
    println!("  Time: {}", format_duration(report.duration).to_string().cyan());
    if report.skipped > 0 {
        println!("  Skipped: {} entries", report.skipped.to_string().yellow());
    }

    Ok(())
}

fn load_bundle(bundle: &Path) -> anyhow::Result<Artifact> {
    let bytes = std::fs::read(bundle).with_context(|| format!("can't read {}", bundle.display()))?;
    Artifact::from_bundle(&bytes).with_context(|| format!("{} is not a valid bundle", bundle.display()))
}

fn print_entry(meta: &Metadata<'_>, display: &str) {
    if meta.is_dir() {
        println!("{:>10}  {}", "-".dimmed(), format!("{}/", display).blue().bold());
    } else {
        println!("{:>10}  {}", format_bytes(meta.len()), display);
    }
}

/// List a directory inside a bundle
fn cmd_ls(bundle: &Path, path: &str, recursive: bool) -> anyhow::Result<()> {
    let artifact = load_bundle(bundle)?;
    let fs = artifact.filesystem();

    if recursive {
        let prefix = embedfs::vfs::path::normalize(path);
        fs.metadata(&prefix)?;
        for (entry_path, meta) in fs.walk() {
            let inside = prefix == embedfs::vfs::path::ROOT
                || entry_path == prefix
                || entry_path.starts_with(&format!("{}/", prefix));
            if inside {
                print_entry(&meta, entry_path);
            }
        }
        return Ok(());
    }

    let mut dir = fs.open(path)?;
    for meta in dir.read_dir(None)? {
        print_entry(&meta, meta.name());
    }
    Ok(())
}

/// Write a file from a bundle to stdout
fn cmd_cat(bundle: &Path, path: &str) -> anyhow::Result<()> {
    let artifact = load_bundle(bundle)?;
    let fs = artifact.filesystem();
    let mut handle = fs.open(path)?;
    if handle.is_dir() {
        bail!("{} is a directory", path);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut handle, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Show metadata for one entry
fn cmd_stat(bundle: &Path, path: &str) -> anyhow::Result<()> {
    let artifact = load_bundle(bundle)?;
    let fs = artifact.filesystem();
    let handle = fs.open(path)?;
    let meta = handle.metadata();

    println!("{} {}", "Path:".bold(), handle.path().cyan());
    println!("  Name: {}", meta.name());
    println!("  Type: {}", if meta.is_dir() { "directory" } else { "file" });
    println!("  Size: {} ({} bytes)", format_bytes(meta.len()), meta.len());
    println!("  Mode: {:o}", meta.mode());
    if let Some(modified) = meta.modified_at() {
        println!("  Modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(gzip) = handle.gzip_bytes() {
        println!("  Stored: compressed, {}", format_bytes(gzip.len() as u64).green());
    } else if !meta.is_dir() {
        println!("  Stored: raw");
    }
    Ok(())
}

/// Print the digest of a bundle
fn cmd_digest(bundle: &Path) -> anyhow::Result<()> {
    let artifact = load_bundle(bundle)?;
    println!("{}", artifact.digest()?);
    Ok(())
}

/// Format bytes in human-readable form
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
