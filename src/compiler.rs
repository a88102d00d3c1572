//! Snapshot compiler
//!
//! Ties the pipeline together: walk the input tree, decide per file whether
//! to store it compressed, assemble the manifest, flatten it into an
//! [`Artifact`] and write it out as Rust source or a binary bundle.
//!
//! ## Determinism
//!
//! Compression runs on a rayon pool, but decisions are collected back in
//! walk order before the manifest is built, so the artifact is identical
//! for any worker count. The gzip encoder writes a zero mtime and no file
//! name, so two compiles of the same tree produce byte-identical output.
//!
//! ## Failure policy
//!
//! - An unreadable root aborts the compile.
//! - An entry that cannot be stat'ed, listed or read is logged and skipped;
//!   skipped entries are counted in the [`CompileReport`].
//! - Failing to create or write the output aborts the compile. Output goes
//!   to a temporary file next to the destination and is renamed over it
//!   only after everything was written.
//!
//! ## Example
//!
//! ```rust,no_run
//! use embedfs::compiler::CompilerBuilder;
//! use std::path::Path;
//!
//! # fn main() -> embedfs::Result<()> {
//! let compiler = CompilerBuilder::new()
//!     .module_name("web")
//!     .static_name("WEB_ASSETS")
//!     .ignore_patterns(vec!["\\.DS_Store$".to_string()])
//!     .build()?;
//! let report = compiler.compile_dir(Path::new("./static"), Path::new("src/web_vfsdata.rs"))?;
//! println!("{} files embedded", report.files);
//! # Ok(())
//! # }
//! ```

use crate::artifact::Artifact;
use crate::compression::{CompressionEngine, CompressionStats, Decision};
use crate::emit::{self, EmitOptions};
use crate::error::{EmbedError, Result};
use crate::input::{InputFs, OsFs};
use crate::manifest::ManifestBuilder;
use crate::types::CompileReport;
use crate::walker::{IgnoreSet, WalkEntry, Walker};
use flate2::Compression;
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// How the artifact is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A Rust module defining an `EmbeddedFs` static
    #[default]
    RustSource,
    /// A binary bundle for `include_bytes!` and `Artifact::from_bundle`
    Bundle,
}

impl OutputFormat {
    /// File extension used for default output names
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::RustSource => "rs",
            OutputFormat::Bundle => "bin",
        }
    }
}

/// Builder for configuring a [`Compiler`]
#[derive(Debug, Clone)]
pub struct CompilerBuilder {
    module_name: String,
    static_name: String,
    crate_path: String,
    ignore_patterns: Vec<String>,
    cfg_predicates: Vec<String>,
    follow_symlinks: bool,
    parallel_workers: usize,
    compression_level: Compression,
    output_format: OutputFormat,
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerBuilder {
    /// Create a builder with default settings
    ///
    /// # Examples
    ///
    /// ```rust
    /// use embedfs::compiler::CompilerBuilder;
    ///
    /// let compiler = CompilerBuilder::new().build().unwrap();
    /// assert_eq!(compiler.default_output_file().to_str(), Some("assets_vfsdata.rs"));
    /// ```
    pub fn new() -> Self {
        let emit = EmitOptions::default();
        Self {
            module_name: emit.module_name,
            static_name: emit.static_name,
            crate_path: emit.crate_path,
            ignore_patterns: Vec::new(),
            cfg_predicates: Vec::new(),
            follow_symlinks: false,
            parallel_workers: num_cpus::get(),
            compression_level: Compression::best(),
            output_format: OutputFormat::default(),
        }
    }

    /// Set the name of the generated module
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Set the name of the exported static
    pub fn static_name(mut self, name: impl Into<String>) -> Self {
        self.static_name = name.into();
        self
    }

    /// Set the path generated code uses to reach this crate
    ///
    /// Defaults to `::embedfs`. Use `crate::...` when the runtime is
    /// re-exported from the embedding crate.
    pub fn crate_path(mut self, path: impl Into<String>) -> Self {
        self.crate_path = path.into();
        self
    }

    /// Set ignore patterns
    ///
    /// Regular expressions matched against the full virtual path of every
    /// file and directory, for example `^/node_modules$` or `\.map$`. A
    /// matching directory is skipped together with its contents.
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set `cfg` predicates placed on the generated module
    pub fn cfg_predicates(mut self, predicates: Vec<String>) -> Self {
        self.cfg_predicates = predicates;
        self
    }

    /// Set whether symbolic links to regular files are followed
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set number of parallel workers
    ///
    /// # Notes
    ///
    /// - Defaults to the number of CPU cores
    /// - Values less than 1 are automatically set to 1
    pub fn parallel_workers(mut self, count: usize) -> Self {
        self.parallel_workers = count.max(1);
        self
    }

    /// Set the gzip compression level
    pub fn compression_level(mut self, level: Compression) -> Self {
        self.compression_level = level;
        self
    }

    /// Set the output format
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Validate the configuration and build the compiler
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for unusable names, `InvalidPattern`
    /// for an ignore pattern that is not a valid regular expression, and
    /// `Internal` if the worker pool cannot be started.
    pub fn build(self) -> Result<Compiler> {
        let emit = EmitOptions {
            module_name: self.module_name,
            static_name: self.static_name,
            crate_path: self.crate_path,
            cfg_predicates: self.cfg_predicates,
        };
        emit.validate()?;
        let ignore = IgnoreSet::new(&self.ignore_patterns)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers)
            .thread_name(|idx| format!("embedfs-compress-{}", idx))
            .build()
            .map_err(|err| EmbedError::internal(format!("can't start worker pool: {}", err)))?;

        debug!(
            "Compiler configured: {} workers, {} ignore patterns, format {:?}",
            self.parallel_workers,
            ignore.len(),
            self.output_format
        );

        Ok(Compiler {
            emit,
            ignore,
            follow_symlinks: self.follow_symlinks,
            engine: CompressionEngine::new(self.compression_level),
            format: self.output_format,
            workers: self.parallel_workers,
            pool,
        })
    }
}

/// A configured snapshot compiler
#[derive(Debug)]
pub struct Compiler {
    emit: EmitOptions,
    ignore: IgnoreSet,
    follow_symlinks: bool,
    engine: CompressionEngine,
    format: OutputFormat,
    workers: usize,
    pool: rayon::ThreadPool,
}

impl Compiler {
    /// Compiler with default settings
    pub fn new() -> Result<Self> {
        CompilerBuilder::new().build()
    }

    /// Output format this compiler writes
    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Number of compression workers
    pub fn parallel_workers(&self) -> usize {
        self.workers
    }

    /// Names used in generated source
    pub fn emit_options(&self) -> &EmitOptions {
        &self.emit
    }

    /// `<module>_vfsdata.rs`, or `.bin` for bundles
    pub fn default_output_file(&self) -> PathBuf {
        PathBuf::from(format!("{}_vfsdata.{}", self.emit.module_name, self.format.extension()))
    }

    /// Walk `root` on `fs` and build the artifact without writing it
    ///
    /// # Errors
    ///
    /// Fails if the root cannot be read or the manifest cannot be built.
    pub fn build_artifact(&self, fs: &dyn InputFs, root: &str) -> Result<(Artifact, CompileReport)> {
        self.build_artifact_with_progress(fs, root, |_| {})
    }

    /// Like [`build_artifact`](Self::build_artifact), calling `progress`
    /// with each file's path once it has been compressed
    ///
    /// `progress` runs on the worker threads.
    pub fn build_artifact_with_progress<F>(
        &self,
        fs: &dyn InputFs,
        root: &str,
        progress: F,
    ) -> Result<(Artifact, CompileReport)>
    where
        F: Fn(&str) + Sync,
    {
        let start = Instant::now();
        info!("Compiling snapshot of {}", root);

        let walker = Walker::new(fs)
            .with_ignore(self.ignore.clone())
            .follow_symlinks(self.follow_symlinks);
        let mut walk = walker.walk(root)?;
        let entries: Vec<WalkEntry<'_>> = walk.by_ref().collect();
        let mut skipped = walk.skipped();
        debug!(
            "Walked {} entries ({} skipped, {} ignored)",
            entries.len(),
            skipped,
            walk.ignored()
        );

        let engine = self.engine;
        let decisions: Vec<Option<Result<Decision>>> = self.pool.install(|| {
            entries
                .par_iter()
                .map(|entry| {
                    if entry.is_dir() {
                        return None;
                    }
                    let decision = entry
                        .open()
                        .map_err(EmbedError::from)
                        .and_then(|reader| engine.decide(&entry.path, reader, entry.metadata.len));
                    progress(&entry.path);
                    Some(decision)
                })
                .collect()
        });

        let mut builder = ManifestBuilder::new();
        let mut stats = CompressionStats::default();
        for (entry, decision) in entries.iter().zip(decisions) {
            match decision {
                None => builder.add_dir(&entry.path, entry.metadata.modified)?,
                Some(Ok(decision)) => {
                    stats.record(&decision);
                    builder.add_file(&entry.path, entry.metadata.modified, decision)?;
                }
                Some(Err(err)) => {
                    warn!("Skipping {}: can't read: {}", entry.source, err);
                    skipped += 1;
                }
            }
        }

        let manifest = builder.build();
        let artifact = Artifact::from_manifest(&manifest);
        let report = CompileReport {
            files: artifact.file_count(),
            directories: artifact.dir_count(),
            skipped,
            compression: stats,
            total_size: artifact.total_size(),
            digest: artifact.digest()?,
            output: None,
            duration: start.elapsed(),
        };

        info!(
            "Snapshot ready: {} files, {} directories, {} skipped, {} bytes saved by compression",
            report.files, report.directories, report.skipped, report.compression.bytes_saved
        );
        Ok((artifact, report))
    }

    /// Render `artifact` in this compiler's output format
    pub fn render(&self, artifact: &Artifact) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::RustSource => Ok(emit::to_rust_source(artifact, &self.emit)?.into_bytes()),
            OutputFormat::Bundle => artifact.to_bundle(),
        }
    }

    /// Render `artifact` and atomically write it to `output`
    ///
    /// # Errors
    ///
    /// Returns `Output` if the temporary file cannot be created, written or
    /// renamed over `output`.
    pub fn write_artifact(&self, artifact: &Artifact, output: &Path) -> Result<()> {
        let bytes = self.render(artifact)?;
        let output_error = |source: io::Error| EmbedError::Output {
            path: output.to_path_buf(),
            source,
        };

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(output_error)?;
        file.write_all(&bytes).map_err(output_error)?;
        file.flush().map_err(output_error)?;
        file.persist(output).map_err(|err| output_error(err.error))?;

        debug!("Wrote {} bytes to {:?}", bytes.len(), output);
        Ok(())
    }

    /// Compile `root` on `fs` and write the result to `output`
    pub fn compile(&self, fs: &dyn InputFs, root: &str, output: &Path) -> Result<CompileReport> {
        self.compile_with_progress(fs, root, output, |_| {})
    }

    /// Like [`compile`](Self::compile) with a per-file progress callback
    pub fn compile_with_progress<F>(
        &self,
        fs: &dyn InputFs,
        root: &str,
        output: &Path,
        progress: F,
    ) -> Result<CompileReport>
    where
        F: Fn(&str) + Sync,
    {
        let (artifact, mut report) = self.build_artifact_with_progress(fs, root, progress)?;
        self.write_artifact(&artifact, output)?;
        report.output = Some(output.to_path_buf());
        Ok(report)
    }

    /// Compile a directory on the local filesystem
    pub fn compile_dir(&self, input: &Path, output: &Path) -> Result<CompileReport> {
        self.compile_dir_with_progress(input, output, |_| {})
    }

    /// Like [`compile_dir`](Self::compile_dir) with a per-file progress
    /// callback
    pub fn compile_dir_with_progress<F>(&self, input: &Path, output: &Path, progress: F) -> Result<CompileReport>
    where
        F: Fn(&str) + Sync,
    {
        let fs = OsFs::new(input);
        self.compile_with_progress(&fs, crate::vfs::path::ROOT, output, progress)
            .map_err(|err| match err {
                EmbedError::RootUnreadable { source, .. } => EmbedError::RootUnreadable {
                    path: input.display().to_string(),
                    source,
                },
                EmbedError::NotADirectory(_) => EmbedError::NotADirectory(input.display().to_string()),
                other => other,
            })
    }
}
