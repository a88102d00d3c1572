//! Rust source emission
//!
//! Renders an [`Artifact`] as a module that defines a
//! `pub static <NAME>: EmbeddedFs<'static>` over a private entry table.
//! The output looks like:
//!
//! ```text
//! // Code generated by embedfs. DO NOT EDIT.
//!
//! #[cfg(not(debug_assertions))]
//! pub mod assets {
//!     use ::embedfs::vfs::{Directory, EmbeddedFs, Entry, RawFile, Timestamp};
//!
//!     const FILE_A_TXT: &[u8] = b"Stuff.";
//!
//!     static ASSETS_ENTRIES: [(&str, Entry<'static>); 2] = [
//!         ("/", Entry::Directory(Directory::new("/", Timestamp::new(0, 0), &["/a.txt"]))),
//!         ("/a.txt", Entry::Raw(RawFile::new("a.txt", Timestamp::new(0, 0), FILE_A_TXT))),
//!     ];
//!
//!     pub static ASSETS: EmbeddedFs<'static> = EmbeddedFs::from_static(&ASSETS_ENTRIES);
//! }
//! ```
//!
//! `Entry` has drop glue, so the table must be a named static rather than
//! a temporary array passed to `from_static`. Entries are written in path
//! order, which is the order the runtime binary-searches. Only the entry
//! types the artifact actually uses are imported.

use crate::artifact::{Artifact, Descriptor};
use crate::error::{EmbedError, Result};
use crate::naming::{self, NameAllocator};
use crate::types::Timestamp;
use std::collections::HashMap;
use std::io::Write;

/// First line of every generated file
pub const GENERATED_MARKER: &str = "// Code generated by embedfs. DO NOT EDIT.";

/// What to call things in the generated module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Name of the generated module
    pub module_name: String,
    /// Name of the exported static
    pub static_name: String,
    /// Path the generated code uses to reach this crate
    pub crate_path: String,
    /// Predicates written verbatim as `#[cfg(...)]` on the module
    pub cfg_predicates: Vec<String>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            module_name: "assets".to_string(),
            static_name: "ASSETS".to_string(),
            crate_path: "::embedfs".to_string(),
            cfg_predicates: Vec::new(),
        }
    }
}

impl EmitOptions {
    /// Check that every name is usable in Rust source
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !naming::is_valid_ident(&self.module_name) {
            return Err(EmbedError::invalid_config(format!(
                "module name {:?} is not a Rust identifier",
                self.module_name
            )));
        }
        if !naming::is_valid_ident(&self.static_name) {
            return Err(EmbedError::invalid_config(format!(
                "static name {:?} is not a Rust identifier",
                self.static_name
            )));
        }
        if !naming::is_valid_path(&self.crate_path) {
            return Err(EmbedError::invalid_config(format!(
                "crate path {:?} is not a Rust path",
                self.crate_path
            )));
        }
        if let Some(pred) = self.cfg_predicates.iter().find(|p| p.trim().is_empty()) {
            return Err(EmbedError::invalid_config(format!("empty cfg predicate {:?}", pred)));
        }
        Ok(())
    }
}

fn timestamp(ts: Timestamp) -> String {
    format!("Timestamp::new({}, {})", ts.secs, ts.nanos)
}

/// Write `artifact` as Rust source to `out`
///
/// # Errors
///
/// Fails on invalid options, an unresolvable name collision, or a write
/// error.
pub fn write_rust_source<W: Write>(artifact: &Artifact, options: &EmitOptions, out: &mut W) -> Result<()> {
    options.validate()?;

    let table = format!("{}_ENTRIES", options.static_name);
    let mut names = NameAllocator::default();
    names.reserve(options.static_name.clone());
    names.reserve(table.clone());
    let mut idents = HashMap::new();
    for (entry_path, descriptor) in &artifact.entries {
        if !descriptor.is_dir() {
            idents.insert(entry_path.as_str(), names.allocate(entry_path)?);
        }
    }

    writeln!(out, "{}", GENERATED_MARKER)?;
    writeln!(out)?;
    for pred in &options.cfg_predicates {
        writeln!(out, "#[cfg({})]", pred.trim())?;
    }
    writeln!(out, "pub mod {} {{", options.module_name)?;

    let mut imports = vec!["Directory", "EmbeddedFs", "Entry"];
    if artifact.has_compressed_files {
        imports.push("CompressedFile");
    }
    if artifact.has_raw_files {
        imports.push("RawFile");
    }
    imports.push("Timestamp");
    imports.sort_unstable();
    writeln!(out, "    use {}::vfs::{{{}}};", options.crate_path, imports.join(", "))?;
    writeln!(out)?;

    for (entry_path, descriptor) in &artifact.entries {
        let bytes = match descriptor {
            Descriptor::RawFile { content, .. } => content,
            Descriptor::CompressedFile { compressed_content, .. } => compressed_content,
            Descriptor::Directory { .. } => continue,
        };
        writeln!(
            out,
            "    const {}: &[u8] = b\"{}\";",
            idents[entry_path.as_str()],
            naming::escape_bytes(bytes)
        )?;
    }
    if !idents.is_empty() {
        writeln!(out)?;
    }

    writeln!(
        out,
        "    static {}: [(&str, Entry<'static>); {}] = [",
        table,
        artifact.entries.len()
    )?;
    for (entry_path, descriptor) in &artifact.entries {
        let path_lit = naming::escape_str(entry_path);
        let name_lit = naming::escape_str(descriptor.name());
        let entry = match descriptor {
            Descriptor::RawFile { modified, .. } => format!(
                "Entry::Raw(RawFile::new(\"{}\", {}, {}))",
                name_lit,
                timestamp(*modified),
                idents[entry_path.as_str()]
            ),
            Descriptor::CompressedFile {
                modified,
                uncompressed_size,
                ..
            } => format!(
                "Entry::Compressed(CompressedFile::new(\"{}\", {}, {}, {}))",
                name_lit,
                timestamp(*modified),
                idents[entry_path.as_str()],
                uncompressed_size
            ),
            Descriptor::Directory { modified, children, .. } => {
                let children = children
                    .iter()
                    .map(|child| format!("\"{}\"", naming::escape_str(child)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Entry::Directory(Directory::new(\"{}\", {}, &[{}]))",
                    name_lit,
                    timestamp(*modified),
                    children
                )
            }
        };
        writeln!(out, "        (\"{}\", {}),", path_lit, entry)?;
    }
    writeln!(out, "    ];")?;
    writeln!(out)?;
    writeln!(
        out,
        "    pub static {}: EmbeddedFs<'static> = EmbeddedFs::from_static(&{});",
        options.static_name, table
    )?;
    writeln!(out, "}}")?;
    Ok(())
}

/// Render `artifact` as a Rust source string
pub fn to_rust_source(artifact: &Artifact, options: &EmitOptions) -> Result<String> {
    let mut out = Vec::new();
    write_rust_source(artifact, options, &mut out)?;
    String::from_utf8(out).map_err(|err| EmbedError::internal(format!("generated source is not UTF-8: {}", err)))
}
