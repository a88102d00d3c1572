//! Identifier allocation and byte-string escaping for generated source
//!
//! Every embedded file gets a `const` holding its bytes. Names are derived
//! from the file's path, upper-cased, with anything outside `[A-Z0-9_]`
//! replaced by `_`. Two paths can sanitize to the same name (`/a-b` and
//! `/a_b`), so the allocator appends a numeric suffix until the name is
//! unused.

use crate::error::{EmbedError, Result};
use std::collections::HashSet;
use std::fmt::Write;

/// Rust keywords, strict and reserved, which can never be identifiers
const KEYWORDS: &[&str] = &[
    "Self", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "self", "static", "struct", "super",
    "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Upper bound on suffixes tried for one name
pub const MAX_SUFFIX: u32 = u16::MAX as u32;

/// Whether `name` can be used as a plain Rust identifier
pub fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name != "_"
        && !KEYWORDS.contains(&name)
}

/// Whether `path` is a usable `use` path prefix such as `::embedfs` or
/// `crate::runtime`
pub fn is_valid_path(path: &str) -> bool {
    let trimmed = path.strip_prefix("::").unwrap_or(path);
    !trimmed.is_empty()
        && trimmed
            .split("::")
            .enumerate()
            .all(|(idx, segment)| is_valid_ident(segment) || (idx == 0 && matches!(segment, "crate" | "self" | "super")))
}

/// Sanitize a path into an upper-case identifier stem
fn sanitize(prefix: &str, path: &str) -> String {
    let mut ident = String::with_capacity(prefix.len() + path.len());
    ident.push_str(prefix);
    for c in path.trim_start_matches('/').chars() {
        if c.is_ascii_alphanumeric() {
            ident.push(c.to_ascii_uppercase());
        } else {
            ident.push('_');
        }
    }
    ident
}

/// Hands out unique identifiers within one generated module
#[derive(Debug, Clone)]
pub struct NameAllocator {
    prefix: String,
    used: HashSet<String>,
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new("FILE_")
    }
}

impl NameAllocator {
    /// Allocate names beginning with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            used: HashSet::new(),
        }
    }

    /// Mark a name as taken without allocating it
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    /// Allocate a unique identifier for `path`
    ///
    /// # Errors
    ///
    /// Returns `NameCollision` once [`MAX_SUFFIX`] suffixes are exhausted.
    pub fn allocate(&mut self, path: &str) -> Result<String> {
        let stem = sanitize(&self.prefix, path);
        if !self.used.contains(&stem) {
            self.used.insert(stem.clone());
            return Ok(stem);
        }

        for suffix in 2..=MAX_SUFFIX {
            let candidate = format!("{}_{}", stem, suffix);
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return Ok(candidate);
            }
        }
        Err(EmbedError::NameCollision(path.to_string()))
    }
}

/// Escape bytes for the body of a Rust byte-string literal (`b"..."`).
///
/// Printable ASCII is kept except `"` and `\`; every other byte becomes
/// `\xNN`. The literal decodes back to exactly `bytes`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        match byte {
            b'"' | b'\\' => {}
            0x20..=0x7e => {
                escaped.push(byte as char);
                continue;
            }
            _ => {}
        }
        let _ = write!(escaped, "\\x{:02x}", byte);
    }
    escaped
}

/// Escape a UTF-8 string for the body of a Rust string literal
pub fn escape_str(text: &str) -> String {
    text.escape_default().to_string()
}
