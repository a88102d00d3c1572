//! Virtual path helpers
//!
//! Embedded paths are absolute, `/`-separated UTF-8 strings with the root at
//! `/`. They never carry a trailing separator, `.` or `..` segments.

/// Root path of every embedded filesystem
pub const ROOT: &str = "/";

/// Normalize a caller-supplied path into the embedded form.
///
/// A leading `/` is optional, empty and `.` segments are dropped, `..` pops
/// one segment (never above the root) and a trailing `/` is ignored.
///
/// ```rust
/// use embedfs::vfs::path::normalize;
///
/// assert_eq!(normalize("folder/a.txt"), "/folder/a.txt");
/// assert_eq!(normalize("/folder/./b/../a.txt/"), "/folder/a.txt");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Join a child name onto an already-normalized directory path
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Last segment of a normalized path (`/` for the root)
pub fn base_name(path: &str) -> &str {
    if path == ROOT {
        return ROOT;
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a normalized path, `None` for the root
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT),
    }
}
