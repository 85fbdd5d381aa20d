//! Path algebra for the virtual filesystem.
//!
//! Two path forms exist: relative paths (what callers see, rooted at `/`)
//! and absolute paths (relative prefixed with the configured server root,
//! what the transport sees). All functions here are pure string work —
//! no I/O, no transport calls.

/// Normalize a path: backslashes become slashes, runs of slashes collapse
/// to one, and a trailing slash is trimmed (the bare `/` is kept).
///
/// Idempotent: `clean(clean(p)) == clean(p)`.
pub fn clean(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if !prev_slash {
                out.push('/');
            }
            prev_slash = true;
        } else {
            out.push(ch);
            prev_slash = false;
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Normalize like [`clean`], then drop every directory segment, keeping
/// only the final filename without its extension, prefixed with a slash.
/// Used when comparing a deep path against a flat name listing.
pub fn filename_component(path: &str) -> String {
    let cleaned = clean(path);
    format!("/{}", stem(basename(&cleaned)))
}

/// Final path segment, extension included. The root (`/`) and the empty
/// string have no segment and return `""`.
pub fn basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Containing directory of `path`: `/a/b.txt` -> `/a`, `/a` -> `/`.
/// The root is its own parent.
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

/// Extension of the final segment, without the dot. A leading-dot name
/// (`.htaccess`) has no extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Final segment with its extension (and the dot) removed.
pub fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Whether the final segment carries an extension. This is what the
/// structural file/directory classification keys on.
pub fn has_extension(path: &str) -> bool {
    extension(path).is_some()
}

/// Join a directory path and a child name with exactly one separator.
pub fn join(dir: &str, name: &str) -> String {
    clean(&format!("{}/{}", dir, name))
}

/// Append a trailing slash unless one is present (directory display form).
pub fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// The self/parent entries some servers include in name listings.
pub fn is_dot_segment(name: &str) -> bool {
    matches!(name, "." | "..")
}

/// Reject paths that try to climb out of the root via `..` segments,
/// and empty paths. Bare `.` segments are harmless and allowed.
pub fn is_traversal_safe(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    !clean(path).split('/').any(|segment| segment == "..")
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Converts between relative and absolute path forms around a fixed root.
///
/// The root is cleaned once at construction and never changes afterwards.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: String,
}

impl PathResolver {
    pub fn new(root: &str) -> Self {
        let cleaned = clean(root);
        let root = if cleaned.is_empty() {
            "/".to_string()
        } else {
            cleaned
        };
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Strip the root prefix if present; already-relative paths pass
    /// through (cleaned). The root itself maps to `/`.
    pub fn to_relative(&self, path: &str) -> String {
        let cleaned = clean(path);
        match self.strip_root(&cleaned) {
            Some(rest) if rest.is_empty() => "/".to_string(),
            Some(rest) => clean(&format!("/{}", rest)),
            None => {
                if cleaned.starts_with('/') {
                    cleaned
                } else {
                    clean(&format!("/{}", cleaned))
                }
            }
        }
    }

    /// Prefix with the root unless the path already carries it. The bare
    /// `/` maps to the root itself.
    pub fn to_absolute(&self, path: &str) -> String {
        let cleaned = clean(path);
        if self.strip_root(&cleaned).is_some() {
            return cleaned;
        }
        if cleaned == "/" || cleaned.is_empty() {
            return self.root.clone();
        }
        clean(&format!("{}/{}", self.root, cleaned))
    }

    /// Whether `path` denotes the root, in either form.
    pub fn is_root(&self, path: &str) -> bool {
        self.to_absolute(path) == self.root
    }

    /// Returns the part after the root when `path` starts with it on a
    /// segment boundary (`/data` must not swallow `/database`).
    fn strip_root<'a>(&self, cleaned: &'a str) -> Option<&'a str> {
        if self.root == "/" {
            return cleaned.strip_prefix('/');
        }
        let rest = cleaned.strip_prefix(self.root.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest.trim_start_matches('/'))
        } else {
            None
        }
    }
}
