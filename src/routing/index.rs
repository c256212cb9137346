//! Directory route index
//!
//! Classifies the entries of one directory of the routes tree. The index is
//! rebuilt on every lookup; nothing is cached between requests.

use regex::Regex;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use super::fs::RouteFs;

/// Extension of routable templates.
pub const TEMPLATE_EXT: &str = ".ejs";

/// Default file for a directory.
pub const INDEX_FILE: &str = "index.ejs";

/// Folder-scoped middleware file name.
pub const MIDDLEWARE_FILE: &str = "middleware.toml";

/// Suffix of route-scoped middleware files (`admin.middleware.toml`).
pub const MIDDLEWARE_SUFFIX: &str = ".middleware.toml";

/// Script-style middleware names, never served even though they are not loaded.
const SCRIPT_MIDDLEWARE_FILE: &str = "middleware.js";
const SCRIPT_MIDDLEWARE_SUFFIX: &str = ".middleware.js";

static CATCH_ALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\.\.\.([A-Za-z0-9_]+)\](\.ejs)?$").expect("catch-all pattern is valid")
});

static DYNAMIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([A-Za-z0-9_]+)\](\.ejs)?$").expect("dynamic pattern is valid")
});

/// Classification of a directory entry by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Middleware files and `(group)` folders; never matched.
    Ignored,
    /// Matched literally against a segment.
    Exact,
    /// `[name]` or `[name].ejs`.
    Dynamic { param: String, template: bool },
    /// `[...name]` or `[...name].ejs`.
    CatchAll { param: String, template: bool },
}

/// One classified entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Classify an entry name.
pub fn classify(name: &str) -> EntryKind {
    if name == MIDDLEWARE_FILE
        || name.ends_with(MIDDLEWARE_SUFFIX)
        || name == SCRIPT_MIDDLEWARE_FILE
        || name.ends_with(SCRIPT_MIDDLEWARE_SUFFIX)
        || (name.starts_with('(') && name.ends_with(')'))
    {
        return EntryKind::Ignored;
    }
    if let Some(caps) = CATCH_ALL_RE.captures(name) {
        return EntryKind::CatchAll {
            param: caps[1].to_string(),
            template: caps.get(2).is_some(),
        };
    }
    if let Some(caps) = DYNAMIC_RE.captures(name) {
        return EntryKind::Dynamic {
            param: caps[1].to_string(),
            template: caps.get(2).is_some(),
        };
    }
    EntryKind::Exact
}

/// Classified listing of one directory, sorted by entry name.
///
/// Sorting makes "first match" deterministic when a directory holds more
/// than one dynamic or catch-all candidate.
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndex {
    entries: Vec<DirectoryEntry>,
}

impl DirectoryIndex {
    pub fn read(fs: &dyn RouteFs, dir: &Path) -> io::Result<Self> {
        let mut names = fs.read_dir(dir)?;
        names.sort();
        Ok(Self::from_names(names))
    }

    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let entries = names
            .into_iter()
            .map(|name| {
                let kind = classify(&name);
                DirectoryEntry { name, kind }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// First catch-all entry and its parameter name.
    pub fn catch_all(&self) -> Option<(&DirectoryEntry, &str)> {
        self.entries.iter().find_map(|entry| match &entry.kind {
            EntryKind::CatchAll { param, .. } => Some((entry, param.as_str())),
            _ => None,
        })
    }

    /// Exact entry for `segment`.
    ///
    /// On the last segment a `segment.ejs` template also matches, except for
    /// the literal segment `index`, whose template is only reachable as the
    /// directory default.
    pub fn exact(&self, segment: &str, is_last: bool) -> Option<&DirectoryEntry> {
        self.entries.iter().find(|entry| {
            entry.kind == EntryKind::Exact
                && (entry.name == segment
                    || (is_last
                        && segment != "index"
                        && entry
                            .name
                            .strip_suffix(TEMPLATE_EXT)
                            .is_some_and(|stem| stem == segment)))
        })
    }

    /// First dynamic entry usable at this depth and its parameter name.
    ///
    /// `[name].ejs` templates only match the last segment; `[name]` folders
    /// match anywhere.
    pub fn dynamic(&self, is_last: bool) -> Option<(&DirectoryEntry, &str)> {
        self.entries.iter().find_map(|entry| match &entry.kind {
            EntryKind::Dynamic { param, template } if is_last || !template => {
                Some((entry, param.as_str()))
            }
            _ => None,
        })
    }
}
