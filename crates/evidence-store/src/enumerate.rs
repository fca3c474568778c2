//! Directory enumeration: the deterministic file list every digest starts from

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};

/// What to do with files whose name starts with `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenFiles {
    /// Human-curated trees: editor swap files and `.DS_Store` are noise.
    #[default]
    Exclude,
    /// Generated output trees: every file the producer wrote counts.
    Include,
}

impl fmt::Display for HiddenFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exclude => "exclude",
            Self::Include => "include",
        })
    }
}

impl FromStr for HiddenFiles {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exclude" => Ok(Self::Exclude),
            "include" => Ok(Self::Include),
            other => Err(format!("expected 'exclude' or 'include', got '{other}'")),
        }
    }
}

/// Enumeration policy. Always chosen by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub hidden: HiddenFiles,
    /// Relative paths (`/`-separated) skipped by exact match.
    /// Used for artifacts this tool writes inside the tree it scans.
    pub reserved: Vec<String>,
}

impl ScanOptions {
    pub fn new(hidden: HiddenFiles) -> Self {
        Self {
            hidden,
            reserved: Vec::new(),
        }
    }

    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    fn keeps(&self, relative: &str) -> bool {
        let name = relative.rsplit('/').next().unwrap_or(relative);
        if self.hidden == HiddenFiles::Exclude && name.starts_with('.') {
            return false;
        }
        !self.reserved.iter().any(|r| r == relative)
    }
}

/// A regular file found under the scanned root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratedFile {
    /// Absolute path, used for reading.
    pub path: PathBuf,
    /// Path relative to the root, `/`-separated on every platform.
    pub relative: String,
    pub size_bytes: u64,
}

/// Resolve `dir` to an absolute path, failing if it is not a directory.
pub fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(ProvenanceError::NotADirectory(dir.to_path_buf()));
    }
    dir.canonicalize().map_err(|e| ProvenanceError::io(dir, e))
}

/// Join path components with `/` regardless of the host separator.
pub fn to_slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// List every regular file below `dir`, recursively, sorted by relative
/// path in byte order.
///
/// Symlinks are followed, so a link to a file counts as that file.
/// Any entry that cannot be read or named aborts the scan.
pub fn enumerate(dir: &Path, opts: &ScanOptions) -> Result<Vec<EnumeratedFile>> {
    let root = resolve_dir(dir)?;

    let mut files = Vec::new();
    let mut ancestors = vec![root.clone()];
    walk(&root, "", opts, &mut ancestors, &mut files)?;

    // Byte order on the normalised path, independent of read_dir order
    files.sort_by(|a, b| a.relative.as_bytes().cmp(b.relative.as_bytes()));
    log::debug!("{}: {} files", root.display(), files.len());
    Ok(files)
}

fn walk(
    dir: &Path,
    prefix: &str,
    opts: &ScanOptions,
    ancestors: &mut Vec<PathBuf>,
    files: &mut Vec<EnumeratedFile>,
) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| ProvenanceError::io(dir, e))? {
        let entry = entry.map_err(|e| ProvenanceError::io(dir, e))?;
        let path = entry.path();
        let name = entry_name(&path, entry.file_name())?;
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        let meta = fs::metadata(&path).map_err(|e| ProvenanceError::io(&path, e))?;
        if meta.is_dir() {
            let real = path.canonicalize().map_err(|e| ProvenanceError::io(&path, e))?;
            if ancestors.contains(&real) {
                return Err(ProvenanceError::SymlinkLoop(path));
            }
            ancestors.push(real);
            walk(&path, &relative, opts, ancestors, files)?;
            ancestors.pop();
        } else if meta.is_file() {
            if !opts.keeps(&relative) {
                log::debug!("skipping {relative}");
                continue;
            }
            files.push(EnumeratedFile {
                path,
                relative,
                size_bytes: meta.len(),
            });
        }
    }
    Ok(())
}

/// Entry name as it will appear in digest lists.
///
/// Names must be UTF-8 and free of line breaks and backslashes, so every
/// digest-list line maps to exactly one file.
fn entry_name(path: &Path, name: OsString) -> Result<String> {
    let name = name
        .into_string()
        .map_err(|_| ProvenanceError::UnsupportedFileName {
            path: path.to_path_buf(),
            reason: "not valid UTF-8",
        })?;
    if name.contains(['\n', '\r', '\\']) {
        return Err(ProvenanceError::UnsupportedFileName {
            path: path.to_path_buf(),
            reason: "contains a line break or backslash",
        });
    }
    Ok(name)
}
