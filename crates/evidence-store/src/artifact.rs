//! Staged artifact writes: everything lands as `.tmp`, then renames together
//!
//! A failed run leaves nothing behind that could pass for a finished
//! artifact. Dropping an uncommitted [`ArtifactSet`] removes its `.tmp` files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ProvenanceError, Result};

/// Whether committing may replace an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `ArtifactExists` if the target is already there.
    CreateNew,
    /// Atomically replace the target.
    Replace,
}

#[derive(Debug)]
struct Staged {
    tmp: PathBuf,
    target: PathBuf,
}

/// A group of files written all-or-nothing into one directory.
#[derive(Debug)]
pub struct ArtifactSet {
    dir: PathBuf,
    mode: WriteMode,
    staged: Vec<Staged>,
    committed: bool,
}

impl ArtifactSet {
    /// Prepare to write into `dir`, creating it if needed.
    pub fn new(dir: &Path, mode: WriteMode) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| ProvenanceError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            mode,
            staged: Vec::new(),
            committed: false,
        })
    }

    /// Write `contents` to `<dir>/<name>.tmp`.
    pub fn stage(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        let target = self.dir.join(name);
        if self.mode == WriteMode::CreateNew && target.exists() {
            return Err(ProvenanceError::ArtifactExists(target));
        }
        let tmp = self.dir.join(format!("{name}.tmp"));
        // Track before writing so a partial write is still cleaned up
        self.staged.push(Staged {
            tmp: tmp.clone(),
            target,
        });
        fs::write(&tmp, contents).map_err(|e| ProvenanceError::io(&tmp, e))
    }

    /// Rename every staged file into place. Returns the final paths.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        if self.mode == WriteMode::CreateNew {
            if let Some(s) = self.staged.iter().find(|s| s.target.exists()) {
                return Err(ProvenanceError::ArtifactExists(s.target.clone()));
            }
        }

        let mut written = Vec::with_capacity(self.staged.len());
        for s in &self.staged {
            match self.mode {
                WriteMode::Replace => {
                    fs::rename(&s.tmp, &s.target).map_err(|e| ProvenanceError::io(&s.target, e))?;
                }
                // rename() clobbers on unix; a hard link fails if the target appeared
                WriteMode::CreateNew => {
                    fs::hard_link(&s.tmp, &s.target).map_err(|e| {
                        if e.kind() == io::ErrorKind::AlreadyExists {
                            ProvenanceError::ArtifactExists(s.target.clone())
                        } else {
                            ProvenanceError::io(&s.target, e)
                        }
                    })?;
                    fs::remove_file(&s.tmp).map_err(|e| ProvenanceError::io(&s.tmp, e))?;
                }
            }
            written.push(s.target.clone());
        }
        self.committed = true;
        Ok(written)
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for s in &self.staged {
            if s.tmp.exists() {
                log::warn!("removing unfinished artifact {}", s.tmp.display());
                let _ = fs::remove_file(&s.tmp);
            }
        }
    }
}
