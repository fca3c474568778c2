//! Re-verify tree results and manifests against the files on disk

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use evidence_core::ProgressContext;

use crate::digest::{self, HashOptions, RootDigestStrategy};
use crate::enumerate::{self, EnumeratedFile, ScanOptions};
use crate::error::Result;
use crate::manifest::IngestManifest;
use crate::stage::{FileRecord, Stage};
use crate::tree::TreeDigestResult;

/// Outcome for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Ok,
    /// Present, content differs.
    Modified,
    /// Recorded, no longer on disk.
    Missing,
    /// On disk, not recorded.
    Unexpected,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Modified => "MODIFIED",
            Self::Missing => "MISSING",
            Self::Unexpected => "UNEXPECTED",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    pub stage: Option<Stage>,
    pub path: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub status: FileStatus,
}

/// Result of re-hashing everything an artifact describes.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub strategy: RootDigestStrategy,
    pub expected_root: String,
    /// Root digest of what is on disk now, same strategy.
    pub actual_root: String,
    pub files: Vec<FileCheck>,
}

impl VerifyReport {
    pub fn root_matches(&self) -> bool {
        self.expected_root == self.actual_root
    }

    pub fn is_ok(&self) -> bool {
        self.root_matches() && self.files.iter().all(|f| f.status == FileStatus::Ok)
    }

    pub fn problems(&self) -> impl Iterator<Item = &FileCheck> {
        self.files.iter().filter(|f| f.status != FileStatus::Ok)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}

type Key = (Option<Stage>, String);

/// Diff recorded files against freshly computed ones.
fn compare(recorded: &[FileRecord], current: &[FileRecord]) -> Vec<FileCheck> {
    let mut now: BTreeMap<Key, &FileRecord> = current
        .iter()
        .map(|r| ((r.stage, r.path.clone()), r))
        .collect();

    let mut checks = Vec::with_capacity(recorded.len());
    for rec in recorded {
        let key = (rec.stage, rec.path.clone());
        let (actual, status) = match now.remove(&key) {
            Some(cur) if cur.sha256 == rec.sha256 => (Some(cur.sha256.clone()), FileStatus::Ok),
            Some(cur) => (Some(cur.sha256.clone()), FileStatus::Modified),
            None => (None, FileStatus::Missing),
        };
        checks.push(FileCheck {
            stage: rec.stage,
            path: rec.path.clone(),
            expected: Some(rec.sha256.clone()),
            actual,
            status,
        });
    }
    for ((stage, path), cur) in now {
        checks.push(FileCheck {
            stage,
            path,
            expected: None,
            actual: Some(cur.sha256.clone()),
            status: FileStatus::Unexpected,
        });
    }
    checks
}

fn rehash(
    tagged: Vec<(Option<Stage>, EnumeratedFile)>,
    hash: &HashOptions,
    progress: &ProgressContext,
) -> Result<Vec<FileRecord>> {
    let files: Vec<EnumeratedFile> = tagged.iter().map(|(_, f)| f.clone()).collect();
    let pb = progress.files_bar("verify", files.len() as u64);
    let digested = digest::digest_files(&files, hash, &pb)?;
    pb.finish_and_clear();
    Ok(tagged
        .iter()
        .zip(&digested)
        .map(|((stage, _), d)| FileRecord::from_digested(d, *stage))
        .collect())
}

/// Re-hash the tree a [`TreeDigestResult`] describes.
///
/// `dir` overrides the recorded directory (e.g. the tree was moved).
/// Scan policy and root strategy always come from the artifact.
pub fn verify_tree(
    result: &TreeDigestResult,
    dir: Option<&Path>,
    hash: &HashOptions,
    progress: &ProgressContext,
) -> Result<VerifyReport> {
    let dir = dir.unwrap_or(&result.source_directory);
    let files = enumerate::enumerate(dir, &result.scan_options())?;
    let current = rehash(files.into_iter().map(|f| (None, f)).collect(), hash, progress)?;

    let strategy = result.root_hash_strategy;
    Ok(VerifyReport {
        strategy,
        expected_root: result.root_hash.clone(),
        actual_root: strategy.root_digest(&current),
        files: compare(&result.files, &current),
    })
}

/// Re-hash every stage root a manifest recorded.
pub fn verify_manifest(
    manifest: &IngestManifest,
    hash: &HashOptions,
    progress: &ProgressContext,
) -> Result<VerifyReport> {
    let scan = ScanOptions::new(manifest.hidden_files);
    let mut tagged = Vec::new();
    for (stage, root) in &manifest.stage_roots {
        let files = enumerate::enumerate(root, &scan)?;
        tagged.extend(files.into_iter().map(|f| (Some(*stage), f)));
    }
    let current = rehash(tagged, hash, progress)?;

    let strategy = manifest.root_hash_strategy;
    Ok(VerifyReport {
        strategy,
        expected_root: manifest.root_hash.clone(),
        actual_root: strategy.root_digest(&current),
        files: compare(&manifest.files, &current),
    })
}
