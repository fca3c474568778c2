//! Whole-tree digest: enumerate, hash, combine, and the three tree artifacts

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use evidence_core::ProgressContext;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactSet, WriteMode};
use crate::digest::{self, HashOptions, RootDigestStrategy};
use crate::enumerate::{self, HiddenFiles, ScanOptions};
use crate::error::{ProvenanceError, Result};
use crate::stage::FileRecord;

/// Bumped whenever the JSON layout or a digest rule changes.
pub const TREE_SCHEMA_VERSION: u32 = 1;

/// Per-file digest list.
pub const DIGEST_LIST_FILE: &str = "files.sha256";
/// Bare root digest.
pub const ROOT_HASH_FILE: &str = "root_hash.txt";
/// Full [`TreeDigestResult`] as JSON.
pub const TREE_JSON_FILE: &str = "hash_tree.json";

/// Names the tree artifacts occupy in their output directory.
pub const TREE_ARTIFACTS: [&str; 3] = [DIGEST_LIST_FILE, ROOT_HASH_FILE, TREE_JSON_FILE];

/// Paths, relative to `root`, that tree artifacts written to `out_dir`
/// would occupy. Empty when `out_dir` does not exist or lies outside `root`.
pub fn artifacts_within(root: &Path, out_dir: &Path) -> Vec<String> {
    let (root, out) = match (root.canonicalize(), out_dir.canonicalize()) {
        (Ok(root), Ok(out)) => (root, out),
        _ => return Vec::new(),
    };
    let Ok(rel) = out.strip_prefix(&root) else {
        return Vec::new();
    };
    let prefix = enumerate::to_slash_path(rel);
    TREE_ARTIFACTS
        .iter()
        .map(|name| {
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            }
        })
        .collect()
}

/// Digest of one directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDigestResult {
    pub schema_version: u32,
    /// Absolute path of the scanned root.
    #[serde(rename = "directory")]
    pub source_directory: PathBuf,
    pub file_count: usize,
    pub files: Vec<FileRecord>,
    pub root_hash: String,
    pub root_hash_strategy: RootDigestStrategy,
    /// Scan policy, kept so verification re-enumerates the same way.
    pub hidden_files: HiddenFiles,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl TreeDigestResult {
    /// Body of `files.sha256`.
    pub fn digest_list(&self) -> String {
        self.root_hash_strategy.digest_list(&self.files)
    }

    /// Write `files.sha256`, `root_hash.txt`, and `hash_tree.json` into
    /// `out_dir`, all or nothing. Existing tree artifacts are replaced.
    pub fn write_artifacts(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            ProvenanceError::Serialize {
                what: "tree digest",
                source,
            }
        })?;

        let mut set = ArtifactSet::new(out_dir, WriteMode::Replace)?;
        set.stage(DIGEST_LIST_FILE, self.digest_list().as_bytes())?;
        set.stage(ROOT_HASH_FILE, self.root_hash.as_bytes())?;
        set.stage(TREE_JSON_FILE, json.as_bytes())?;
        set.commit()
    }

    /// Load a `hash_tree.json`.
    pub fn read_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ProvenanceError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| ProvenanceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new(self.hidden_files).with_reserved(self.reserved.iter().cloned())
    }
}

/// Enumerate and digest one tree. Nothing is written.
///
/// A tree with no eligible files is an error, not an empty success.
pub fn hash_tree(
    dir: &Path,
    scan: &ScanOptions,
    hash: &HashOptions,
    strategy: RootDigestStrategy,
    progress: &ProgressContext,
) -> Result<TreeDigestResult> {
    hash_tree_at(dir, scan, hash, strategy, progress, Utc::now())
}

/// [`hash_tree`] with a fixed timestamp.
pub fn hash_tree_at(
    dir: &Path,
    scan: &ScanOptions,
    hash: &HashOptions,
    strategy: RootDigestStrategy,
    progress: &ProgressContext,
    computed_at: DateTime<Utc>,
) -> Result<TreeDigestResult> {
    let root = enumerate::resolve_dir(dir)?;

    let spinner = progress.stage_line("scan");
    spinner.set_message(root.display().to_string());
    let files = enumerate::enumerate(&root, scan)?;
    spinner.finish_and_clear();
    if files.is_empty() {
        return Err(ProvenanceError::EmptyIngest(vec![root]));
    }

    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
    log::info!(
        "{}: hashing {} files ({})",
        root.display(),
        evidence_core::fmt_num(files.len() as u64),
        evidence_core::fmt_bytes(total_bytes)
    );

    let pb = progress.files_bar("hash", files.len() as u64);
    let digested = digest::digest_files(&files, hash, &pb)?;
    pb.finish_and_clear();

    let records: Vec<FileRecord> = digested
        .iter()
        .map(|d| FileRecord::from_digested(d, None))
        .collect();
    let root_hash = strategy.root_digest(&records);

    Ok(TreeDigestResult {
        schema_version: TREE_SCHEMA_VERSION,
        source_directory: root,
        file_count: records.len(),
        files: records,
        root_hash,
        root_hash_strategy: strategy,
        hidden_files: scan.hidden,
        reserved: scan.reserved.clone(),
        computed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn opts() -> (ScanOptions, HashOptions, ProgressContext) {
        (
            ScanOptions::default(),
            HashOptions::default(),
            ProgressContext::hidden(),
        )
    }

    fn tree(dir: &Path, strategy: RootDigestStrategy) -> TreeDigestResult {
        let (scan, hash, progress) = opts();
        hash_tree(dir, &scan, &hash, strategy, &progress).unwrap()
    }

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("2026-02")).unwrap();
        fs::write(dir.join("2026-02/se3.json"), b"[1,2,3]").unwrap();
        fs::write(dir.join("2026-02/se4.json"), b"[4]").unwrap();
        fs::write(dir.join("README"), b"prices").unwrap();
    }

    #[test]
    fn deterministic_except_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());

        let a = tree(dir.path(), RootDigestStrategy::SortedDigests);
        let b = tree(dir.path(), RootDigestStrategy::SortedDigests);
        assert_eq!(a.root_hash, b.root_hash);
        assert_eq!(a.files, b.files);
        assert_eq!(a.file_count, 3);
        assert_eq!(a.source_directory, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn layout_independent_under_sorted_digests() {
        let one = tempfile::tempdir().unwrap();
        populate(one.path());

        let two = tempfile::tempdir().unwrap();
        fs::create_dir_all(two.path().join("x/y")).unwrap();
        fs::write(two.path().join("README"), b"prices").unwrap();
        fs::write(two.path().join("x/y/first.json"), b"[4]").unwrap();
        fs::write(two.path().join("x/last.json"), b"[1,2,3]").unwrap();

        let s = RootDigestStrategy::SortedDigests;
        assert_eq!(tree(one.path(), s).root_hash, tree(two.path(), s).root_hash);

        let f = RootDigestStrategy::FileList;
        assert_ne!(tree(one.path(), f).root_hash, tree(two.path(), f).root_hash);
    }

    #[test]
    fn single_byte_flip_changes_one_digest() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let before = tree(dir.path(), RootDigestStrategy::SortedDigests);

        fs::write(dir.path().join("2026-02/se4.json"), b"[5]").unwrap();
        let after = tree(dir.path(), RootDigestStrategy::SortedDigests);

        assert_ne!(before.root_hash, after.root_hash);
        let changed: Vec<_> = before
            .files
            .iter()
            .zip(&after.files)
            .filter(|(b, a)| b.sha256 != a.sha256)
            .map(|(b, _)| b.path.as_str())
            .collect();
        assert_eq!(changed, ["2026-02/se4.json"]);
    }

    #[test]
    fn membership_changes_root() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let base = tree(dir.path(), RootDigestStrategy::SortedDigests);

        fs::write(dir.path().join("extra.csv"), b"x").unwrap();
        let added = tree(dir.path(), RootDigestStrategy::SortedDigests);
        assert_ne!(base.root_hash, added.root_hash);

        fs::remove_file(dir.path().join("extra.csv")).unwrap();
        fs::remove_file(dir.path().join("README")).unwrap();
        let removed = tree(dir.path(), RootDigestStrategy::SortedDigests);
        assert_ne!(base.root_hash, removed.root_hash);

        // Root is reproducible from the sorted per-file digests alone
        let digests: Vec<_> = removed.files.iter().map(|f| f.sha256.clone()).collect();
        assert_eq!(removed.root_hash, digest::combine_sorted(&digests));
    }

    #[test]
    fn write_artifacts_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let out = tempfile::tempdir().unwrap();

        let result = tree(dir.path(), RootDigestStrategy::SortedDigests);
        let written = result.write_artifacts(out.path()).unwrap();
        assert_eq!(written.len(), 3);

        let root = fs::read_to_string(out.path().join(ROOT_HASH_FILE)).unwrap();
        assert_eq!(root, result.root_hash);
        assert_eq!(root.len(), 64);

        let list = fs::read_to_string(out.path().join(DIGEST_LIST_FILE)).unwrap();
        let paths: Vec<_> = list
            .lines()
            .map(|l| l.split_once("  ").unwrap().1)
            .collect();
        assert_eq!(paths, ["2026-02/se3.json", "2026-02/se4.json", "README"]);

        let loaded = TreeDigestResult::read_from(&out.path().join(TREE_JSON_FILE)).unwrap();
        assert_eq!(loaded, result);
    }

    #[test]
    fn json_field_names_are_stable() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let result = tree(dir.path(), RootDigestStrategy::FileList);
        let value = serde_json::to_value(&result).unwrap();
        for key in [
            "schema_version",
            "directory",
            "file_count",
            "files",
            "root_hash",
            "root_hash_strategy",
            "computed_at",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["root_hash_strategy"], "file-list");
        assert!(value["computed_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn rerun_into_scanned_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let (_, hash, progress) = opts();
        let scan = ScanOptions::default().with_reserved(TREE_ARTIFACTS);

        let first = hash_tree(
            dir.path(),
            &scan,
            &hash,
            RootDigestStrategy::SortedDigests,
            &progress,
        )
        .unwrap();
        first.write_artifacts(dir.path()).unwrap();

        let second = hash_tree(
            dir.path(),
            &scan,
            &hash,
            RootDigestStrategy::SortedDigests,
            &progress,
        )
        .unwrap();
        assert_eq!(first.root_hash, second.root_hash);
        assert_eq!(second.file_count, 3);
    }

    #[test]
    fn artifacts_within_nested_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta/tree")).unwrap();

        assert_eq!(artifacts_within(dir.path(), dir.path()), TREE_ARTIFACTS);
        assert_eq!(
            artifacts_within(dir.path(), &dir.path().join("meta/tree")),
            [
                "meta/tree/files.sha256",
                "meta/tree/root_hash.txt",
                "meta/tree/hash_tree.json"
            ]
        );

        let elsewhere = tempfile::tempdir().unwrap();
        assert!(artifacts_within(dir.path(), elsewhere.path()).is_empty());
        assert!(artifacts_within(dir.path(), &dir.path().join("not-yet")).is_empty());
    }

    #[test]
    fn rerun_into_subdir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path());
        let out = dir.path().join("provenance");
        let (_, hash, progress) = opts();

        let run = |reserved: Vec<String>| {
            let scan = ScanOptions::default().with_reserved(reserved);
            hash_tree(
                dir.path(),
                &scan,
                &hash,
                RootDigestStrategy::FileList,
                &progress,
            )
            .unwrap()
        };

        let first = run(artifacts_within(dir.path(), &out));
        first.write_artifacts(&out).unwrap();
        let second = run(artifacts_within(dir.path(), &out));
        assert_eq!(first.root_hash, second.root_hash);
        assert_eq!(second.file_count, 3);
    }

    #[cfg(unix)]
    #[test]
    fn forged_listing_name_is_rejected() {
        // One file whose name smuggles a second listing line
        let dir = tempfile::tempdir().unwrap();
        let forged = format!("p\n{}  2  q", digest::hash_bytes(b"YY"));
        fs::write(dir.path().join(forged), b"X").unwrap();

        let (scan, hash, progress) = opts();
        let err = hash_tree(
            dir.path(),
            &scan,
            &hash,
            RootDigestStrategy::FileList,
            &progress,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn empty_tree_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".only_hidden"), b"h").unwrap();
        let (scan, hash, progress) = opts();
        let err = hash_tree(
            dir.path(),
            &scan,
            &hash,
            RootDigestStrategy::SortedDigests,
            &progress,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::EmptyResult);
    }
}
