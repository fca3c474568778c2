//! SHA-256 content digests and root-digest combination

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::enumerate::EnumeratedFile;
use crate::error::{ProvenanceError, Result};
use crate::stage::FileRecord;

/// Read buffer for streaming file digests.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// How per-file digests fold into one root digest.
///
/// The two strategies are not interchangeable: an artifact records which one
/// produced it, and verification must use the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootDigestStrategy {
    /// SHA-256 over the lexicographically sorted, concatenated hex digests.
    /// Depends on file contents only; renames do not change it.
    SortedDigests,
    /// SHA-256 over the `<digest>  <size>  <path>` listing in path order.
    /// Any rename, move, or size change alters it.
    FileList,
}

impl RootDigestStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SortedDigests => "sorted-digests",
            Self::FileList => "file-list",
        }
    }

    /// Digest-list artifact body: one line per file in path byte order.
    ///
    /// `sorted-digests` lines are `<hex>  <path>`; `file-list` lines are
    /// `<hex>  <size>  <path>`, and are exactly the bytes its root hashes.
    pub fn digest_list(self, records: &[FileRecord]) -> String {
        let mut sorted: Vec<&FileRecord> = records.iter().collect();
        sorted.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));

        let mut out = String::new();
        for r in sorted {
            let line = match self {
                Self::SortedDigests => digest_line(&r.sha256, &r.path),
                Self::FileList => file_list_line(&r.sha256, r.size_bytes, &r.path),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Root digest of `records` under this strategy.
    pub fn root_digest(self, records: &[FileRecord]) -> String {
        match self {
            Self::SortedDigests => {
                combine_sorted(&records.iter().map(|r| r.sha256.as_str()).collect::<Vec<_>>())
            }
            Self::FileList => hash_bytes(self.digest_list(records).as_bytes()),
        }
    }
}

impl fmt::Display for RootDigestStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootDigestStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sorted-digests" => Ok(Self::SortedDigests),
            "file-list" => Ok(Self::FileList),
            other => Err(format!(
                "unknown root digest strategy '{other}' (expected sorted-digests or file-list)"
            )),
        }
    }
}

/// Digest tuning shared by every hashing entry point.
#[derive(Debug, Clone, Copy)]
pub struct HashOptions {
    pub chunk_size: usize,
    /// Threads for the per-file map step. 1 = sequential.
    pub workers: usize,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 1,
        }
    }
}

/// SHA-256 of raw bytes, lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Stream a file through SHA-256 using a `chunk_size` buffer.
pub fn hash_file(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// An enumerated file together with its content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestedFile {
    pub file: EnumeratedFile,
    pub sha256: String,
}

/// Digest every file. Output order equals input order whatever the
/// worker count; the first unreadable file fails the whole batch.
pub fn digest_files(
    files: &[EnumeratedFile],
    opts: &HashOptions,
    pb: &ProgressBar,
) -> Result<Vec<DigestedFile>> {
    let digest_one = |file: &EnumeratedFile| -> Result<DigestedFile> {
        let sha256 = hash_file(&file.path, opts.chunk_size)
            .map_err(|e| ProvenanceError::io(&file.path, e))?;
        log::trace!("{sha256}  {}", file.relative);
        Ok(DigestedFile {
            file: file.clone(),
            sha256,
        })
    };

    if opts.workers <= 1 {
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            out.push(digest_one(file)?);
            pb.inc(1);
        }
        return Ok(out);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers)
        .build()
        .map_err(|e| ProvenanceError::io(Path::new("<thread pool>"), io::Error::other(e)))?;

    pool.install(|| {
        files
            .par_iter()
            .progress_with(pb.clone())
            .map(digest_one)
            .collect()
    })
}

/// Root digest over content only: sort the hex digests, concatenate, hash.
pub fn combine_sorted<S: AsRef<str>>(digests: &[S]) -> String {
    let mut sorted: Vec<&str> = digests.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for d in sorted {
        hasher.update(d.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// One digest-list line in the `file-list` flavour (no trailing newline).
pub fn file_list_line(sha256: &str, size_bytes: u64, path: &str) -> String {
    format!("{sha256}  {size_bytes}  {path}")
}

/// One digest-list line in the `sorted-digests` flavour (no trailing newline).
pub fn digest_line(sha256: &str, path: &str) -> String {
    format!("{sha256}  {path}")
}
