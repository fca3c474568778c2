//! evidence-store: Tamper-evident provenance for ingested data trees
//!
//! Enumerates a directory deterministically, digests every file with
//! SHA-256, folds the digests into a root digest under an explicit
//! [`RootDigestStrategy`], and assembles write-once ingest manifests.

pub mod artifact;
pub mod digest;
pub mod enumerate;
pub mod error;
pub mod manifest;
pub mod records;
pub mod source;
pub mod stage;
pub mod tree;
pub mod verify;

pub use digest::{HashOptions, RootDigestStrategy, combine_sorted, hash_bytes, hash_file};
pub use enumerate::{HiddenFiles, ScanOptions, enumerate};
pub use error::{ErrorKind, ProvenanceError, Result};
pub use manifest::{IngestManifest, IngestParameters, ManifestBuilder, ManifestRequest};
pub use records::count_records;
pub use source::{SourceCatalog, SourceMetadata};
pub use stage::{FileRecord, Stage};
pub use tree::{TreeDigestResult, hash_tree};
pub use verify::{FileStatus, VerifyReport, verify_manifest, verify_tree};
