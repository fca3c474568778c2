//! Ingest manifest: the write-once provenance record of one ingest run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use evidence_core::ProgressContext;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactSet, WriteMode};
use crate::digest::{self, HashOptions, RootDigestStrategy};
use crate::enumerate::{self, EnumeratedFile, HiddenFiles, ScanOptions};
use crate::error::{ProvenanceError, Result};
use crate::records;
use crate::source::SourceCatalog;
use crate::stage::{FileRecord, Stage};

/// Bumped whenever the JSON layout or a digest rule changes.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Default `manifest_id` prefix.
pub const DEFAULT_ID_PREFIX: &str = "IM";

/// Manifests always combine stages by content only: stage membership
/// varies run to run and cross-stage order carries no meaning.
pub const MANIFEST_STRATEGY: RootDigestStrategy = RootDigestStrategy::SortedDigests;

/// Source identity as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub url: String,
    pub license: String,
    pub dataset_id: String,
}

/// Run parameters. Only the ones the caller supplied are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestParameters {
    /// ISO 3166-1 alpha-2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// ENTSO-E bidding zone, e.g. `SE3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidding_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestInfo {
    pub fetched_at: DateTime<Utc>,
    pub script: String,
    pub script_version: String,
    pub parameters: IngestParameters,
}

/// Provenance record for one ingest run. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestManifest {
    pub manifest_id: String,
    pub schema_version: u32,
    pub source: SourceInfo,
    pub ingest: IngestInfo,
    /// Absolute directory each stage's relative `files[].path` is under.
    pub stage_roots: BTreeMap<Stage, PathBuf>,
    pub hidden_files: HiddenFiles,
    pub files: Vec<FileRecord>,
    pub root_hash: String,
    pub root_hash_strategy: RootDigestStrategy,
    pub record_count: u64,
    pub created_at: DateTime<Utc>,
}

impl IngestManifest {
    /// File name this manifest is stored under.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.manifest_id)
    }

    /// Write to `<dir>/<manifest_id>.json`. Never overwrites.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            ProvenanceError::Serialize {
                what: "manifest",
                source,
            }
        })?;
        let mut set = ArtifactSet::new(dir, WriteMode::CreateNew)?;
        set.stage(&self.file_name(), json.as_bytes())?;
        let mut written = set.commit()?;
        Ok(written.remove(0))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| ProvenanceError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| ProvenanceError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn files_in(&self, stage: Stage) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(move |f| f.stage == Some(stage))
    }
}

/// Everything that identifies one ingest run.
#[derive(Debug, Clone)]
pub struct ManifestRequest {
    pub source: String,
    pub raw: PathBuf,
    pub canonical: PathBuf,
    pub derived: Option<PathBuf>,
    pub script: String,
    pub script_version: String,
    pub parameters: IngestParameters,
}

impl ManifestRequest {
    fn stage_dirs(&self) -> Vec<(Stage, &Path)> {
        let mut dirs = vec![
            (Stage::Raw, self.raw.as_path()),
            (Stage::Canonical, self.canonical.as_path()),
        ];
        if let Some(derived) = &self.derived {
            dirs.push((Stage::Derived, derived.as_path()));
        }
        dirs
    }
}

/// Random 8-hex-character suffix for `manifest_id`.
fn random_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// `<prefix>-<source>-<YYYYMMDD>-<8 hex>`
pub fn manifest_id(prefix: &str, source: &str, at: DateTime<Utc>) -> String {
    format!(
        "{prefix}-{source}-{}-{}",
        at.format("%Y%m%d"),
        random_suffix()
    )
}

/// Assembles [`IngestManifest`]s against a fixed source catalog.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    catalog: SourceCatalog,
    scan: ScanOptions,
    hash: HashOptions,
    id_prefix: String,
}

impl ManifestBuilder {
    pub fn new(catalog: SourceCatalog) -> Self {
        Self {
            catalog,
            scan: ScanOptions::default(),
            hash: HashOptions::default(),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }

    pub fn with_hidden_files(mut self, hidden: HiddenFiles) -> Self {
        self.scan.hidden = hidden;
        self
    }

    pub fn with_hash_options(mut self, hash: HashOptions) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Build a manifest stamped with the current time.
    pub fn build(&self, req: &ManifestRequest, progress: &ProgressContext) -> Result<IngestManifest> {
        self.build_at(req, progress, Utc::now())
    }

    /// Build a manifest stamped `now`.
    ///
    /// Inputs are validated before any file is read. An empty combined
    /// file set fails with `EmptyIngest`.
    pub fn build_at(
        &self,
        req: &ManifestRequest,
        progress: &ProgressContext,
        now: DateTime<Utc>,
    ) -> Result<IngestManifest> {
        let meta = self.catalog.resolve(&req.source)?;
        if req.script.trim().is_empty() {
            return Err(ProvenanceError::MissingParameter("script"));
        }
        if req.script_version.trim().is_empty() {
            return Err(ProvenanceError::MissingParameter("script_version"));
        }

        let mut roots = BTreeMap::new();
        for (stage, dir) in req.stage_dirs() {
            roots.insert(stage, enumerate::resolve_dir(dir)?);
        }

        // Enumerate every stage before hashing anything
        let spinner = progress.stage_line("scan");
        let mut tagged: Vec<(Stage, EnumeratedFile)> = Vec::new();
        for (stage, root) in &roots {
            spinner.set_message(format!("{stage}: {}", root.display()));
            let files = enumerate::enumerate(root, &self.scan)?;
            log::info!("{stage}: {} files under {}", files.len(), root.display());
            tagged.extend(files.into_iter().map(|f| (*stage, f)));
        }
        spinner.finish_and_clear();

        if tagged.is_empty() {
            return Err(ProvenanceError::EmptyIngest(roots.into_values().collect()));
        }

        let files: Vec<EnumeratedFile> = tagged.iter().map(|(_, f)| f.clone()).collect();
        let pb = progress.files_bar("hash", files.len() as u64);
        let digested = digest::digest_files(&files, &self.hash, &pb)?;
        pb.finish_and_clear();

        let records: Vec<FileRecord> = tagged
            .iter()
            .zip(&digested)
            .map(|((stage, _), d)| FileRecord::from_digested(d, Some(*stage)))
            .collect();

        let root_hash = MANIFEST_STRATEGY.root_digest(&records);
        let record_count = tagged
            .iter()
            .filter(|(stage, f)| *stage == Stage::Canonical && records::is_record_file(&f.relative))
            .map(|(_, f)| records::count_records(&f.path))
            .sum();

        let date = now.format("%Y%m%d").to_string();
        let dataset_period = req.parameters.period_start.as_deref().unwrap_or(&date);

        Ok(IngestManifest {
            manifest_id: manifest_id(&self.id_prefix, &req.source, now),
            schema_version: MANIFEST_SCHEMA_VERSION,
            source: SourceInfo {
                name: req.source.clone(),
                url: meta.url.clone(),
                license: meta.license.clone(),
                dataset_id: format!("{}_{dataset_period}", req.source),
            },
            ingest: IngestInfo {
                fetched_at: now,
                script: req.script.clone(),
                script_version: req.script_version.clone(),
                parameters: req.parameters.clone(),
            },
            stage_roots: roots,
            hidden_files: self.scan.hidden,
            files: records,
            root_hash,
            root_hash_strategy: MANIFEST_STRATEGY,
            record_count,
            created_at: now,
        })
    }
}
