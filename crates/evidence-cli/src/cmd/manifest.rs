//! `evidence manifest` - write the ingest manifest for a finished run

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use evidence_core::ProgressContext;
use evidence_store::{HiddenFiles, IngestParameters, ManifestBuilder, ManifestRequest};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Source name (see `evidence sources`)
    #[arg(long)]
    pub source: String,

    /// Raw data directory
    #[arg(long)]
    pub raw: PathBuf,

    /// Canonical data directory
    #[arg(long)]
    pub canonical: PathBuf,

    /// Derived data directory
    #[arg(long)]
    pub derived: Option<PathBuf>,

    /// Ingest script path
    #[arg(long)]
    pub script: String,

    /// Ingest script version (vX.Y.Z)
    #[arg(long)]
    pub script_version: String,

    /// ISO 3166-1 alpha-2 country code
    #[arg(long)]
    pub country: Option<String>,

    /// ENTSO-E bidding zone
    #[arg(long)]
    pub zone: Option<String>,

    /// Period start date (YYYY-MM-DD)
    #[arg(long)]
    pub period_start: Option<String>,

    /// Period end date (YYYY-MM-DD)
    #[arg(long)]
    pub period_end: Option<String>,

    /// Output directory for the manifest (default: [manifest] output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dot-files: exclude (curated trees) or include (generated trees)
    #[arg(long, default_value = "exclude")]
    pub hidden: HiddenFiles,
}

impl ManifestArgs {
    fn request(&self) -> ManifestRequest {
        ManifestRequest {
            source: self.source.clone(),
            raw: self.raw.clone(),
            canonical: self.canonical.clone(),
            derived: self.derived.clone(),
            script: self.script.clone(),
            script_version: self.script_version.clone(),
            parameters: IngestParameters {
                country: self.country.clone(),
                bidding_zone: self.zone.clone(),
                period_start: self.period_start.clone(),
                period_end: self.period_end.clone(),
            },
        }
    }
}

pub fn run(
    args: ManifestArgs,
    config: &Config,
    workers: Option<usize>,
    progress: &ProgressContext,
) -> Result<()> {
    let builder = ManifestBuilder::new(config.catalog())
        .with_hidden_files(args.hidden)
        .with_hash_options(config.hash_options(workers))
        .with_id_prefix(config.manifest.id_prefix.clone());

    let manifest = builder
        .build(&args.request(), progress)
        .with_context(|| format!("failed to build manifest for '{}'", args.source))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.manifest.output_dir.clone());
    let path = manifest
        .write_to(&output)
        .with_context(|| format!("failed to write manifest to {}", output.display()))?;

    println!("[manifest] Manifest: {}", manifest.manifest_id);
    println!("[manifest] Files: {}", manifest.files.len());
    println!("[manifest] Records: {}", manifest.record_count);
    println!("[manifest] Root hash: {}", manifest.root_hash);
    println!("[manifest] Written: {}", path.display());
    Ok(())
}
