//! `evidence hash-tree` - digest one directory tree

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use evidence_core::ProgressContext;
use evidence_store::tree;
use evidence_store::{HiddenFiles, RootDigestStrategy, ScanOptions};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct HashTreeArgs {
    /// Directory to hash
    pub dir: PathBuf,

    /// Where to write files.sha256, root_hash.txt and hash_tree.json
    /// (default: the hashed directory itself)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Root digest rule: sorted-digests (content only) or file-list
    /// (content + paths)
    #[arg(long, default_value = "sorted-digests")]
    pub strategy: RootDigestStrategy,

    /// Dot-files: exclude (curated trees) or include (generated trees)
    #[arg(long, default_value = "exclude")]
    pub hidden: HiddenFiles,
}

pub fn run(
    args: HashTreeArgs,
    config: &Config,
    workers: Option<usize>,
    progress: &ProgressContext,
) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| args.dir.clone());

    // Output inside the scanned tree: keep our own artifacts out of the digest
    let scan = ScanOptions::new(args.hidden)
        .with_reserved(tree::artifacts_within(&args.dir, &output));

    let hash = config.hash_options(workers);
    let result = evidence_store::hash_tree(&args.dir, &scan, &hash, args.strategy, progress)
        .with_context(|| format!("failed to hash {}", args.dir.display()))?;

    let written = result
        .write_artifacts(&output)
        .with_context(|| format!("failed to write artifacts to {}", output.display()))?;

    println!("[hash-tree] {} files hashed", result.file_count);
    println!(
        "[hash-tree] root_hash ({}): {}",
        result.root_hash_strategy, result.root_hash
    );
    let names: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
    println!("[hash-tree] Output: {}", names.join(", "));
    Ok(())
}
