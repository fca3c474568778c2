//! `evidence verify` - re-hash a tree or manifest and compare

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use evidence_core::ProgressContext;
use evidence_store::tree::TREE_JSON_FILE;
use evidence_store::verify::FileCheck;
use evidence_store::{FileStatus, IngestManifest, TreeDigestResult, VerifyReport};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(subcommand)]
    pub action: VerifyAction,
}

#[derive(Subcommand, Debug)]
pub enum VerifyAction {
    /// Verify a hash_tree.json (or a directory containing one)
    Tree {
        /// hash_tree.json, or the directory it was written to
        artifact: PathBuf,

        /// Tree to check instead of the recorded directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Verify an ingest manifest against its recorded stage directories
    Manifest {
        /// Manifest JSON file
        manifest: PathBuf,
    },
}

pub fn run(
    args: VerifyArgs,
    config: &Config,
    workers: Option<usize>,
    progress: &ProgressContext,
) -> Result<()> {
    let hash = config.hash_options(workers);

    let (label, report) = match args.action {
        VerifyAction::Tree { artifact, dir } => {
            let path = tree_json_path(&artifact);
            let result = TreeDigestResult::read_from(&path)?;
            let report = evidence_store::verify_tree(&result, dir.as_deref(), &hash, progress)
                .with_context(|| format!("failed to verify {}", path.display()))?;
            (path.display().to_string(), report)
        }
        VerifyAction::Manifest { manifest } => {
            let m = IngestManifest::read_from(&manifest)?;
            let report = evidence_store::verify_manifest(&m, &hash, progress)
                .with_context(|| format!("failed to verify {}", m.manifest_id))?;
            (m.manifest_id, report)
        }
    };

    print_report(&label, &report, progress);
    if !report.is_ok() {
        anyhow::bail!("{label}: integrity check failed");
    }
    Ok(())
}

fn tree_json_path(artifact: &Path) -> PathBuf {
    if artifact.is_dir() {
        artifact.join(TREE_JSON_FILE)
    } else {
        artifact.to_path_buf()
    }
}

fn short(hash: Option<&str>) -> &str {
    match hash {
        Some(h) => h.get(..12).unwrap_or(h),
        None => "-",
    }
}

fn status_cell(status: FileStatus) -> Cell {
    let color = match status {
        FileStatus::Ok => Color::Green,
        FileStatus::Modified => Color::Red,
        FileStatus::Missing => Color::Yellow,
        FileStatus::Unexpected => Color::Magenta,
    };
    Cell::new(status).fg(color)
}

fn display_path(check: &FileCheck) -> String {
    match check.stage {
        Some(stage) => format!("{stage}/{}", check.path),
        None => check.path.clone(),
    }
}

fn print_report(label: &str, report: &VerifyReport, progress: &ProgressContext) {
    let problems: Vec<_> = report.problems().collect();
    if !problems.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Path").fg(Color::Cyan),
                Cell::new("Status").fg(Color::Cyan),
                Cell::new("Expected").fg(Color::Cyan),
                Cell::new("Actual").fg(Color::Cyan),
            ]);
        for check in &problems {
            table.add_row(vec![
                Cell::new(display_path(check)),
                status_cell(check.status),
                Cell::new(short(check.expected.as_deref())),
                Cell::new(short(check.actual.as_deref())),
            ]);
        }
        progress.println(format!("\n{table}"));
    }

    let root = if report.root_matches() { "OK" } else { "FAIL" };
    progress.println(format!(
        "[{root}] {label}: root_hash ({}) expected {} actual {}",
        report.strategy,
        short(Some(report.expected_root.as_str())),
        short(Some(report.actual_root.as_str())),
    ));
    progress.println(format!(
        "{} ok, {} modified, {} missing, {} unexpected",
        report.count(FileStatus::Ok),
        report.count(FileStatus::Modified),
        report.count(FileStatus::Missing),
        report.count(FileStatus::Unexpected),
    ));
}
