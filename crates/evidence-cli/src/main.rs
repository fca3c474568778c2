//! evidence - Provenance records for ingested data trees
//!
//! Hashes directory trees, writes write-once ingest manifests, and
//! re-verifies both against the files on disk.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "evidence")]
#[command(about = "Tamper-evident provenance for ingested data trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./evidence.toml or ~/.config/evidence/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Threads used to digest files
    #[arg(short, long, global = true)]
    workers: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Hash a directory tree (files.sha256, root_hash.txt, hash_tree.json)
    HashTree(cmd::hash_tree::HashTreeArgs),
    /// Generate the ingest manifest for a completed run
    Manifest(cmd::manifest::ManifestArgs),
    /// Re-hash a tree or manifest and report differences
    Verify(cmd::verify::VerifyArgs),
    /// List known data sources
    Sources,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = evidence_core::ProgressContext::new();

    // TTY: progress bars carry activity, logs stay at warn unless --debug
    // non-TTY: info, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    evidence_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::HashTree(args) => cmd::hash_tree::run(args, &config, cli.workers, &progress),
        Command::Manifest(args) => cmd::manifest::run(args, &config, cli.workers, &progress),
        Command::Verify(args) => cmd::verify::run(args, &config, cli.workers, &progress),
        Command::Sources => cmd::sources::run(&config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let hash = config.hash_options(cli.workers);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Chunk size", &format!("{} bytes", hash.chunk_size)]);
            table.add_row(vec!["Workers", &hash.workers.to_string()]);
            table.add_row(vec![
                "Manifest directory",
                &config.manifest.output_dir.display().to_string(),
            ]);
            table.add_row(vec!["Manifest ID prefix", &config.manifest.id_prefix]);
            table.add_row(vec!["Manifest root digest", "sorted-digests"]);
            table.add_row(vec![
                "Sources",
                &format!(
                    "{} ({} from config)",
                    config.catalog().len(),
                    config.sources.len()
                ),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
