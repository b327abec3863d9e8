//! CLI for isofetch.

mod commands;
mod control_socket;

use anyhow::Result;
use clap::{Parser, Subcommand};
use isofetch_core::checksum::HashAlgorithm;
use isofetch_core::config;
use isofetch_core::store::JobDb;
use std::path::PathBuf;

use commands::{
    run_add, run_cancel, run_checksum, run_dispatcher, run_remove, run_retry, run_status,
};

/// Top-level CLI for isofetch.
#[derive(Debug, Parser)]
#[command(name = "isofetch")]
#[command(about = "isofetch: queued disk-image downloads with checksum verification", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Add a download job.
    Add {
        /// Direct HTTP/HTTPS URL of the image.
        url: String,
        /// Publish under this name instead of the one derived from the URL.
        #[arg(long, value_name = "FILENAME")]
        name: Option<String>,
        /// URL of a checksum file (standard or BSD format) listing the image.
        #[arg(long, value_name = "URL", requires = "algorithm")]
        checksum_url: Option<String>,
        /// Digest algorithm of the checksum file: md5, sha1, sha256, sha512.
        #[arg(long, value_name = "ALGO", requires = "checksum_url")]
        algorithm: Option<HashAlgorithm>,
    },

    /// Process pending jobs until they finish (Ctrl-C stops and keeps the rest pending).
    Run {
        /// Number of concurrent downloads (defaults to `workers` in config.toml).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Show status of all jobs.
    Status {
        /// Print jobs as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running job (talks to the `isofetch run` process).
    Cancel {
        /// Job identifier.
        id: i64,
    },

    /// Put a failed job back into the pending queue.
    Retry {
        /// Job identifier.
        id: i64,
    },

    /// Remove a job (and optionally its files) by ID.
    Remove {
        /// Job identifier.
        id: i64,
        /// Also delete the published image and any partial file.
        #[arg(long)]
        delete_files: bool,
    },

    /// Compute a file's digest, or verify it against a checksum file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Digest algorithm: md5, sha1, sha256, sha512.
        #[arg(long, default_value = "sha256", value_name = "ALGO")]
        algorithm: HashAlgorithm,
        /// Checksum file to verify against (entry looked up by file name).
        #[arg(long, value_name = "SUMS_FILE")]
        sums: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        if let CliCommand::Checksum {
            path,
            algorithm,
            sums,
        } = &cli.command
        {
            return run_checksum(path, *algorithm, sums.as_deref()).await;
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = JobDb::open_default().await?;

        match cli.command {
            CliCommand::Add {
                url,
                name,
                checksum_url,
                algorithm,
            } => run_add(&db, url, name, checksum_url, algorithm).await?,
            CliCommand::Run { workers } => run_dispatcher(&db, &cfg, workers).await?,
            CliCommand::Status { json } => run_status(&db, json).await?,
            CliCommand::Cancel { id } => run_cancel(id).await?,
            CliCommand::Retry { id } => run_retry(&db, id).await?,
            CliCommand::Remove { id, delete_files } => {
                run_remove(&db, &cfg, id, delete_files).await?
            }
            CliCommand::Checksum { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
