// ABOUTME: Backup command: reads the backup files, runs convert or merge, writes the result
// ABOUTME: The output file is only created once the whole operation has succeeded

use crate::backup::{process_backup, BackupRequest, Direction, Mode};
use crate::session::Session;
use crate::utils::write_atomically;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Arguments of the backup command
#[derive(Debug, Clone)]
pub struct BackupArgs {
    pub mode: Mode,
    pub direction: Direction,
    pub newpipe: Option<PathBuf>,
    pub libretube: Option<PathBuf>,
    /// Overrides `backup.output_dir` from the config
    pub output_dir: Option<PathBuf>,
}

async fn read_backup(path: Option<&Path>, what: &str) -> Result<Option<Vec<u8>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    tracing::info!("Reading {} backup {}...", what, path.display());
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {} backup {}", what, path.display()))?;
    tracing::info!("✓ Read {} bytes", bytes.len());
    Ok(Some(bytes))
}

/// Convert or merge backups and write the output image
///
/// # Returns
///
/// Path of the written output file.
pub async fn backup(session: &Session, args: BackupArgs) -> Result<PathBuf> {
    let request = BackupRequest {
        mode: args.mode,
        direction: args.direction,
        newpipe: read_backup(args.newpipe.as_deref(), "NewPipe").await?,
        libretube: read_backup(args.libretube.as_deref(), "LibreTube").await?,
    };

    let output = process_backup(session, request)
        .await
        .context("Backup processing failed")?;

    tracing::info!("Summary: {}", output.stats);

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| session.config().backup.output_dir.clone());
    let path = write_atomically(&output_dir, &output.file_name, &output.bytes)?;

    tracing::info!("✅ {} backup written to {}", output.format, path.display());
    Ok(path)
}
