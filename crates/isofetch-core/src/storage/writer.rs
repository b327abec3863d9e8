//! Sequential writer for temp download files and the publish rename.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const WRITE_BUF: usize = 256 * 1024;

/// Temp file receiving a streamed payload.
pub struct TempFile {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl TempFile {
    /// Create (or truncate) the temp file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create temp file: {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUF, file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered data and fsync, then close the file.
    pub fn finish(self) -> Result<u64> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flush {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("sync {}", self.path.display()))?;
        Ok(self.written)
    }
}

/// Atomically move a finished temp file to its public path. Fails if the two
/// paths are on different filesystems.
pub fn publish(temp_path: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            final_path.display()
        )
    })
}
