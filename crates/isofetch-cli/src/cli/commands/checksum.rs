//! `isofetch checksum <path>` – print a digest, or verify against a sums file.

use anyhow::{bail, Context, Result};
use isofetch_core::checksum::{self, HashAlgorithm};
use std::path::Path;

pub async fn run_checksum(path: &Path, algorithm: HashAlgorithm, sums: Option<&Path>) -> Result<()> {
    let owned = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || checksum::digest_path(&owned, algorithm)).await??;

    let Some(sums) = sums else {
        println!("{}  {}", digest, path.display());
        return Ok(());
    };

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no file name in {}", path.display()))?;
    let text = tokio::fs::read_to_string(sums)
        .await
        .with_context(|| format!("read {}", sums.display()))?;
    let expected = checksum::find_checksum(&text, name)?;
    if !expected.eq_ignore_ascii_case(&digest) {
        bail!("checksum mismatch: expected {expected}, got {digest}");
    }
    println!("{}: OK ({})", path.display(), algorithm);
    Ok(())
}
