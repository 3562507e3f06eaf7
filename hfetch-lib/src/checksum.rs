//! Post-download integrity check.
//!
//! The download API publishes an MD5 per build archive.

use anyhow::{Context, Result, bail};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 4096;

/// Compute the MD5 of a file and return it as lowercase hex.
pub fn md5_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fails unless the MD5 of `path` equals `expected` (hex, any case).
/// A mismatching file is left in place.
pub fn verify_md5(path: &Path, expected: &str) -> Result<()> {
    let actual = md5_path(path)?;
    let expected = expected.trim().to_lowercase();
    if actual != expected {
        bail!(
            "Checksum does not match for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        );
    }
    tracing::debug!("Checksum of {} matches ({})", path.display(), actual);
    Ok(())
}
