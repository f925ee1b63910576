use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a file's content. This is the identity of an image across
/// projects: two projects referencing byte-identical files share a global id.
pub fn image_digest(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash many files in parallel. Output order follows input order.
pub fn digest_all(paths: &[PathBuf]) -> Vec<io::Result<String>> {
    paths.par_iter().map(|p| image_digest(p)).collect()
}
