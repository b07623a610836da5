//! Concurrency helper: bound how many input files are scanned at once.

use crate::paths::FileJob;
use anyhow::Result;
use rayon::prelude::*;

/// Map `f` over `files` with at most `limit` in flight.
/// Results come back in `files` order regardless of `limit`.
pub fn map_files_limited<T, F>(files: &[FileJob], limit: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Sync + Fn(&FileJob) -> Result<T>,
{
    if limit <= 1 {
        return files.iter().map(&f).collect();
    }
    let mut out = Vec::with_capacity(files.len());
    for chunk in files.chunks(limit) {
        let parts = chunk.par_iter().map(|job| f(job)).collect::<Result<Vec<_>>>()?;
        out.extend(parts);
    }
    Ok(out)
}
