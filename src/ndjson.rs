use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// NDJSON writer that builds into `<final>.tmp` and promotes the file only
/// when `finish` succeeds, so an interrupted run never leaves a truncated table.
pub struct NdjsonWriter<W: Write> {
    tmp_path: PathBuf,
    final_path: PathBuf,
    w: W,
    written: u64,
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    final_path.with_file_name(name)
}

impl NdjsonWriter<BufWriter<std::fs::File>> {
    pub fn create(final_path: &Path, buf_bytes: usize) -> Result<Self> {
        let tmp_path = tmp_path_for(final_path);
        let f = create_with_backoff(&tmp_path, 16, 50)
            .with_context(|| format!("create {}", tmp_path.display()))?;
        Ok(Self {
            tmp_path,
            final_path: final_path.to_path_buf(),
            w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f),
            written: 0,
        })
    }
}

impl<W: Write> NdjsonWriter<W> {
    /// Wrap the temp-file sink, e.g. in a compressor.
    pub fn map_sink<V: Write>(self, f: impl FnOnce(W) -> Result<V>) -> Result<NdjsonWriter<V>> {
        Ok(NdjsonWriter { tmp_path: self.tmp_path, final_path: self.final_path, w: f(self.w)?, written: self.written })
    }

    #[inline]
    pub fn write_record<T: Serialize>(&mut self, rec: &T) -> Result<()> {
        serde_json::to_writer(&mut self.w, rec)?;
        self.w.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush the sink through `close` (which returns the innermost writer to
    /// flush), then atomically move the temp file into place.
    pub fn finish_with<V: Write>(self, close: impl FnOnce(W) -> Result<V>) -> Result<u64> {
        let mut inner = close(self.w)?;
        inner.flush().with_context(|| format!("flush {}", self.tmp_path.display()))?;
        drop(inner);
        replace_file_atomic_backoff(&self.tmp_path, &self.final_path)?;
        Ok(self.written)
    }
}
