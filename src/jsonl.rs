//! Line streaming over plain, gzip and zstd JSONL inputs with byte progress.

use crate::util::open_with_backoff;
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder as ZstdDecoder;

/// Compression of an input file, decided by its final extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        }
    }
}

/// A `Read` wrapper that counts raw (compressed) bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

fn open_decoded(path: &Path, counter: Arc<AtomicU64>) -> Result<Box<dyn Read>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let raw = CountingReader { inner: file, counter };
    Ok(match Compression::from_path(path) {
        Compression::None => Box::new(raw),
        Compression::Gzip => Box::new(MultiGzDecoder::new(raw)),
        Compression::Zstd => {
            let mut dec = ZstdDecoder::new(raw)?;
            dec.window_log_max(31)?;
            Box::new(dec)
        }
    })
}

/// Stream `path` line by line, reporting compressed-byte deltas to `on_progress`.
/// Trailing `\r?\n` is stripped; blank lines are skipped. Any error aborts.
pub fn read_lines_with_progress(
    path: &Path,
    read_buf_bytes: usize,
    on_progress: &mut impl FnMut(u64),
    on_line: &mut impl FnMut(&str) -> Result<()>,
) -> Result<()> {
    let counter = Arc::new(AtomicU64::new(0));
    let decoded = open_decoded(path, counter.clone())?;
    let mut reader = BufReader::with_capacity(read_buf_bytes.max(8 * 1024), decoded);

    let mut buf = String::with_capacity(16 * 1024);
    let mut last = 0u64;
    loop {
        buf.clear();
        let n = reader
            .read_line(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
        if n == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        on_line(line)?;
    }
    Ok(())
}

/// Strict variant without progress.
pub fn read_lines(path: &Path, read_buf_bytes: usize, mut on_line: impl FnMut(&str) -> Result<()>) -> Result<()> {
    read_lines_with_progress(path, read_buf_bytes, &mut |_| {}, &mut on_line)
}

/// Lenient variant used while scanning raw dumps: a decode or read failure logs
/// a warning, advances progress by the file's size, and reports `false` so the
/// batch can continue with the next file.
pub fn for_each_line_lenient(
    path: &Path,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(&str) -> Result<()>,
) -> bool {
    let mut consumed = 0u64;
    let mut track = |d: u64| {
        consumed += d;
        on_progress(d);
    };
    match read_lines_with_progress(path, read_buf_bytes, &mut track, &mut on_line) {
        Ok(()) => true,
        Err(e) => {
            let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            tracing::warn!(path=%abs.display(), error=%format!("{e:#}"), "skipping unreadable input file");
            if let Ok(meta) = fs::metadata(path) {
                on_progress(meta.len().saturating_sub(consumed));
            }
            false
        }
    }
}
