use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- keyword list merging from env/file --------

/// Merge extra keywords from env/file into the provided vector (in-place).
/// - NETPREP_KEYWORDS: comma/semicolon separated terms
/// - NETPREP_KEYWORDS_FILE: path to newline-separated file of terms
/// All entries are trimmed, then the list is sort+dedup.
pub fn merge_keywords_from_env(target: &mut Vec<String>) {
    use std::io::{BufRead, BufReader};

    if let Ok(s) = std::env::var("NETPREP_KEYWORDS") {
        target.extend(s.split([',', ';']).map(str::to_string));
    }

    if let Ok(path) = std::env::var("NETPREP_KEYWORDS_FILE") {
        if !path.trim().is_empty() {
            match File::open(&path) {
                Ok(f) => target.extend(BufReader::new(f).lines().map_while(|l| l.ok())),
                Err(e) => tracing::warn!(%path, error=%e, "NETPREP_KEYWORDS_FILE is set but cannot be opened"),
            }
        }
    }

    for s in target.iter_mut() {
        *s = s.trim().to_string();
    }
    target.retain(|s| !s.is_empty());
    target.sort();
    target.dedup();
}

// -------- file ops with backoff (AV scanners, network shares) --------

/// Transient codes seen on Windows volumes: access denied, sharing/lock
/// violation, AV block, device not ready, volume altered, I/O device error.
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(5) | Some(21) | Some(32) | Some(33) | Some(225) | Some(1006) | Some(1117) | Some(1224)
    )
}

/// Run `op` up to `tries` times, sleeping a linearly growing delay between
/// retriable failures. Non-retriable errors return immediately.
fn retry_io<T>(tries: usize, delay_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let tries = tries.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) && attempt + 1 < tries => {
                attempt += 1;
                sleep(Duration::from_millis(delay_ms.saturating_mul(attempt as u64)));
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn open_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::open(path))
}

pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    retry_io(tries, delay_ms, || File::create(path))
}

/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    retry_io(tries, delay_ms, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .with_context(|| format!("remove {}", path.display()))
}

/// Atomically replace `dest` with `tmp`.
/// If rename fails (e.g., due to sharing), fall back to copy+remove.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let (tries, delay_ms) = (20usize, 50u64);
    if dest.exists() {
        remove_with_backoff(dest, tries, delay_ms)?;
    }
    if retry_io(tries, delay_ms, || fs::rename(tmp, dest)).is_ok() {
        return Ok(());
    }
    retry_io(tries, delay_ms, || fs::copy(tmp, dest))
        .with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    remove_with_backoff(tmp, tries, delay_ms)
}
