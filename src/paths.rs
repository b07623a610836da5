use crate::config::Platform;
use crate::date::DateRange;
use std::fs;
use std::path::{Path, PathBuf};
use time::Date;
use walkdir::WalkDir;

/// One input file to scan.
#[derive(Clone, Debug)]
pub struct FileJob {
    pub day: Option<Date>, // archive day folder, Mastodon only
    pub path: PathBuf,
}

/// `.json`, `.jsonl`, `.ndjson`, optionally followed by `.gz` or `.zst`.
pub fn is_jsonl_name(name: &str) -> bool {
    let base = name
        .strip_suffix(".gz")
        .or_else(|| name.strip_suffix(".zst"))
        .unwrap_or(name);
    base.ends_with(".json") || base.ends_with(".jsonl") || base.ends_with(".ndjson")
}

fn list_dir(dir: &Path, max_depth: usize) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut out: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map_or(false, is_jsonl_name))
        .map(|e| e.into_path())
        .collect();
    out.sort();
    out
}

/// Mastodon archives live under `YYYY-MM/YYYY-MM-DD/`.
pub fn mastodon_day_dir(base: &Path, day: Date) -> PathBuf {
    let d = format!("{:04}-{:02}-{:02}", day.year(), day.month() as u8, day.day());
    base.join(&d[..7]).join(&d)
}

/// Plan the files to scan, in a stable order.
///
/// Mastodon with a window: every day folder from start through end (inclusive).
/// Otherwise everything found under `data_dir` (Bluesky snapshots are flat).
/// Missing folders are skipped silently.
pub fn plan_files(platform: Platform, data_dir: &Path, range: Option<&DateRange>) -> Vec<FileJob> {
    match (platform, range) {
        (Platform::Mastodon, Some(r)) => r
            .days()
            .flat_map(|day| {
                list_dir(&mastodon_day_dir(data_dir, day), 1)
                    .into_iter()
                    .map(move |path| FileJob { day: Some(day), path })
            })
            .collect(),
        (Platform::Mastodon, None) => list_dir(data_dir, 3)
            .into_iter()
            .map(|path| FileJob { day: None, path })
            .collect(),
        (Platform::Bluesky, _) => list_dir(data_dir, 1)
            .into_iter()
            .map(|path| FileJob { day: None, path })
            .collect(),
    }
}

pub fn total_input_size(files: &[FileJob]) -> u64 {
    files
        .iter()
        .map(|j| fs::metadata(&j.path).map(|m| m.len()).unwrap_or(0))
        .sum()
}
