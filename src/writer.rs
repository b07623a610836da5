//! Date-window clipping and persistence of the post table and raw snapshots.

use crate::dataset::Dataset;
use crate::date::DateRange;
use crate::jsonl::read_lines;
use crate::ndjson::NdjsonWriter;
use crate::post::Post;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use zstd::stream::write::Encoder as ZstdEncoder;

/// Encoding of the final table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jsonl,
    Zst,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Zst => "jsonl.zst",
        }
    }
}

/// Write one JSON object per row. Output is all-or-nothing: rows go to a temp
/// file that replaces `out_path` only once fully written.
pub fn write_rows<T: Serialize>(rows: &[T], out_path: &Path, format: OutputFormat, write_buf: usize) -> Result<u64> {
    if let Some(dir) = out_path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let w = NdjsonWriter::create(out_path, write_buf)?;
    let n = match format {
        OutputFormat::Jsonl => {
            let mut w = w;
            for r in rows {
                w.write_record(r)?;
            }
            w.finish_with(Ok)?
        }
        OutputFormat::Zst => {
            let mut w = w.map_sink(|bw| Ok(ZstdEncoder::new(bw, 19)?))?;
            for r in rows {
                w.write_record(r)?;
            }
            w.finish_with(|enc| Ok(enc.finish()?))?
        }
    };
    tracing::info!(path=%out_path.display(), rows=n, "wrote table");
    Ok(n)
}

/// Clip `dataset` to `range` (when given) and persist it.
pub fn clip_and_write(
    dataset: &mut Dataset,
    range: Option<&DateRange>,
    out_path: &Path,
    format: OutputFormat,
    write_buf: usize,
) -> Result<u64> {
    if let Some(r) = range {
        let dropped = dataset.retain_window(r);
        if dropped > 0 {
            tracing::info!(dropped, window=%r, "clipped rows outside the date window");
        }
    }
    write_rows(dataset.posts(), out_path, format, write_buf)
}

/// Read a table written by `write_rows` (plain or `.zst`).
pub fn load_posts(path: &Path) -> Result<Dataset> {
    let mut posts = Vec::new();
    read_lines(path, 256 * 1024, |line| {
        let p: Post = serde_json::from_str(line)
            .with_context(|| format!("bad row in {}", path.display()))?;
        posts.push(p);
        Ok(())
    })?;
    Ok(Dataset::from_posts(posts))
}
