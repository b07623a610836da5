use crate::config::{PipelineOptions, Platform};
use crate::concurrency::map_files_limited;
use crate::dataset::Dataset;
use crate::date::DateRange;
use crate::filters::{KeywordFilter, RecordFilter, ScanStats};
use crate::hydrate::{hydrate_reposts, HydrationStats};
use crate::jsonl::for_each_line_lenient;
use crate::normalize::normalize_record;
use crate::paths::{plan_files, total_input_size};
use crate::progress::make_progress_bar_labeled;
use crate::reblogs::{MastodonClient, ReblogCollector, ReblogReport, ReblogSource};
use crate::record::{RawRecord, RepostEvent};
use crate::util::{create_with_backoff, init_tracing_once, replace_file_atomic_backoff};
use crate::writer::{clip_and_write, load_posts, write_rows, OutputFormat};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct Preprocessor {
    pub(crate) opts: PipelineOptions,
}

/// Filtered raw records of one scan, in planned file order.
#[derive(Debug, Default)]
pub struct Collected {
    pub records: Vec<RawRecord>,
    pub stats: ScanStats,
}

/// What one `run` did.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub scan: ScanStats,
    pub normalized: u64,
    pub rejected: u64,     // records that failed normalization
    pub duplicates: u64,   // rows dropped by post_id dedup, before and after hydration
    pub out_of_window: u64,
    pub hydration: Option<HydrationStats>,
    pub rows_written: u64,
    pub output: PathBuf,
}

impl Preprocessor {
    pub fn new(platform: Platform) -> Self {
        Self { opts: PipelineOptions::new(platform) }
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn dataset_name(mut self, name: impl Into<String>) -> Self { self.opts = self.opts.with_dataset_name(name); self }
    pub fn date_range(mut self, range: DateRange) -> Self { self.opts = self.opts.with_range(Some(range)); self }
    pub fn keywords<I, S>(mut self, keywords: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> { self.opts = self.opts.with_keywords(keywords); self }
    pub fn keyword_patterns(mut self, yes: bool) -> Self { self.opts = self.opts.with_keyword_patterns(yes); self }
    pub fn output_format(mut self, format: OutputFormat) -> Self { self.opts = self.opts.with_output_format(format); self }
    pub fn snapshot(mut self, yes: bool) -> Self { self.opts = self.opts.with_snapshot(yes); self }
    pub fn drop_home_server_links(mut self, yes: bool) -> Self { self.opts = self.opts.with_drop_home_server_links(yes); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn file_concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_file_concurrency(n); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    fn init_runtime(&self) {
        init_tracing_once();
        if let Some(n) = self.opts.parallelism {
            if n > 0 {
                rayon::ThreadPoolBuilder::new().num_threads(n).build_global().ok();
            }
        }
    }

    /// Scan the planned input files and keep the records that pass the
    /// keyword pre-check (plus Bluesky repost events).
    pub fn collect(&self) -> Result<Collected> {
        self.init_runtime();
        let opts = &self.opts;
        let files = plan_files(opts.platform, &opts.data_dir, opts.range.as_ref());
        if files.is_empty() {
            tracing::warn!(dir=%opts.data_dir.display(), "no input files found; check data_dir and date range");
        } else {
            tracing::info!(files = files.len(), platform = %opts.platform, "planned input files");
        }
        if opts.keywords.is_empty() {
            tracing::warn!("keyword list is empty; no posts will match");
        }

        let keywords = if opts.keyword_patterns {
            KeywordFilter::from_patterns(&opts.keywords)?
        } else {
            KeywordFilter::new(&opts.keywords)?
        };
        let filter = RecordFilter::new(opts.platform, keywords);
        let pb = opts
            .progress
            .then(|| make_progress_bar_labeled(total_input_size(&files), opts.progress_label.as_deref()));
        let read_buf = opts.read_buffer_bytes;

        let parts = map_files_limited(&files, opts.file_concurrency, |job| -> Result<(Vec<RawRecord>, ScanStats)> {
            let mut stats = ScanStats { files: 1, ..Default::default() };
            let mut records = Vec::new();
            let ok = for_each_line_lenient(
                &job.path,
                read_buf,
                |delta| {
                    if let Some(pb) = &pb {
                        pb.inc(delta);
                    }
                },
                |line| {
                    if let Some(rec) = filter.scan_line(line, &mut stats) {
                        records.push(rec);
                    }
                    Ok(())
                },
            );
            if !ok {
                stats.files_failed += 1;
                if let Some(day) = job.day {
                    tracing::warn!(%day, "archive day incomplete: input file skipped");
                }
            }
            Ok((records, stats))
        })?;

        if let Some(pb) = pb {
            pb.finish_with_message("scan complete");
        }

        let mut out = Collected::default();
        for (records, stats) in parts {
            out.records.extend(records);
            out.stats.merge(stats);
        }
        let s = &out.stats;
        tracing::info!(
            files = s.files,
            failed = s.files_failed,
            lines = s.lines,
            kept = out.records.len(),
            malformed = s.malformed,
            "scan finished"
        );
        Ok(out)
    }

    /// Full batch: scan, snapshot, normalize, dedup, clip, hydrate (Bluesky), write.
    pub fn run(&self) -> Result<RunReport> {
        let opts = &self.opts;
        let Collected { records, stats } = self.collect()?;
        fs::create_dir_all(&opts.output_dir)
            .with_context(|| format!("create {}", opts.output_dir.display()))?;

        let mut report = RunReport { scan: stats, output: opts.output_path(), ..Default::default() };

        let mut originals = Vec::with_capacity(records.len());
        let mut events: Vec<RepostEvent> = Vec::new();
        for rec in records {
            match rec {
                RawRecord::Repost(ev) => events.push(ev),
                other => originals.push(other),
            }
        }

        if opts.write_snapshot {
            write_rows(&originals, &opts.snapshot_path(), OutputFormat::Jsonl, opts.write_buffer_bytes)?;
            if opts.platform == Platform::Bluesky {
                write_rows(&events, &opts.reposts_snapshot_path(), OutputFormat::Jsonl, opts.write_buffer_bytes)?;
            }
        }

        let mut dataset = Dataset::new();
        for rec in &originals {
            match normalize_record(rec, opts.drop_home_server_links) {
                Ok(Some(post)) => dataset.extend(Some(post)),
                Ok(None) => {}
                Err(e) => {
                    report.rejected += 1;
                    tracing::debug!(error=%format!("{e:#}"), "record rejected during normalization");
                }
            }
        }
        report.normalized = dataset.len() as u64;
        if report.rejected > 0 {
            tracing::warn!(rejected = report.rejected, "some records could not be normalized");
        }

        report.duplicates += dataset.dedup_keep_last() as u64;
        if let Some(range) = &opts.range {
            report.out_of_window += dataset.retain_window(range) as u64;
        }

        if opts.platform == Platform::Bluesky {
            let (hydrated, h) = hydrate_reposts(dataset, &events);
            report.duplicates += h.replaced_duplicates;
            report.hydration = Some(h);
            dataset = hydrated;
        }

        // repost rows carry their own timestamps, so clip once more before writing
        let before = dataset.len() as u64;
        report.rows_written = clip_and_write(
            &mut dataset,
            opts.range.as_ref(),
            &report.output,
            opts.output_format,
            opts.write_buffer_bytes,
        )?;
        report.out_of_window += before - report.rows_written;

        tracing::info!(
            rows = report.rows_written,
            rejected = report.rejected,
            duplicates = report.duplicates,
            path=%report.output.display(),
            "preprocessing finished"
        );
        Ok(report)
    }

    /// Mastodon enrichment over the table written by `run`, against the live API.
    pub fn enrich_reblogs(&self, access_token: Option<String>) -> Result<ReblogReport> {
        let mut collector = ReblogCollector::new().progress(self.opts.progress);
        self.enrich_reblogs_with(&mut collector, |server| MastodonClient::new(server, access_token.clone()))
    }

    /// Enrichment with a caller-supplied source per server. Writes `{dataset}_reblogs.json`.
    pub fn enrich_reblogs_with<S, F>(&self, collector: &mut ReblogCollector, source_for: F) -> Result<ReblogReport>
    where
        S: ReblogSource,
        F: FnMut(&str) -> Result<S>,
    {
        init_tracing_once();
        let table = self.opts.output_path();
        let dataset = load_posts(&table).with_context(|| format!("load {}", table.display()))?;
        let report = collector.collect(&dataset, source_for)?;

        let out = self.opts.reblogs_path();
        write_json_atomic(&report, &out)?;
        tracing::info!(
            statuses = report.reblogs.len(),
            problematic = report.problematic.len(),
            path=%out.display(),
            "wrote reblogs"
        );
        Ok(report)
    }
}

fn write_json_atomic<T: serde::Serialize>(value: &T, out: &Path) -> Result<()> {
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let tmp = out.with_extension("json.tmp");
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    drop(w);
    replace_file_atomic_backoff(&tmp, out)
}
