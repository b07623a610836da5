use crate::date::DateRange;
use crate::writer::OutputFormat;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which platform's dump is being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Archive of Mastodon statuses, `YYYY-MM/YYYY-MM-DD/*.json.gz`.
    Mastodon,
    /// Bluesky firehose snapshot, flat `*.json` files of create/delete events.
    Bluesky,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Mastodon => "mastodon",
            Platform::Bluesky => "bluesky",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mastodon" => Ok(Platform::Mastodon),
            "bluesky" | "bsky" => Ok(Platform::Bluesky),
            other => Err(format!("unknown platform {other:?} (expected mastodon or bluesky)")),
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub platform: Platform,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dataset_name: String,
    pub range: Option<DateRange>,  // None = no clipping, scan everything
    pub keywords: Vec<String>,     // matched case-insensitively
    pub keyword_patterns: bool,    // terms are regexes rather than literals
    pub output_format: OutputFormat,
    pub write_snapshot: bool,      // uncompressed raw snapshot next to the table
    pub drop_home_server_links: bool,
    pub parallelism: Option<usize>, // Some(N) to set rayon threads
    pub file_concurrency: usize,   // 1 = strictly sequential
    pub progress: bool,
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl PipelineOptions {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            data_dir: PathBuf::from("./data").join(platform.as_str()),
            output_dir: PathBuf::from("./Data"),
            dataset_name: format!("dataset_{platform}"),
            range: None,
            keywords: Vec::new(),
            keyword_patterns: false,
            output_format: OutputFormat::Zst,
            write_snapshot: true,
            drop_home_server_links: true,
            parallelism: None,
            file_concurrency: 1,
            progress: true,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }

    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }
    pub fn with_range(mut self, range: Option<DateRange>) -> Self {
        self.range = range;
        self
    }
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut v: Vec<String> = keywords
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        v.sort();
        v.dedup();
        self.keywords = v;
        self
    }
    pub fn with_keyword_patterns(mut self, yes: bool) -> Self {
        self.keyword_patterns = yes;
        self
    }
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
    pub fn with_snapshot(mut self, yes: bool) -> Self {
        self.write_snapshot = yes;
        self
    }
    pub fn with_drop_home_server_links(mut self, yes: bool) -> Self {
        self.drop_home_server_links = yes;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_file_concurrency(mut self, n: usize) -> Self {
        self.file_concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    // -------- Output locations --------

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.raw.jsonl", self.dataset_name))
    }
    pub fn reposts_snapshot_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_reposts.jsonl", self.dataset_name))
    }
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.dataset_name, self.output_format.extension()))
    }
    pub fn reblogs_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_reblogs.json", self.dataset_name))
    }
}
