mod config;
mod date;
mod paths;
mod jsonl;
mod record;

mod filters;
mod progress;
mod concurrency;
mod util;
mod pipeline;

mod flatten;
mod content;
mod link;
mod post;
mod normalize;

mod dataset;
mod hydrate;
mod ndjson;
mod writer;
mod reblogs;

pub use crate::config::{PipelineOptions, Platform};
pub use crate::date::{iter_days, parse_day, parse_timestamp, time_until, DateRange};
pub use crate::pipeline::{Collected, Preprocessor, RunReport};

// Raw records and the ingestion filter.
pub use crate::record::{BlueskyPost, MastodonStatus, RawRecord, ReplyRefs, RepostEvent, StrongRef, BSKY_POST, BSKY_REPOST};
pub use crate::filters::{KeywordFilter, RecordFilter, ScanStats};
pub use crate::paths::{is_jsonl_name, mastodon_day_dir, plan_files, FileJob};
pub use crate::jsonl::{for_each_line_lenient, read_lines, Compression};

// Row transforms.
pub use crate::flatten::{cell_string, flatten_record, flatten_serializable, FlatRow};
pub use crate::content::{clear_url, decode_entities, extract_content, normalize_whitespace, BodyFormat, Content};
pub use crate::link::{author_from_uri, link_bluesky, link_mastodon, PostLinks};
pub use crate::normalize::{normalize_bluesky, normalize_record, normalize_status, server_of};
pub use crate::post::{Post, PostType};

// Table, hydration and output.
pub use crate::dataset::Dataset;
pub use crate::hydrate::{hydrate_reposts, repost_row, HydrationStats};
pub use crate::writer::{clip_and_write, load_posts, write_rows, OutputFormat};
pub use crate::ndjson::NdjsonWriter;

// Mastodon reblog enrichment.
pub use crate::reblogs::{
    next_link, reblog_targets, FetchOutcome, MastodonClient, ReblogCollector, ReblogReport, ReblogSource, ReblogTarget,
};

pub use crate::progress::{make_count_progress, make_progress_bar_labeled};
pub use crate::util::{create_with_backoff, init_tracing_once, merge_keywords_from_env, open_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
