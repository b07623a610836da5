//! Raw record filter: a cheap regex check on the raw line decides whether a
//! record is worth deserializing at all; repost events bypass the keyword check.

use crate::config::Platform;
use crate::record::{BlueskyPost, MastodonStatus, RawRecord, RepostEvent, BSKY_POST, BSKY_REPOST};
use anyhow::Result;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::BTreeMap;

/// Case-insensitive "any of these terms" matcher over raw text.
#[derive(Clone, Debug)]
pub struct KeywordFilter {
    re: Option<Regex>, // None = empty keyword list, matches nothing
}

impl KeywordFilter {
    /// Terms are matched as literal text.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(keywords.into_iter().map(|k| regex::escape(k.as_ref().trim())))
    }

    /// Terms are regex alternatives (e.g. `\bai\b`), still case-insensitive.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(patterns.into_iter().map(|p| p.as_ref().trim().to_string()))
    }

    fn build(alts: impl Iterator<Item = String>) -> Result<Self> {
        let alts: Vec<String> = alts.filter(|a| !a.is_empty()).map(|a| format!("(?:{a})")).collect();
        if alts.is_empty() {
            return Ok(Self { re: None });
        }
        let re = RegexBuilder::new(&alts.join("|")).case_insensitive(true).build()?;
        Ok(Self { re: Some(re) })
    }

    #[inline]
    pub fn is_match(&self, hay: &str) -> bool {
        self.re.as_ref().map_or(false, |re| re.is_match(hay))
    }
}

/// Counters for one scan. Summed across files with `merge`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files: u64,
    pub files_failed: u64,
    pub lines: u64,
    pub parsed: u64,
    pub malformed: u64,
    pub statuses: u64,
    pub posts: u64,
    pub reposts: u64,
    pub skipped_actions: BTreeMap<String, u64>, // Bluesky non-create actions, among parsed lines
    pub event_types: BTreeMap<String, u64>,     // Mastodon archive `event_type` frequencies
}

impl ScanStats {
    pub fn merge(&mut self, other: ScanStats) {
        self.files += other.files;
        self.files_failed += other.files_failed;
        self.lines += other.lines;
        self.parsed += other.parsed;
        self.malformed += other.malformed;
        self.statuses += other.statuses;
        self.posts += other.posts;
        self.reposts += other.reposts;
        for (k, v) in other.skipped_actions {
            *self.skipped_actions.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.event_types {
            *self.event_types.entry(k).or_insert(0) += v;
        }
    }
}

/// Per-platform line classifier.
#[derive(Clone, Debug)]
pub struct RecordFilter {
    platform: Platform,
    keywords: KeywordFilter,
}

impl RecordFilter {
    pub fn new(platform: Platform, keywords: KeywordFilter) -> Self {
        Self { platform, keywords }
    }

    /// Classify one raw line, updating `stats`. Malformed JSON on a line that
    /// passed the pre-check is logged and skipped, never fatal.
    pub fn scan_line(&self, line: &str, stats: &mut ScanStats) -> Option<RawRecord> {
        stats.lines += 1;
        let keyword_hit = self.keywords.is_match(line);
        let structural = self.platform == Platform::Bluesky && line.contains(BSKY_REPOST);
        if !keyword_hit && !structural {
            return None;
        }

        let v: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                stats.malformed += 1;
                tracing::debug!(error=%e, "skipping malformed JSON line");
                return None;
            }
        };
        stats.parsed += 1;

        match self.platform {
            Platform::Mastodon => self.classify_mastodon(v, stats),
            Platform::Bluesky => self.classify_bluesky(v, keyword_hit, stats),
        }
    }

    fn classify_mastodon(&self, v: Value, stats: &mut ScanStats) -> Option<RawRecord> {
        if let Some(et) = v.get("event_type").and_then(Value::as_str) {
            *stats.event_types.entry(et.to_string()).or_insert(0) += 1;
        }
        match serde_json::from_value::<MastodonStatus>(v) {
            Ok(status) => {
                stats.statuses += 1;
                Some(RawRecord::Status(status))
            }
            Err(e) => {
                stats.malformed += 1;
                tracing::debug!(error=%e, "skipping status missing required fields");
                None
            }
        }
    }

    fn classify_bluesky(&self, v: Value, keyword_hit: bool, stats: &mut ScanStats) -> Option<RawRecord> {
        let action = v.get("action").and_then(Value::as_str).unwrap_or("");
        if action != "create" {
            *stats.skipped_actions.entry(action.to_string()).or_insert(0) += 1;
            return None;
        }
        let kind = v.get("type").and_then(Value::as_str).map(str::to_string);
        match kind.as_deref() {
            Some(BSKY_REPOST) => {
                let ev = RepostEvent::from_event(&v)?;
                stats.reposts += 1;
                Some(RawRecord::Repost(ev))
            }
            Some(BSKY_POST) if keyword_hit => match serde_json::from_value::<BlueskyPost>(v) {
                Ok(post) => {
                    stats.posts += 1;
                    Some(RawRecord::Post(post))
                }
                Err(e) => {
                    stats.malformed += 1;
                    tracing::debug!(error=%e, "skipping post missing required fields");
                    None
                }
            },
            _ => None,
        }
    }
}
