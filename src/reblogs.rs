//! Mastodon reblog enrichment: who, among the dataset's accounts, reblogged
//! which status. Runs after the main table is written and never feeds back
//! into it.
//!
//! The API seam is [`ReblogSource`]; each call yields an explicit
//! [`FetchOutcome`] and [`ReblogCollector`] owns the retry policy:
//! rate limits sleep until the advertised reset (plus a safety margin) and
//! retry the same page, everything else marks the status as problematic and
//! moves on.

use crate::dataset::Dataset;
use crate::date::{parse_timestamp, time_until};
use crate::progress::make_count_progress;
use ahash::AHashSet;
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::LINK;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use time::OffsetDateTime;

/// Result of fetching one page of reblogging accounts.
#[derive(Debug)]
pub enum FetchOutcome {
    Page { accounts: Vec<Value>, next: Option<String> },
    RateLimited { reset_at: Option<OffsetDateTime> },
    NotFound,
    Failed(anyhow::Error),
}

pub trait ReblogSource {
    /// Fetch the first page for `status_id` (`page == None`) or follow the
    /// `next` cursor returned with a previous page.
    fn reblogged_by(&mut self, status_id: &str, page: Option<&str>) -> FetchOutcome;
}

/// Blocking client for one Mastodon server.
pub struct MastodonClient {
    base_url: String,
    token: Option<String>,
    http: HttpClient,
}

impl MastodonClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("netprep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), token, http })
    }
}

impl ReblogSource for MastodonClient {
    fn reblogged_by(&mut self, status_id: &str, page: Option<&str>) -> FetchOutcome {
        let url = match page {
            Some(next) => next.to_string(),
            None => format!("{}/api/v1/statuses/{}/reblogged_by?limit=80", self.base_url, status_id),
        };
        let mut req = self.http.get(&url);
        if let Some(t) = &self.token {
            req = req.bearer_auth(t);
        }
        let resp = match req.send() {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Failed(e.into()),
        };

        let header = |name: &str| resp.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let reset_at = header("x-ratelimit-reset").and_then(|s| parse_timestamp(&s).ok());
                return FetchOutcome::RateLimited { reset_at };
            }
            StatusCode::NOT_FOUND => return FetchOutcome::NotFound,
            s if !s.is_success() => return FetchOutcome::Failed(anyhow!("HTTP {s} for {url}")),
            _ => {}
        }

        let next = header(LINK.as_str()).and_then(|l| next_link(&l));
        match resp.json::<Vec<Value>>() {
            Ok(accounts) => FetchOutcome::Page { accounts, next },
            Err(e) => FetchOutcome::Failed(e.into()),
        }
    }
}

/// `rel="next"` target of an RFC 8288 `Link` header.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .filter_map(|p| p.trim().strip_prefix("rel="))
            .any(|v| v.trim_matches('"').split_whitespace().any(|r| r == "next"));
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

/// One status to ask about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReblogTarget {
    pub post_id: String,   // canonical status URI
    pub status_id: String, // server-local id, last URI segment
}

/// Statuses with a positive reblog count, grouped by the server that serves
/// their public URL. Servers come busiest first (by posts in the dataset).
pub fn reblog_targets(dataset: &Dataset) -> Vec<(String, Vec<ReblogTarget>)> {
    let mut per_server: HashMap<String, (usize, Vec<ReblogTarget>)> = HashMap::new();
    for p in dataset.posts() {
        let Some(base) = p.data_str("data_url").and_then(base_url_of) else { continue };
        let entry = per_server.entry(base).or_default();
        entry.0 += 1;
        if p.data_i64("data_reblogs_count").unwrap_or(0) <= 0 {
            continue;
        }
        if let Some(status_id) = p.post_id.rsplit('/').next().filter(|s| !s.is_empty()) {
            entry.1.push(ReblogTarget { post_id: p.post_id.clone(), status_id: status_id.to_string() });
        }
    }
    let mut out: Vec<(String, usize, Vec<ReblogTarget>)> =
        per_server.into_iter().map(|(k, (n, t))| (k, n, t)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.into_iter().filter(|(_, _, t)| !t.is_empty()).map(|(k, _, t)| (k, t)).collect()
}

/// `https://host/@user/123` → `https://host`.
fn base_url_of(url: &str) -> Option<String> {
    let mut parts = url.splitn(4, '/');
    let scheme = parts.next()?;
    let empty = parts.next()?;
    let host = parts.next().filter(|h| !h.is_empty())?;
    (empty.is_empty() && scheme.ends_with(':')).then(|| format!("{scheme}//{host}"))
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ReblogReport {
    /// status URI → reblogging accounts that also appear as authors in the dataset
    pub reblogs: BTreeMap<String, Vec<Value>>,
    /// `(server, status_id)` pairs that could not be fetched
    pub problematic: Vec<(String, String)>,
    pub rate_limit_waits: u64,
}

pub struct ReblogCollector {
    safety_margin: Duration,
    progress: bool,
    now: Box<dyn Fn() -> OffsetDateTime>,
    sleep: Box<dyn FnMut(Duration)>,
}

impl Default for ReblogCollector {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(5),
            progress: true,
            now: Box::new(OffsetDateTime::now_utc),
            sleep: Box::new(std::thread::sleep),
        }
    }
}

impl ReblogCollector {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn safety_margin(mut self, d: Duration) -> Self {
        self.safety_margin = d;
        self
    }
    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    /// Swap the wall clock and the sleeper (tests, dry runs).
    pub fn with_clock(
        mut self,
        now: impl Fn() -> OffsetDateTime + 'static,
        sleep: impl FnMut(Duration) + 'static,
    ) -> Self {
        self.now = Box::new(now);
        self.sleep = Box::new(sleep);
        self
    }

    /// Walk every target of `dataset`, opening one source per server via `source_for`.
    pub fn collect<S, F>(&mut self, dataset: &Dataset, mut source_for: F) -> Result<ReblogReport>
    where
        S: ReblogSource,
        F: FnMut(&str) -> Result<S>,
    {
        let known_users: AHashSet<String> = dataset.posts().iter().filter_map(|p| p.user_id.clone()).collect();
        let groups = reblog_targets(dataset);
        let total: usize = groups.iter().map(|(_, t)| t.len()).sum();
        tracing::info!(servers = groups.len(), statuses = total, "collecting reblogs");

        let mut report = ReblogReport::default();
        for (server, targets) in &groups {
            match source_for(server) {
                Ok(mut source) => self.collect_for_server(&mut source, server, targets, &known_users, &mut report),
                Err(e) => {
                    tracing::warn!(%server, error=%format!("{e:#}"), "cannot open client; marking statuses problematic");
                    report
                        .problematic
                        .extend(targets.iter().map(|t| (server.clone(), t.status_id.clone())));
                }
            }
        }
        Ok(report)
    }

    pub fn collect_for_server<S: ReblogSource>(
        &mut self,
        source: &mut S,
        server: &str,
        targets: &[ReblogTarget],
        known_users: &AHashSet<String>,
        report: &mut ReblogReport,
    ) {
        let pb = self.progress.then(|| make_count_progress(targets.len() as u64, server));
        for t in targets {
            self.collect_one(source, server, t, known_users, report);
            if let Some(pb) = &pb {
                pb.inc(1);
                pb.set_message(format!("{server}: {} reblogged", report.reblogs.len()));
            }
        }
        if let Some(pb) = pb {
            pb.finish_with_message(format!("{server} done"));
        }
    }

    fn collect_one<S: ReblogSource>(
        &mut self,
        source: &mut S,
        server: &str,
        target: &ReblogTarget,
        known_users: &AHashSet<String>,
        report: &mut ReblogReport,
    ) {
        let mut cursor: Option<String> = None;
        loop {
            match source.reblogged_by(&target.status_id, cursor.as_deref()) {
                FetchOutcome::Page { accounts, next } => {
                    let last_page = accounts.is_empty() || next.is_none();
                    let kept: Vec<Value> = accounts
                        .into_iter()
                        .filter(|a| a.get("uri").and_then(Value::as_str).map_or(false, |u| known_users.contains(u)))
                        .collect();
                    if !kept.is_empty() {
                        report.reblogs.entry(target.post_id.clone()).or_default().extend(kept);
                    }
                    if last_page {
                        return;
                    }
                    cursor = next;
                }
                FetchOutcome::RateLimited { reset_at } => {
                    let until_reset = reset_at.map_or(Duration::ZERO, |r| time_until(r, (self.now)()));
                    let wait = until_reset + self.safety_margin;
                    tracing::warn!(%server, wait_secs = wait.as_secs_f64(), "rate limit reached; waiting for reset");
                    report.rate_limit_waits += 1;
                    (self.sleep)(wait);
                }
                FetchOutcome::NotFound => {
                    tracing::debug!(%server, status = %target.status_id, "status not found");
                    report.problematic.push((server.to_string(), target.status_id.clone()));
                    return;
                }
                FetchOutcome::Failed(e) => {
                    tracing::warn!(%server, status = %target.status_id, error=%format!("{e:#}"), "reblog fetch failed");
                    report.problematic.push((server.to_string(), target.status_id.clone()));
                    return;
                }
            }
        }
    }
}
