//! Raw platform records, validated at the ingestion boundary.
//!
//! Each variant types the fields the pipeline relies on and keeps every other
//! field verbatim in `rest` so the snapshot and the flattener see the whole record.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bluesky collection NSIDs.
pub const BSKY_POST: &str = "app.bsky.feed.post";
pub const BSKY_REPOST: &str = "app.bsky.feed.repost";

/// A filtered, parsed input record. Serializes as the bare inner record.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum RawRecord {
    Status(MastodonStatus),
    Post(BlueskyPost),
    Repost(RepostEvent),
}

/// Mastodon status as found in the streaming archive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MastodonStatus {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub in_reply_to_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub in_reply_to_account_id: Option<String>,
    #[serde(default)]
    pub reblogs_count: Option<i64>,
    pub account: Map<String, Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Strong reference (`uri` + `cid`) to another record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRefs {
    #[serde(default)]
    pub parent: Option<StrongRef>,
    #[serde(default)]
    pub root: Option<StrongRef>,
}

/// Bluesky `app.bsky.feed.post` create event from the firehose snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlueskyPost {
    pub uri: String,
    #[serde(default)]
    pub cid: Option<String>,
    pub author: Value, // DID string, or a profile object in enriched snapshots
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub langs: Option<Vec<String>>,
    #[serde(default)]
    pub reply: Option<ReplyRefs>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl BlueskyPost {
    /// Author DID whether the snapshot carries a bare string or a profile object.
    pub fn author_did(&self) -> Option<&str> {
        match &self.author {
            Value::String(s) => Some(s.as_str()),
            Value::Object(m) => m.get("did").and_then(Value::as_str),
            _ => None,
        }
        .filter(|s| !s.is_empty())
    }
}

/// A repost action pointing at the record it rebroadcasts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepostEvent {
    pub repost_uri: String,
    pub repost_cid: Option<String>,
    pub original_uri: Option<String>,
    pub original_cid: Option<String>,
    pub created_at: String,
}

impl RepostEvent {
    /// Build from a firehose repost create event. Returns `None` unless
    /// `subject` is an object; a repost without a target carries nothing to link.
    pub fn from_event(v: &Value) -> Option<Self> {
        let subject = v.get("subject")?.as_object()?;
        let s = |m: &Map<String, Value>, k: &str| m.get(k).and_then(Value::as_str).map(str::to_string);
        let obj = v.as_object()?;
        Some(Self {
            repost_uri: s(obj, "uri")?,
            repost_cid: s(obj, "cid"),
            original_uri: s(subject, "uri"),
            original_cid: s(subject, "cid"),
            created_at: s(obj, "createdAt")?,
        })
    }
}

// ids arrive as JSON numbers in some dumps and strings in others
fn value_to_id(v: Value) -> Result<Option<String>, String> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected string or number id, got {other}")),
    }
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    value_to_id(Value::deserialize(d)?)
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("missing id"))
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    value_to_id(Value::deserialize(d)?).map_err(de::Error::custom)
}

// client-written bodies are sometimes an explicit null
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
