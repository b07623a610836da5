//! The cross-platform output row.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Post,
    Reply,
    Repost,
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PostType::Post => "post",
            PostType::Reply => "reply",
            PostType::Repost => "repost",
        })
    }
}

/// One normalized post. Platform extras live in `data` under `data_*` keys
/// and are written as top-level columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(with = "time::serde::rfc3339")]
    pub creation_date: OffsetDateTime,
    pub text: String,
    pub hashtags: Vec<String>,
    pub mentioned_users: Vec<String>,
    pub urls: BTreeSet<String>,
    pub user_id: Option<String>,
    pub post_id: String,
    pub linked_post: Option<String>,
    pub linked_post_user_id: Option<String>,
    pub root_post: Option<String>,
    pub root_post_user_id: Option<String>,
    pub post_type: PostType,
    #[serde(flatten)]
    pub data: BTreeMap<String, Value>,
}

impl Post {
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }
}
