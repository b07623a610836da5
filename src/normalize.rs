//! Per-platform projection of raw records into `Post` rows:
//! flatten → extract content → link.

use crate::content::{extract_content, BodyFormat};
use crate::date::parse_timestamp;
use crate::flatten::{cell_string, flatten_serializable, FlatRow};
use crate::link::{link_bluesky, link_mastodon};
use crate::post::Post;
use crate::record::{BlueskyPost, MastodonStatus, RawRecord};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Normalize one record. Repost events are not posts and yield `Ok(None)`.
pub fn normalize_record(rec: &RawRecord, drop_home_server_links: bool) -> Result<Option<Post>> {
    match rec {
        RawRecord::Status(s) => normalize_status(s, drop_home_server_links).map(Some),
        RawRecord::Post(p) => normalize_bluesky(p).map(Some),
        RawRecord::Repost(_) => Ok(None),
    }
}

/// Host the status was published on, taken from its canonical URI.
pub fn server_of(uri: &str) -> Option<String> {
    Url::parse(uri).ok()?.host_str().map(str::to_string)
}

pub fn normalize_status(status: &MastodonStatus, drop_home_server_links: bool) -> Result<Post> {
    let creation_date = parse_timestamp(&status.created_at)
        .with_context(|| format!("status {}", status.uri))?;
    let row: FlatRow = flatten_serializable(status, "account", "account_");

    let server = server_of(&status.uri);
    let home = if drop_home_server_links { server.as_deref() } else { None };
    let content = extract_content(&status.content, BodyFormat::Html, home);

    let user_id = cell_string(&row, "account_uri")
        .or_else(|| cell_string(&row, "account_url"))
        .ok_or_else(|| anyhow!("status {} has neither account uri nor url", status.uri))?;

    let links = link_mastodon(status);
    let post_type = links.post_type();

    let mut data = BTreeMap::new();
    data.insert("data_server".to_string(), server.map_or(Value::Null, Value::String));
    data.insert("data_langs".to_string(), opt_string(status.language.clone()));
    data.insert("data_internal_id".to_string(), Value::String(status.id.clone()));
    data.insert("data_internal_user_id".to_string(), opt_string(cell_string(&row, "account_id")));
    for (col, src) in [
        ("data_account_followers_count", "account_followers_count"),
        ("data_account_following_count", "account_following_count"),
        ("data_account_bot", "account_bot"),
    ] {
        data.insert(col.to_string(), row.get(src).cloned().unwrap_or(Value::Null));
    }
    data.insert("data_url".to_string(), opt_string(status.url.clone()));
    data.insert("data_reblogs_count".to_string(), status.reblogs_count.map_or(Value::Null, Value::from));

    Ok(Post {
        creation_date,
        text: content.text,
        hashtags: content.hashtags,
        mentioned_users: content.mentions,
        urls: content.urls,
        user_id: Some(user_id),
        post_id: status.uri.clone(),
        linked_post: links.linked_post,
        linked_post_user_id: links.linked_post_user_id,
        root_post: links.root_post,
        root_post_user_id: links.root_post_user_id,
        post_type,
        data,
    })
}

pub fn normalize_bluesky(post: &BlueskyPost) -> Result<Post> {
    let creation_date = parse_timestamp(&post.created_at)
        .with_context(|| format!("post {}", post.uri))?;
    let user_id = post
        .author_did()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("post {} has no author", post.uri))?;
    let row: FlatRow = flatten_serializable(post, "author", "author_");

    let content = extract_content(&post.text, BodyFormat::Plain, None);
    let links = link_bluesky(post.reply.as_ref());
    let post_type = links.post_type();

    let langs = post.langs.as_ref().filter(|l| !l.is_empty()).map(|l| l.join(";"));
    let mut data = BTreeMap::new();
    data.insert("data_langs".to_string(), opt_string(langs));
    data.insert("data_cid".to_string(), opt_string(post.cid.clone()));
    if let Some(handle) = cell_string(&row, "author_handle") {
        data.insert("data_author_handle".to_string(), Value::String(handle));
    }

    Ok(Post {
        creation_date,
        text: content.text,
        hashtags: content.hashtags,
        mentioned_users: content.mentions,
        urls: content.urls,
        user_id: Some(user_id),
        post_id: post.uri.clone(),
        linked_post: links.linked_post,
        linked_post_user_id: links.linked_post_user_id,
        root_post: links.root_post,
        root_post_user_id: links.root_post_user_id,
        post_type,
        data,
    })
}

fn opt_string(v: Option<String>) -> Value {
    v.map_or(Value::Null, Value::String)
}
