#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const KEYWORDS: &[&str] = &["debate"];

/// Write a gzip `.json.gz` file containing the provided JSONL lines,
/// the way the Mastodon archive stores each day.
pub fn write_gz_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = GzEncoder::new(f, Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Plain JSONL, like the Bluesky streamer snapshots.
pub fn write_plain_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Read a JSONL file (plain or `.zst`) into `serde_json::Value`s (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<Value> {
    let f = File::open(path).unwrap();
    let lines: Vec<String> = if path.extension().map_or(false, |e| e == "zst") {
        let dec = zstd::stream::read::Decoder::new(f).unwrap();
        BufReader::new(dec).lines().map(|l| l.unwrap()).collect()
    } else {
        BufReader::new(f).lines().map(|l| l.unwrap()).collect()
    };
    lines
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// Index rows by `post_id`.
pub fn by_post_id(rows: &[Value]) -> std::collections::BTreeMap<String, Value> {
    rows.iter()
        .map(|r| (r["post_id"].as_str().unwrap().to_string(), r.clone()))
        .collect()
}

pub fn fresh_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

// ---------------- Mastodon ----------------

pub fn account(server: &str, name: &str, id: u64) -> Value {
    json!({
        "id": id.to_string(),
        "username": name,
        "acct": name,
        "uri": format!("https://{server}/users/{name}"),
        "url": format!("https://{server}/@{name}"),
        "followers_count": 10,
        "following_count": 5,
        "bot": false,
        "fields": [{"name": "web", "value": "https://example.org"}]
    })
}

pub fn account_uri(server: &str, name: &str) -> String {
    format!("https://{server}/users/{name}")
}

pub fn status_uri(server: &str, name: &str, id: u64) -> String {
    format!("https://{server}/users/{name}/statuses/{id}")
}

/// A status as the streaming archive stores it. `id` is a JSON number on
/// purpose; some dumps carry numeric ids.
pub fn status(server: &str, name: &str, id: u64, created_at: &str, content: &str, reblogs: i64) -> Value {
    json!({
        "event_type": "update",
        "id": id,
        "uri": status_uri(server, name, id),
        "url": format!("https://{server}/@{name}/{id}"),
        "created_at": created_at,
        "content": content,
        "language": "en",
        "in_reply_to_id": null,
        "in_reply_to_account_id": null,
        "reblogs_count": reblogs,
        "visibility": "public",
        "account": account(server, name, id / 100)
    })
}

/// Mastodon archive under `base/mastodon/YYYY-MM/YYYY-MM-DD/*.json.gz`.
///
/// Window used by the tests is `[2024-06-25, 2024-07-03)`:
/// - 06-20: one matching status, outside the window folders (never scanned)
/// - 06-25: s109 by alice (hashtag + tracked link, 2 reblogs), s201 reply by bob,
///          one non-matching status, one broken line mentioning the keyword
/// - 06-26: s109 again with 5 reblogs (later duplicate wins)
/// - 07-02: s111 by carol at 23:59:59 (kept), s112 at 07-03T00:00:00Z (clipped)
/// - 07-03: s113 later that day (scanned, clipped)
pub fn make_mastodon_corpus() -> PathBuf {
    let base = fresh_dir();
    let root = base.join("mastodon");

    let s109 = |reblogs| {
        status(
            "m.social",
            "alice",
            109,
            "2024-06-25T10:00:00.000Z",
            "<p>The <a href=\"https://m.social/tags/debate\" class=\"mention hashtag\" rel=\"tag\">#<span>Debate</span></a> tonight \
             <a href=\"https://news.example/story?utm_source=masto#top\">link</a></p>",
            reblogs,
        )
    };
    let mut s201 = status(
        "t.social",
        "bob",
        201,
        "2024-06-26T01:00:00.000Z",
        "<p><span class=\"h-card\"><a href=\"https://m.social/@alice\" class=\"u-url mention\">@<span>alice</span></a></span> the debate was long<br>really &amp; truly</p>",
        0,
    );
    s201["in_reply_to_id"] = json!(109);
    s201["in_reply_to_account_id"] = json!("1");

    write_gz_lines(
        &root.join("2024-06").join("2024-06-20").join("part-0.json.gz"),
        &[status("m.social", "alice", 100, "2024-06-20T10:00:00Z", "<p>early debate</p>", 0).to_string()],
    );
    write_gz_lines(
        &root.join("2024-06").join("2024-06-25").join("part-0.json.gz"),
        &[
            s109(2).to_string(),
            s201.to_string(),
            status("m.social", "alice", 110, "2024-06-25T11:00:00Z", "<p>weather</p>", 0).to_string(),
            r#"{"id": 1, "content": "broken debate"#.to_string(),
        ],
    );
    write_gz_lines(
        &root.join("2024-06").join("2024-06-26").join("part-0.json.gz"),
        &[s109(5).to_string()],
    );
    write_gz_lines(
        &root.join("2024-07").join("2024-07-02").join("part-0.json.gz"),
        &[
            status("m.social", "carol", 111, "2024-07-02T23:59:59Z", "<p>late debate https://blog.example/p?id=3</p>", 1).to_string(),
            status("m.social", "carol", 112, "2024-07-03T00:00:00Z", "<p>midnight debate</p>", 0).to_string(),
        ],
    );
    write_gz_lines(
        &root.join("2024-07").join("2024-07-03").join("part-0.json.gz"),
        &[status("m.social", "carol", 113, "2024-07-03T05:00:00Z", "<p>after debate</p>", 0).to_string()],
    );
    base
}

// ---------------- Bluesky ----------------

pub fn at_post(did: &str, rkey: &str) -> String {
    format!("at://{did}/app.bsky.feed.post/{rkey}")
}

pub fn at_repost(did: &str, rkey: &str) -> String {
    format!("at://{did}/app.bsky.feed.repost/{rkey}")
}

pub fn bsky_post(did: &str, rkey: &str, created_at: &str, text: &str) -> Value {
    json!({
        "action": "create",
        "type": "app.bsky.feed.post",
        "uri": at_post(did, rkey),
        "cid": format!("cid-{rkey}"),
        "author": did,
        "createdAt": created_at,
        "text": text,
        "langs": ["en"]
    })
}

pub fn bsky_reply(did: &str, rkey: &str, created_at: &str, text: &str, parent: &str, root: &str) -> Value {
    let mut v = bsky_post(did, rkey, created_at, text);
    v["reply"] = json!({
        "parent": {"uri": parent, "cid": "cid-parent"},
        "root": {"uri": root, "cid": "cid-root"}
    });
    v
}

pub fn bsky_repost(did: &str, rkey: &str, created_at: &str, subject_uri: &str) -> Value {
    json!({
        "action": "create",
        "type": "app.bsky.feed.repost",
        "uri": at_repost(did, rkey),
        "cid": format!("cid-{rkey}"),
        "author": did,
        "createdAt": created_at,
        "subject": {"uri": subject_uri, "cid": "cid-subject"}
    })
}

/// Bluesky snapshot under `base/bluesky/` (one plain file, one gzip file):
/// - p1 by alice matches, p2 reply by bob to p1 matches, p3 does not match
/// - p4 matches but falls after the window
/// - one `delete` event mentioning the keyword
/// - reposts: r1 (dave → p1, in window), r2 (→ unknown post), r3 (erin → p1, after window),
///   plus one repost whose subject is not an object
pub fn make_bluesky_corpus() -> PathBuf {
    let base = fresh_dir();
    let root = base.join("bluesky");
    let p1 = at_post("did:plc:alice", "p1");

    write_plain_lines(
        &root.join("snapshot-0.json"),
        &[
            bsky_post(
                "did:plc:alice",
                "p1",
                "2024-06-25T12:00:00.000Z",
                "The Debate tonight #Debate2024 #debate2024 https://ex.com/a?ref=1",
            )
            .to_string(),
            bsky_reply("did:plc:bob", "p2", "2024-06-25T13:30:00+02:00", "debate reply @carol", &p1, &p1).to_string(),
            bsky_post("did:plc:carol", "p3", "2024-06-25T14:00:00Z", "cats and dogs").to_string(),
            json!({"action": "delete", "type": "app.bsky.feed.post", "uri": at_post("did:plc:x", "gone"), "text": "debate"})
                .to_string(),
        ],
    );
    write_gz_lines(
        &root.join("snapshot-1.json.gz"),
        &[
            bsky_post("did:plc:alice", "p4", "2024-07-04T09:00:00Z", "debate aftermath").to_string(),
            bsky_repost("did:plc:dave", "r1", "2024-06-26T00:00:00Z", &p1).to_string(),
            bsky_repost("did:plc:dave", "r2", "2024-06-26T00:00:00Z", &at_post("did:plc:zed", "unknown")).to_string(),
            bsky_repost("did:plc:erin", "r3", "2024-07-05T00:00:00Z", &p1).to_string(),
            json!({
                "action": "create",
                "type": "app.bsky.feed.repost",
                "uri": at_repost("did:plc:dave", "r4"),
                "createdAt": "2024-06-26T00:00:00Z",
                "subject": p1
            })
            .to_string(),
        ],
    );
    base
}
