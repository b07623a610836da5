use netprep::{hydrate_reposts, repost_row, Dataset, DateRange, Post, PostType, RepostEvent};
use std::collections::{BTreeMap, BTreeSet};
use time::macros::datetime;

fn post(id: &str, user: &str) -> Post {
    Post {
        creation_date: datetime!(2024-06-25 12:00:00 UTC),
        text: format!("text of {id}"),
        hashtags: vec!["#debate".into()],
        mentioned_users: vec![],
        urls: BTreeSet::from(["https://ex.com/a".to_string()]),
        user_id: Some(user.to_string()),
        post_id: id.to_string(),
        linked_post: None,
        linked_post_user_id: None,
        root_post: None,
        root_post_user_id: None,
        post_type: PostType::Post,
        data: BTreeMap::new(),
    }
}

fn repost(uri: &str, target: Option<&str>, at: &str) -> RepostEvent {
    RepostEvent {
        repost_uri: uri.to_string(),
        repost_cid: None,
        original_uri: target.map(str::to_string),
        original_cid: None,
        created_at: at.to_string(),
    }
}

#[test]
fn repost_of_in_scope_post_becomes_a_row() {
    let base = Dataset::from_posts(vec![post("p1", "alice")]);
    let (ds, stats) = hydrate_reposts(base, &[repost("r1", Some("p1"), "2024-06-26T00:00:00Z")]);

    assert_eq!(ds.len(), 2);
    assert_eq!(stats.matched, 1);
    let r1 = ds.posts().iter().find(|p| p.post_id == "r1").unwrap();
    assert_eq!(r1.post_type, PostType::Repost);
    assert_eq!(r1.linked_post.as_deref(), Some("p1"));
    assert_eq!(r1.linked_post_user_id.as_deref(), Some("alice"));
    assert_eq!(r1.creation_date, datetime!(2024-06-26 00:00:00 UTC));
    // "r1" carries no decodable author
    assert_eq!(r1.user_id, None);
    assert_eq!(r1.text, "text of p1");

    // the original row is untouched
    let p1 = ds.posts().iter().find(|p| p.post_id == "p1").unwrap();
    assert_eq!(p1, &post("p1", "alice"));
}

#[test]
fn hydrated_size_is_base_plus_matched() {
    let base = Dataset::from_posts(vec![post("p1", "a"), post("p2", "b"), post("p3", "c")]);
    let events = vec![
        repost("at://did:plc:x/app.bsky.feed.repost/1", Some("p1"), "2024-06-26T00:00:00Z"),
        repost("at://did:plc:y/app.bsky.feed.repost/2", Some("p2"), "2024-06-26T01:00:00Z"),
        repost("at://did:plc:z/app.bsky.feed.repost/3", Some("elsewhere"), "2024-06-26T02:00:00Z"),
        repost("at://did:plc:z/app.bsky.feed.repost/4", None, "2024-06-26T02:00:00Z"),
        repost("at://did:plc:z/app.bsky.feed.repost/5", Some("p3"), "not a time"),
    ];
    let (ds, stats) = hydrate_reposts(base, &events);

    assert_eq!(stats.events, 5);
    assert_eq!(stats.matched, 2);
    assert_eq!(stats.out_of_scope, 2);
    assert_eq!(stats.bad_timestamp, 1);
    assert_eq!(ds.len(), 3 + stats.matched as usize);

    let r1 = ds.posts().iter().find(|p| p.post_id.ends_with("/1")).unwrap();
    assert_eq!(r1.user_id.as_deref(), Some("did:plc:x"));
}

#[test]
fn duplicate_repost_keeps_last_event() {
    let base = Dataset::from_posts(vec![post("p1", "a")]);
    let events = vec![
        repost("r1", Some("p1"), "2024-06-26T00:00:00Z"),
        repost("r1", Some("p1"), "2024-06-27T00:00:00Z"),
    ];
    let (ds, stats) = hydrate_reposts(base, &events);
    assert_eq!(stats.replaced_duplicates, 1);
    assert_eq!(ds.len(), 2);
    let r1 = ds.posts().iter().find(|p| p.post_id == "r1").unwrap();
    assert_eq!(r1.creation_date, datetime!(2024-06-27 00:00:00 UTC));
}

#[test]
fn dedup_keeps_last_row_at_its_position() {
    let mut first = post("p1", "a");
    first.text = "old".into();
    let mut ds = Dataset::from_posts(vec![first, post("p2", "b"), post("p1", "a")]);
    assert_eq!(ds.dedup_keep_last(), 1);
    let ids: Vec<&str> = ds.posts().iter().map(|p| p.post_id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
    assert_eq!(ds.posts()[1].text, "text of p1");
}

#[test]
fn retain_window_is_half_open() {
    let mut a = post("a", "u");
    a.creation_date = datetime!(2024-07-02 23:59:59 UTC);
    let mut b = post("b", "u");
    b.creation_date = datetime!(2024-07-03 00:00:00 UTC);
    let mut c = post("c", "u");
    c.creation_date = datetime!(2024-06-25 00:00:00 UTC);

    let mut ds = Dataset::from_posts(vec![a, b, c]);
    let removed = ds.retain_window(&DateRange::parse("2024-06-25", "2024-07-03").unwrap());
    assert_eq!(removed, 1);
    assert!(ds.posts().iter().all(|p| p.post_id != "b"));
}

#[test]
fn repost_row_rejects_bad_timestamp() {
    let target = post("p1", "a");
    assert!(repost_row(&target, &repost("r", Some("p1"), "garbage")).is_none());
    assert!(repost_row(&target, &repost("r", Some("p1"), "2024-06-26T00:00:00+01:00")).is_some());
}
