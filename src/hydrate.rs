//! Repost hydration: turn repost events that target posts in the dataset into
//! post-like rows attributed to the reposting account.

use crate::dataset::Dataset;
use crate::date::parse_timestamp;
use crate::link::author_from_uri;
use crate::post::{Post, PostType};
use crate::record::RepostEvent;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HydrationStats {
    pub events: u64,
    pub matched: u64,
    pub out_of_scope: u64,      // target not in the base set
    pub bad_timestamp: u64,
    pub replaced_duplicates: u64,
}

/// Build the repost row for `event` from its target row.
/// The target row itself is left untouched.
pub fn repost_row(target: &Post, event: &RepostEvent) -> Option<Post> {
    let created = match parse_timestamp(&event.created_at) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!(repost=%event.repost_uri, error=%e, "repost with unparsable timestamp");
            return None;
        }
    };
    let mut row = target.clone();
    row.creation_date = created;
    row.user_id = author_from_uri(&event.repost_uri);
    row.post_id = event.repost_uri.clone();
    row.post_type = PostType::Repost;
    row.linked_post = Some(target.post_id.clone());
    row.linked_post_user_id = target.user_id.clone();
    Some(row)
}

/// Append one derived row per repost whose `original_uri` is in `base`, then
/// deduplicate by `post_id` keeping the last row.
///
/// Reposts of posts outside the base set are dropped: only rebroadcasts of
/// in-scope content are part of the dataset.
pub fn hydrate_reposts(mut base: Dataset, events: &[RepostEvent]) -> (Dataset, HydrationStats) {
    let mut stats = HydrationStats { events: events.len() as u64, ..Default::default() };

    let derived: Vec<Post> = {
        let index = base.index_by_post_id();
        events
            .iter()
            .filter_map(|ev| {
                let pos = ev.original_uri.as_deref().and_then(|uri| index.get(uri).copied());
                let Some(pos) = pos else {
                    stats.out_of_scope += 1;
                    return None;
                };
                let target = base.get(pos)?;
                match repost_row(target, ev) {
                    Some(row) => {
                        stats.matched += 1;
                        Some(row)
                    }
                    None => {
                        stats.bad_timestamp += 1;
                        None
                    }
                }
            })
            .collect()
    };

    base.extend(derived);
    stats.replaced_duplicates = base.dedup_keep_last() as u64;
    tracing::info!(
        events = stats.events,
        matched = stats.matched,
        out_of_scope = stats.out_of_scope,
        "hydrated reposts"
    );
    (base, stats)
}
