//! Ordered post table keyed by `post_id`.

use crate::date::DateRange;
use crate::post::{Post, PostType};
use ahash::AHashMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    posts: Vec<Post>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, idx: usize) -> Option<&Post> {
        self.posts.get(idx)
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Post>) {
        self.posts.extend(rows);
    }

    /// `post_id` → position. With duplicates the last position wins, matching
    /// what `dedup_keep_last` would keep.
    pub fn index_by_post_id(&self) -> AHashMap<&str, usize> {
        let mut idx = AHashMap::with_capacity(self.posts.len());
        for (i, p) in self.posts.iter().enumerate() {
            idx.insert(p.post_id.as_str(), i);
        }
        idx
    }

    /// Keep only the last row for each `post_id`, at that row's position.
    /// Returns the number of rows removed.
    pub fn dedup_keep_last(&mut self) -> usize {
        let before = self.posts.len();
        let mut kept: Vec<Post> = Vec::with_capacity(before);
        let mut winners: AHashMap<String, PostType> = AHashMap::with_capacity(before);

        for p in std::mem::take(&mut self.posts).into_iter().rev() {
            match winners.get(&p.post_id) {
                None => {
                    winners.insert(p.post_id.clone(), p.post_type);
                    kept.push(p);
                }
                Some(t) if *t == p.post_type => {}
                Some(_) => tracing::warn!(
                    post_id=%p.post_id,
                    dropped=%p.post_type,
                    "duplicate post_id replaced by a later row of a different type"
                ),
            }
        }
        kept.reverse();
        self.posts = kept;
        before - self.posts.len()
    }

    /// Keep rows with `start <= creation_date < end`. Returns rows removed.
    pub fn retain_window(&mut self, range: &DateRange) -> usize {
        let before = self.posts.len();
        self.posts.retain(|p| range.contains(p.creation_date));
        before - self.posts.len()
    }
}
