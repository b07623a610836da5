//! Reply/thread linking and AT-URI author decoding.

use crate::post::PostType;
use crate::record::{MastodonStatus, ReplyRefs, StrongRef};

/// Parent and thread-root references of one post.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostLinks {
    pub linked_post: Option<String>,
    pub linked_post_user_id: Option<String>,
    pub root_post: Option<String>,
    pub root_post_user_id: Option<String>,
}

impl PostLinks {
    /// `Reply` when either reference is present. Reposts are only ever assigned
    /// by the hydrator.
    pub fn post_type(&self) -> PostType {
        if self.linked_post.is_some() || self.root_post.is_some() {
            PostType::Reply
        } else {
            PostType::Post
        }
    }
}

/// Author DID embedded in an AT-URI:
/// `at://did:plc:abc/app.bsky.feed.post/xyz` → `did:plc:abc`.
///
/// Returns `None` for anything without a non-empty third `/` segment.
pub fn author_from_uri(uri: &str) -> Option<String> {
    uri.split('/')
        .nth(2)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Mastodon has no thread-root reference, so the root mirrors the direct parent.
pub fn link_mastodon(status: &MastodonStatus) -> PostLinks {
    let linked_post = status.in_reply_to_id.clone();
    let linked_post_user_id = status.in_reply_to_account_id.clone();
    PostLinks {
        root_post: linked_post.clone(),
        root_post_user_id: linked_post_user_id.clone(),
        linked_post,
        linked_post_user_id,
    }
}

pub fn link_bluesky(reply: Option<&ReplyRefs>) -> PostLinks {
    let uri_of = |r: Option<&StrongRef>| r.and_then(|r| r.uri.clone()).filter(|u| !u.is_empty());
    let linked_post = uri_of(reply.and_then(|r| r.parent.as_ref()));
    let root_post = uri_of(reply.and_then(|r| r.root.as_ref()));
    PostLinks {
        linked_post_user_id: linked_post.as_deref().and_then(author_from_uri),
        root_post_user_id: root_post.as_deref().and_then(author_from_uri),
        linked_post,
        root_post,
    }
}
