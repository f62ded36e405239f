//! A browser-side hint of which posts the user has voted on.
//!
//! This is **not authoritative**. It exists so the front end can grey out
//! posts without a round trip; it is rewritten from the store on every
//! navigation and never consulted when deciding whether a vote may be cast.

use std::collections::BTreeSet;

use rocket::http::{Cookie, CookieJar, SameSite};

use super::id::ApiId;

pub const VOTED_POSTS_COOKIE: &str = "voted_posts";

/// Post IDs this browser believes the user has voted on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VotedPostsHint(BTreeSet<ApiId>);

impl VotedPostsHint {
    /// Read the hint from the request cookies, skipping anything unparseable.
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Self {
        let posts = cookies
            .get(VOTED_POSTS_COOKIE)
            .map(|cookie| {
                cookie
                    .value()
                    .split(',')
                    .filter_map(|id| id.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        Self(posts)
    }

    /// Build a hint from a fresh read of the store.
    pub fn from_posts(posts: impl IntoIterator<Item = ApiId>) -> Self {
        Self(posts.into_iter().collect())
    }

    /// Note that the user has voted on the given post.
    pub fn record(&mut self, post: ApiId) {
        self.0.insert(post);
    }

    /// Write the hint back to the client.
    pub fn store(&self, cookies: &CookieJar<'_>) {
        let value = self
            .0
            .iter()
            .map(ApiId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let cookie = Cookie::build(VOTED_POSTS_COOKIE, value)
            .path("/")
            .same_site(SameSite::Lax)
            .finish();
        cookies.add(cookie);
    }
}
