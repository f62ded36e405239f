//! The data access gateway.
//!
//! Everything the application reads or writes goes through [`Store`]. The
//! store, not this application, is what guarantees that a user can hold at
//! most one vote per post.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    api::auth::UserId,
    db::{
        candidate::{Candidate, CandidateVotes},
        election::Election,
        post::{Post, PostWithElection},
        vote::Vote,
    },
    mongodb::Id,
};

#[cfg(test)]
pub mod memory;
mod mongo;

pub use mongo::MongoStore;

/// Which elections to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionFilter {
    /// Only elections flagged as active.
    Active,
    All,
}

/// Operations on the backing store.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// The user's vote on the given post, if they have cast one.
    async fn find_vote(&self, user: &UserId, post: Id) -> Result<Option<Vote>>;

    /// Every vote cast by the user.
    async fn list_votes_by_user(&self, user: &UserId) -> Result<Vec<Vote>>;

    /// Elections matching the filter, earliest end time first.
    async fn list_elections(&self, filter: ElectionFilter) -> Result<Vec<Election>>;

    /// Posts belonging to the given election.
    async fn list_posts(&self, election: Id) -> Result<Vec<Post>>;

    /// Posts belonging to any of the given elections.
    async fn list_posts_in(&self, elections: &[Id]) -> Result<Vec<Post>>;

    /// Candidates standing for any of the given posts.
    async fn list_candidates(&self, posts: &[Id]) -> Result<Vec<Candidate>>;

    /// A post together with its election, or `None` if either is missing.
    async fn post_with_election(&self, post: Id) -> Result<Option<PostWithElection>>;

    /// Record a vote.
    ///
    /// Fails with [`UniqueConstraintViolation`](crate::error::Error::UniqueConstraintViolation)
    /// if the user already holds a vote on this post.
    async fn submit_vote(&self, post: Id, candidate: Id, user: &UserId) -> Result<Vote>;

    /// Every candidate for the post with their vote count.
    async fn results(&self, post: Id) -> Result<Vec<CandidateVotes>>;
}

/// A shareable handle on the configured [`Store`], kept in managed state.
#[derive(Clone)]
pub struct Gateway(Arc<dyn Store>);

impl Gateway {
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Gateway {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Gateway {
    type Error = ();

    /// Get the gateway from the managed state.
    ///
    /// Panics iff the [`Gateway`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let gateway = req.guard::<&State<Gateway>>().await.unwrap();
        request::Outcome::Success(gateway.inner().clone())
    }
}
