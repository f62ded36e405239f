//! An in-process [`Store`] for tests.
//!
//! It enforces the same one-vote-per-(user, post) constraint as the unique
//! index on the MongoDB collection, so the duplicate-vote flow can be driven
//! end to end without a database server.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::UserId,
    db::{
        candidate::{Candidate, CandidateVotes, NewCandidate},
        election::{Election, NewElection},
        post::{NewPost, Post, PostWithElection},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

use super::{ElectionFilter, Store};

#[derive(Default)]
struct Tables {
    elections: Vec<Election>,
    posts: Vec<Post>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    unavailable: bool,
}

/// A cheaply clonable handle on shared in-memory tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the tables, failing like an unreachable database if told to.
    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        let tables = self.tables.lock().unwrap();
        if tables.unavailable {
            return Err(Error::Transient("store unavailable".to_string()));
        }
        Ok(tables)
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.tables.lock().unwrap().unavailable = unavailable;
    }

    pub fn insert_election(&self, election: NewElection) -> Election {
        let election = Election {
            id: Id::new(),
            election,
        };
        self.tables.lock().unwrap().elections.push(election.clone());
        election
    }

    pub fn insert_post(&self, post: NewPost) -> Post {
        let post = Post { id: Id::new(), post };
        self.tables.lock().unwrap().posts.push(post.clone());
        post
    }

    pub fn insert_candidate(&self, candidate: NewCandidate) -> Candidate {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        self.tables.lock().unwrap().candidates.push(candidate.clone());
        candidate
    }

    /// Number of votes held for the post, bypassing the [`Store`] interface.
    pub fn vote_count(&self, post: Id) -> usize {
        let tables = self.tables.lock().unwrap();
        tables.votes.iter().filter(|v| v.post_id == post).count()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn find_vote(&self, user: &UserId, post: Id) -> Result<Option<Vote>> {
        let tables = self.tables()?;
        let vote = tables
            .votes
            .iter()
            .find(|v| &v.user_id == user && v.post_id == post)
            .cloned();
        Ok(vote)
    }

    async fn list_votes_by_user(&self, user: &UserId) -> Result<Vec<Vote>> {
        let tables = self.tables()?;
        Ok(tables
            .votes
            .iter()
            .filter(|v| &v.user_id == user)
            .cloned()
            .collect())
    }

    async fn list_elections(&self, filter: ElectionFilter) -> Result<Vec<Election>> {
        let tables = self.tables()?;
        let mut elections = tables
            .elections
            .iter()
            .filter(|e| filter == ElectionFilter::All || e.is_active)
            .cloned()
            .collect::<Vec<_>>();
        elections.sort_by_key(|e| e.end_time);
        Ok(elections)
    }

    async fn list_posts(&self, election: Id) -> Result<Vec<Post>> {
        let tables = self.tables()?;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.election_id == election)
            .cloned()
            .collect())
    }

    async fn list_posts_in(&self, elections: &[Id]) -> Result<Vec<Post>> {
        let tables = self.tables()?;
        Ok(tables
            .posts
            .iter()
            .filter(|p| elections.contains(&p.election_id))
            .cloned()
            .collect())
    }

    async fn list_candidates(&self, posts: &[Id]) -> Result<Vec<Candidate>> {
        let tables = self.tables()?;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| posts.contains(&c.post_id))
            .cloned()
            .collect())
    }

    async fn post_with_election(&self, post: Id) -> Result<Option<PostWithElection>> {
        let tables = self.tables()?;
        let post = match tables.posts.iter().find(|p| p.id == post) {
            Some(post) => post.clone(),
            None => return Ok(None),
        };
        let election = tables
            .elections
            .iter()
            .find(|e| e.id == post.election_id)
            .cloned();
        Ok(election.map(|election| PostWithElection { post, election }))
    }

    async fn submit_vote(&self, post: Id, candidate: Id, user: &UserId) -> Result<Vote> {
        let mut tables = self.tables()?;
        if tables
            .votes
            .iter()
            .any(|v| &v.user_id == user && v.post_id == post)
        {
            return Err(Error::UniqueConstraintViolation(post));
        }
        let vote = Vote {
            id: Id::new(),
            vote: NewVote::new(user.clone(), post, candidate),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn results(&self, post: Id) -> Result<Vec<CandidateVotes>> {
        let tables = self.tables()?;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| c.post_id == post)
            .map(|candidate| CandidateVotes {
                vote_count: tables
                    .votes
                    .iter()
                    .filter(|v| v.post_id == post && v.candidate_id == candidate.id)
                    .count() as u64,
                candidate: candidate.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::{candidate::CandidateCore, election::ElectionCore, post::PostCore};

    use super::*;

    #[rocket::async_test]
    async fn second_vote_on_a_post_is_a_constraint_violation() {
        let store = MemoryStore::new();
        let election = store.insert_election(ElectionCore::current_example());
        let post = store.insert_post(PostCore::president_example(election.id));
        let alice = store.insert_candidate(CandidateCore::example(post.id, "Alice"));
        let bob = store.insert_candidate(CandidateCore::example(post.id, "Bob"));
        let voter = UserId::from("voter");

        store.submit_vote(post.id, alice.id, &voter).await.unwrap();
        let second = store.submit_vote(post.id, bob.id, &voter).await;

        assert!(matches!(second, Err(Error::UniqueConstraintViolation(id)) if id == post.id));
        assert_eq!(1, store.vote_count(post.id));
    }

    #[rocket::async_test]
    async fn votes_on_other_posts_are_independent() {
        let store = MemoryStore::new();
        let election = store.insert_election(ElectionCore::current_example());
        let president = store.insert_post(PostCore::president_example(election.id));
        let treasurer = store.insert_post(PostCore::treasurer_example(election.id));
        let alice = store.insert_candidate(CandidateCore::example(president.id, "Alice"));
        let carol = store.insert_candidate(CandidateCore::example(treasurer.id, "Carol"));
        let voter = UserId::from("voter");

        store.submit_vote(president.id, alice.id, &voter).await.unwrap();
        store.submit_vote(treasurer.id, carol.id, &voter).await.unwrap();

        assert_eq!(2, store.list_votes_by_user(&voter).await.unwrap().len());
    }

    #[rocket::async_test]
    async fn posts_can_be_listed_for_several_elections() {
        let store = MemoryStore::new();
        let current = store.insert_election(ElectionCore::current_example());
        let past = store.insert_election(ElectionCore::inactive_example());
        let ignored = store.insert_election(ElectionCore::finished_example());
        store.insert_post(PostCore::president_example(current.id));
        store.insert_post(PostCore::treasurer_example(past.id));
        store.insert_post(PostCore::president_example(ignored.id));

        let posts = store.list_posts_in(&[current.id, past.id]).await.unwrap();

        assert_eq!(2, posts.len());
        assert!(posts.iter().all(|p| p.election_id != ignored.id));
        assert!(store.list_posts_in(&[]).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn unavailable_store_fails_transiently() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let result = store.list_elections(ElectionFilter::Active).await;
        assert!(matches!(result, Err(Error::Transient(_))));
    }
}
