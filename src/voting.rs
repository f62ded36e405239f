//! The duplicate-vote guard.
//!
//! A voting session runs a sequence of checks so that a user who has already
//! voted on a post is sent to its results rather than shown a ballot or left
//! staring at an error:
//!
//! 1. On entering the vote page, look for an existing vote.
//! 2. Refuse elections whose end time has passed.
//! 3. Immediately before submitting, look for an existing vote again.
//! 4. If the store still rejects the vote as a duplicate, treat it as recorded.
//!
//! None of this is what keeps a user to one vote per post: there is a gap
//! between every check and the write that follows it. The unique index on
//! the store decides; these checks only avoid pointless submissions and make
//! every path end in a coherent outcome.

use std::fmt::Display;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::CurrentUser,
    db::{candidate::Candidate, election::Election, post::Post, vote::Vote},
    mongodb::Id,
    store::Store,
};

/// Where a voting session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingState {
    Checking,
    AlreadyVoted,
    ElectionClosed,
    Selecting,
    Confirming,
    Submitting,
    Success,
    DuplicateDetected,
    Error,
}

impl VotingState {
    /// No further submission may be attempted from a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AlreadyVoted | Self::ElectionClosed | Self::Success | Self::DuplicateDetected
        )
    }

    /// Whether the session may move from `self` to `next`.
    pub fn can_advance_to(self, next: Self) -> bool {
        use VotingState::*;
        matches!(
            (self, next),
            (Checking, AlreadyVoted | ElectionClosed | Selecting | Error)
                | (Selecting, Confirming | Error)
                | (Confirming, Selecting | Submitting | Error)
                | (Submitting, Success | DuplicateDetected | Error)
                | (DuplicateDetected, Success)
        )
    }
}

impl Display for VotingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A post ready for candidate selection.
#[derive(Debug, Clone)]
pub struct Ballot {
    pub post: Post,
    pub election: Election,
    pub candidates: Vec<Candidate>,
}

impl Ballot {
    /// The candidate with the given ID, if they stand for this post.
    pub fn candidate(&self, id: Id) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

/// Outcome of entering the vote page.
#[derive(Debug)]
pub enum Entry {
    /// The user has voted on this post already.
    AlreadyVoted,
    /// The election's end time has passed.
    ElectionClosed(Election),
    /// The user may pick a candidate.
    Selecting(Ballot),
}

/// Outcome of a submission. Both variants are successes for the user.
#[derive(Debug)]
pub enum Submission {
    /// This submission wrote the vote.
    Recorded(Vote),
    /// A vote was already on record, caught either by the re-check or by the
    /// store's unique constraint.
    AlreadyRecorded,
}

/// One user's attempt to vote on one post.
pub struct VotingSession<'a> {
    store: &'a dyn Store,
    user: &'a CurrentUser,
    post_id: Id,
    state: VotingState,
}

impl<'a> VotingSession<'a> {
    /// A session for a user arriving at the vote page.
    pub fn new(store: &'a dyn Store, user: &'a CurrentUser, post_id: Id) -> Self {
        Self {
            store,
            user,
            post_id,
            state: VotingState::Checking,
        }
    }

    /// A session for a user who has picked a candidate and confirmed it.
    pub fn confirmed(store: &'a dyn Store, user: &'a CurrentUser, post_id: Id) -> Self {
        Self {
            store,
            user,
            post_id,
            state: VotingState::Confirming,
        }
    }

    pub fn state(&self) -> VotingState {
        self.state
    }

    fn advance(&mut self, next: VotingState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::Transient(format!(
                "Illegal voting transition {} -> {next}",
                self.state
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Move to [`VotingState::Error`] and hand the error back.
    fn fail(&mut self, err: Error) -> Error {
        self.state = VotingState::Error;
        err
    }

    /// Load the post, its election and its candidates.
    async fn load_ballot(&self) -> Result<Ballot> {
        let found = self
            .store
            .post_with_election(self.post_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Post '{}'", self.post_id)))?;
        let candidates = self.store.list_candidates(&[self.post_id]).await?;
        Ok(Ballot {
            post: found.post,
            election: found.election,
            candidates,
        })
    }

    /// Run the page-entry and election-window checks.
    pub async fn enter(&mut self, now: DateTime<Utc>) -> Result<Entry> {
        match self.enter_inner(now).await {
            Ok(entry) => Ok(entry),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn enter_inner(&mut self, now: DateTime<Utc>) -> Result<Entry> {
        if self
            .store
            .find_vote(&self.user.id, self.post_id)
            .await?
            .is_some()
        {
            self.advance(VotingState::AlreadyVoted)?;
            return Ok(Entry::AlreadyVoted);
        }

        let ballot = self.load_ballot().await?;
        if ballot.election.has_ended(now) {
            self.advance(VotingState::ElectionClosed)?;
            return Ok(Entry::ElectionClosed(ballot.election));
        }

        self.advance(VotingState::Selecting)?;
        Ok(Entry::Selecting(ballot))
    }

    /// Pick a candidate from the ballot, moving on to confirmation.
    pub fn select(&mut self, ballot: &Ballot, candidate: Id) -> Result<Candidate> {
        match ballot.candidate(candidate) {
            Some(candidate) => {
                self.advance(VotingState::Confirming)?;
                Ok(candidate.clone())
            }
            None => Err(self.fail(Error::not_found(format!(
                "Candidate '{candidate}' for post '{}'",
                self.post_id
            )))),
        }
    }

    /// Re-check for an existing vote and, if there is none, submit one.
    pub async fn submit(&mut self, candidate: Id, now: DateTime<Utc>) -> Result<Submission> {
        self.advance(VotingState::Submitting)?;
        match self.submit_inner(candidate, now).await {
            Ok(submission) => Ok(submission),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn submit_inner(&mut self, candidate: Id, now: DateTime<Utc>) -> Result<Submission> {
        let ballot = self.load_ballot().await?;

        // Just-in-time re-check; must complete before the write is issued.
        if self
            .store
            .find_vote(&self.user.id, self.post_id)
            .await?
            .is_some()
        {
            info!(
                "Vote by {} on post {} landed since the page loaded",
                self.user.id, self.post_id
            );
            return self.already_recorded();
        }

        if ballot.election.has_ended(now) {
            return Err(Error::ElectionClosed(ballot.election.title.clone()));
        }
        if ballot.candidate(candidate).is_none() {
            return Err(Error::not_found(format!(
                "Candidate '{candidate}' for post '{}'",
                self.post_id
            )));
        }

        match self
            .store
            .submit_vote(self.post_id, candidate, &self.user.id)
            .await
        {
            Ok(vote) => {
                info!("Recorded vote {} by {} on post {}", vote.id, self.user.id, self.post_id);
                self.advance(VotingState::Success)?;
                Ok(Submission::Recorded(vote))
            }
            Err(Error::UniqueConstraintViolation(_)) => {
                info!(
                    "Store rejected duplicate vote by {} on post {}",
                    self.user.id, self.post_id
                );
                self.already_recorded()
            }
            Err(e) => Err(e),
        }
    }

    fn already_recorded(&mut self) -> Result<Submission> {
        self.advance(VotingState::DuplicateDetected)?;
        self.advance(VotingState::Success)?;
        Ok(Submission::AlreadyRecorded)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::model::{
        api::auth::UserId,
        db::{
            candidate::{CandidateCore, CandidateVotes},
            election::ElectionCore,
            post::{PostCore, PostWithElection},
        },
        store::{memory::MemoryStore, ElectionFilter},
    };

    use super::*;

    struct Fixture {
        store: MemoryStore,
        post: Post,
        alice: Candidate,
        bob: Candidate,
    }

    fn fixture(election: ElectionCore) -> Fixture {
        let store = MemoryStore::new();
        let election = store.insert_election(election);
        let post = store.insert_post(PostCore::president_example(election.id));
        let alice = store.insert_candidate(CandidateCore::example(post.id, "Alice"));
        let bob = store.insert_candidate(CandidateCore::example(post.id, "Bob"));
        Fixture {
            store,
            post,
            alice,
            bob,
        }
    }

    /// A store whose existence checks never see a vote, as if every other
    /// tab's vote lands just after each check. Writes can be made to fail.
    struct RacingStore(MemoryStore, Option<&'static str>);

    #[rocket::async_trait]
    impl Store for RacingStore {
        async fn find_vote(&self, _user: &UserId, _post: Id) -> Result<Option<Vote>> {
            Ok(None)
        }

        async fn list_votes_by_user(&self, user: &UserId) -> Result<Vec<Vote>> {
            self.0.list_votes_by_user(user).await
        }

        async fn list_elections(&self, filter: ElectionFilter) -> Result<Vec<Election>> {
            self.0.list_elections(filter).await
        }

        async fn list_posts(&self, election: Id) -> Result<Vec<Post>> {
            self.0.list_posts(election).await
        }

        async fn list_posts_in(&self, elections: &[Id]) -> Result<Vec<Post>> {
            self.0.list_posts_in(elections).await
        }

        async fn list_candidates(&self, posts: &[Id]) -> Result<Vec<Candidate>> {
            self.0.list_candidates(posts).await
        }

        async fn post_with_election(&self, post: Id) -> Result<Option<PostWithElection>> {
            self.0.post_with_election(post).await
        }

        async fn submit_vote(&self, post: Id, candidate: Id, user: &UserId) -> Result<Vote> {
            if let Some(failure) = self.1 {
                return Err(Error::Transient(failure.to_string()));
            }
            self.0.submit_vote(post, candidate, user).await
        }

        async fn results(&self, post: Id) -> Result<Vec<CandidateVotes>> {
            self.0.results(post).await
        }
    }

    #[rocket::async_test]
    async fn fresh_voter_gets_a_ballot() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);

        let entry = session.enter(Utc::now()).await.unwrap();

        match entry {
            Entry::Selecting(ballot) => {
                assert_eq!(f.post.id, ballot.post.id);
                assert_eq!(2, ballot.candidates.len());
            }
            other => panic!("expected a ballot, got {other:?}"),
        }
        assert_eq!(VotingState::Selecting, session.state());
    }

    #[rocket::async_test]
    async fn existing_vote_short_circuits_entry() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        f.store
            .submit_vote(f.post.id, f.alice.id, &user.id)
            .await
            .unwrap();

        let mut session = VotingSession::new(&f.store, &user, f.post.id);
        let entry = session.enter(Utc::now()).await.unwrap();

        assert!(matches!(entry, Entry::AlreadyVoted));
        assert!(session.state().is_terminal());
    }

    #[rocket::async_test]
    async fn closed_election_is_refused_on_entry() {
        let f = fixture(ElectionCore::finished_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);

        let entry = session.enter(Utc::now()).await.unwrap();

        assert!(matches!(entry, Entry::ElectionClosed(_)));
        assert_eq!(VotingState::ElectionClosed, session.state());
    }

    #[rocket::async_test]
    async fn window_check_uses_the_given_clock() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);

        let entry = session
            .enter(Utc::now() + Duration::days(30))
            .await
            .unwrap();

        assert!(matches!(entry, Entry::ElectionClosed(_)));
    }

    #[rocket::async_test]
    async fn missing_post_is_not_found() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, Id::new());

        let result = session.enter(Utc::now()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(VotingState::Error, session.state());
    }

    #[rocket::async_test]
    async fn failed_existence_check_is_transient() {
        let f = fixture(ElectionCore::current_example());
        f.store.set_unavailable(true);
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);

        let result = session.enter(Utc::now()).await;

        assert!(matches!(result, Err(Error::Transient(_))));
        assert_eq!(VotingState::Error, session.state());
    }

    #[rocket::async_test]
    async fn full_flow_records_one_vote() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);

        let ballot = match session.enter(Utc::now()).await.unwrap() {
            Entry::Selecting(ballot) => ballot,
            other => panic!("expected a ballot, got {other:?}"),
        };
        let picked = session.select(&ballot, f.bob.id).unwrap();
        assert_eq!(VotingState::Confirming, session.state());

        let submission = session.submit(picked.id, Utc::now()).await.unwrap();

        assert!(matches!(submission, Submission::Recorded(ref vote) if vote.candidate_id == f.bob.id));
        assert_eq!(VotingState::Success, session.state());
        assert_eq!(1, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn vote_from_another_tab_is_caught_before_submitting() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::new(&f.store, &user, f.post.id);
        let ballot = match session.enter(Utc::now()).await.unwrap() {
            Entry::Selecting(ballot) => ballot,
            other => panic!("expected a ballot, got {other:?}"),
        };
        session.select(&ballot, f.alice.id).unwrap();

        // Another tab votes between page load and confirmation.
        f.store
            .submit_vote(f.post.id, f.bob.id, &user.id)
            .await
            .unwrap();

        let submission = session.submit(f.alice.id, Utc::now()).await.unwrap();

        assert!(matches!(submission, Submission::AlreadyRecorded));
        assert_eq!(VotingState::Success, session.state());
        assert_eq!(1, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn unique_constraint_is_surfaced_as_already_recorded() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        f.store
            .submit_vote(f.post.id, f.alice.id, &user.id)
            .await
            .unwrap();
        let racing = RacingStore(f.store.clone(), None);

        let mut session = VotingSession::confirmed(&racing, &user, f.post.id);
        let submission = session.submit(f.bob.id, Utc::now()).await.unwrap();

        assert!(matches!(submission, Submission::AlreadyRecorded));
        assert_eq!(VotingState::Success, session.state());
        assert_eq!(1, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn failed_write_is_an_error_not_a_duplicate() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let failing = RacingStore(f.store.clone(), Some("write timed out"));

        let mut session = VotingSession::confirmed(&failing, &user, f.post.id);
        let result = session.submit(f.alice.id, Utc::now()).await;

        assert!(matches!(result, Err(Error::Transient(_))));
        assert_eq!(VotingState::Error, session.state());
        assert_eq!(0, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn candidate_from_another_post_is_rejected() {
        let f = fixture(ElectionCore::current_example());
        let other_post = f
            .store
            .insert_post(PostCore::treasurer_example(f.post.election_id));
        let carol = f
            .store
            .insert_candidate(CandidateCore::example(other_post.id, "Carol"));
        let user = CurrentUser::voter_example();

        let mut session = VotingSession::confirmed(&f.store, &user, f.post.id);
        let result = session.submit(carol.id, Utc::now()).await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(0, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn election_closing_before_submission_is_refused() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::confirmed(&f.store, &user, f.post.id);

        let result = session
            .submit(f.alice.id, Utc::now() + Duration::days(30))
            .await;

        assert!(matches!(result, Err(Error::ElectionClosed(_))));
        assert_eq!(0, f.store.vote_count(f.post.id));
    }

    #[rocket::async_test]
    async fn terminal_sessions_cannot_submit() {
        let f = fixture(ElectionCore::current_example());
        let user = CurrentUser::voter_example();
        let mut session = VotingSession::confirmed(&f.store, &user, f.post.id);
        session.submit(f.alice.id, Utc::now()).await.unwrap();

        let again = session.submit(f.bob.id, Utc::now()).await;

        assert!(again.is_err());
        assert_eq!(1, f.store.vote_count(f.post.id));
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use VotingState::*;
        assert!(Checking.can_advance_to(Selecting));
        assert!(Selecting.can_advance_to(Confirming));
        assert!(Confirming.can_advance_to(Submitting));
        assert!(DuplicateDetected.can_advance_to(Success));
        assert!(!Checking.can_advance_to(Submitting));
        assert!(!Selecting.can_advance_to(Submitting));
        for terminal in [AlreadyVoted, ElectionClosed, Success] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_advance_to(Submitting));
        }
        assert!(!Error.is_terminal());
    }
}
