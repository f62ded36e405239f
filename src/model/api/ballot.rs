use serde::{Deserialize, Serialize};

use super::{
    election::ElectionSummary,
    id::ApiId,
    post::{CandidateDescription, PostDescription},
};

/// The candidate selection page for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotPage {
    pub election: ElectionSummary,
    pub post: PostDescription,
    pub candidates: Vec<CandidateDescription>,
}

/// The confirmation step, shown before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPage {
    pub post: PostDescription,
    pub candidate: CandidateDescription,
}

/// A vote the user wishes to cast on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate_id: ApiId,
    /// The vote is only submitted once the user has confirmed their choice.
    #[serde(default)]
    pub confirmed: bool,
}
