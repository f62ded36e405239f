use serde::{Deserialize, Serialize};

use crate::model::db::candidate::CandidateVotes;

use super::{id::ApiId, notice::Notice, post::PostDescription};

/// Aggregated results for a single post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResults {
    pub post: PostDescription,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
    /// Whether the current user has voted on this post.
    pub has_voted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// One candidate's share of the vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: ApiId,
    pub name: String,
    pub department: Option<String>,
    pub image_url: Option<String>,
    pub vote_count: u64,
    /// Share of all votes on the post, to two decimal places.
    pub percentage: f64,
}

/// Turn raw per-candidate counts into results with percentages.
///
/// Every candidate is at 0% when no votes have been cast. Output is ordered by
/// vote count, most first, then by name.
pub fn tally(counts: Vec<CandidateVotes>) -> (u64, Vec<CandidateResult>) {
    let total_votes: u64 = counts.iter().map(|c| c.vote_count).sum();

    let mut results = counts
        .into_iter()
        .map(|CandidateVotes { candidate, vote_count }| CandidateResult {
            candidate_id: candidate.id.into(),
            percentage: percentage(vote_count, total_votes),
            vote_count,
            name: candidate.candidate.name,
            department: candidate.candidate.department,
            image_url: candidate.candidate.image_url,
        })
        .collect::<Vec<_>>();
    results.sort_by(|a, b| {
        b.vote_count
            .cmp(&a.vote_count)
            .then_with(|| a.name.cmp(&b.name))
    });

    (total_votes, results)
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
