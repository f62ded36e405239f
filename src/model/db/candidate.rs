use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// The post this candidate is standing for.
    pub post_id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// A candidate together with the number of votes cast for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateVotes {
    pub candidate: Candidate,
    pub vote_count: u64,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example(post_id: Id, name: &str) -> Self {
            Self {
                post_id,
                name: name.to_string(),
                bio: Some(format!("{name} has served two terms as class representative.")),
                department: Some("Computer Science".to_string()),
                image_url: None,
            }
        }
    }
}
