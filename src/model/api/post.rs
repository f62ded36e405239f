use serde::{Deserialize, Serialize};

use crate::model::db::{candidate::Candidate, post::Post};

use super::id::ApiId;

/// An API-friendly description of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub title: String,
    pub description: String,
}

impl From<&Post> for PostDescription {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.into(),
            election_id: post.election_id.into(),
            title: post.title.clone(),
            description: post.description.clone(),
        }
    }
}

/// An API-friendly description of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub image_url: Option<String>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            bio: candidate.candidate.bio,
            department: candidate.candidate.department,
            image_url: candidate.candidate.image_url,
        }
    }
}
