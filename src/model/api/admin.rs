use serde::{Deserialize, Serialize};

use super::{election::ElectionSummary, post::PostDescription};

/// Read-only overview of every election for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub elections: Vec<AdminElection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminElection {
    #[serde(flatten)]
    pub election: ElectionSummary,
    pub posts: Vec<PostDescription>,
}
