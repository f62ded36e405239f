use serde::{Deserialize, Serialize};

use super::{
    election::ElectionSummary,
    notice::Notice,
    post::{CandidateDescription, PostDescription},
};

/// Everything the voter dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Display name of the current user.
    pub user_name: String,
    /// The active election, if there is one.
    pub election: Option<ElectionSummary>,
    /// Posts of the active election; empty when there is none.
    pub posts: Vec<DashboardPost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// A post as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardPost {
    #[serde(flatten)]
    pub post: PostDescription,
    pub candidates: Vec<CandidateDescription>,
    pub has_voted: bool,
}
