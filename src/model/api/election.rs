use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::db::election::Election;

use super::id::ApiId;

/// An API-friendly election summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ApiId,
    pub title: String,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&Election> for ElectionSummary {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id.into(),
            title: election.title.clone(),
            end_time: election.end_time,
            is_active: election.is_active,
        }
    }
}
