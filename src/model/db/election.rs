use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election title.
    pub title: String,
    /// Voting closes at this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Whether the election is currently running.
    pub is_active: bool,
}

impl ElectionCore {
    /// Has voting closed as of `now`?
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn ends_strictly_after_end_time() {
        let election = ElectionCore::current_example();
        assert!(!election.has_ended(election.end_time));
        assert!(!election.has_ended(election.end_time - Duration::seconds(1)));
        assert!(election.has_ended(election.end_time + Duration::seconds(1)));
    }
}
