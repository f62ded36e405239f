use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::{api::auth::UserId, mongodb::Id};

/// Core vote data, as stored in the database.
///
/// At most one vote may exist per `(user_id, post_id)`; this is enforced by a
/// unique index on the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub user_id: UserId,
    pub post_id: Id,
    pub candidate_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCore {
    /// Create a new vote, timestamped now.
    pub fn new(user_id: UserId, post_id: Id, candidate_id: Id) -> Self {
        Self {
            user_id,
            post_id,
            candidate_id,
            created_at: Utc::now(),
        }
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// Filter matching the (unique) vote of the given user on the given post.
pub fn user_post_filter(user_id: &UserId, post_id: Id) -> Document {
    doc! {
        "user_id": user_id.as_str(),
        "post_id": post_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_user_and_post() {
        let user = UserId::from("user-1");
        let post = Id::new();
        let filter = user_post_filter(&user, post);
        assert_eq!(Some("user-1"), filter.get_str("user_id").ok());
        assert_eq!(Some(*post), filter.get_object_id("post_id").ok());
    }
}
