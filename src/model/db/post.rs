use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{db::election::Election, mongodb::Id};

/// Core post (electable position) data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCore {
    /// The election this post belongs to.
    pub election_id: Id,
    pub title: String,
    pub description: String,
}

/// A post without an ID.
pub type NewPost = PostCore;

/// A post from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub post: PostCore,
}

impl Deref for Post {
    type Target = PostCore;

    fn deref(&self) -> &Self::Target {
        &self.post
    }
}

impl DerefMut for Post {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.post
    }
}

/// A post joined with the election it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWithElection {
    pub post: Post,
    pub election: Election,
}
