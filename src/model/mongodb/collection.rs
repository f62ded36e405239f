use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    candidate::Candidate,
    election::Election,
    post::Post,
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

// Post collections
const POSTS: &str = "posts";
impl MongoCollection for Post {
    const NAME: &'static str = POSTS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Vote collection: one vote per user per post.
    let one_vote_per_post = IndexModel::builder()
        .keys(doc! {"user_id": 1, "post_id": 1})
        .options(unique)
        .build();
    let votes_by_post = IndexModel::builder().keys(doc! {"post_id": 1}).build();
    Coll::<Vote>::from_db(db)
        .create_indexes([one_vote_per_post, votes_by_post], None)
        .await?;

    // Post collection.
    let post_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Post>::from_db(db)
        .create_index(post_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder().keys(doc! {"post_id": 1}).build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    Ok(())
}
