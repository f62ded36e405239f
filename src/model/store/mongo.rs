use std::collections::HashMap;

use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::auth::UserId,
    db::{
        candidate::{Candidate, CandidateVotes},
        election::Election,
        post::{Post, PostWithElection},
        vote::{user_post_filter, NewVote, Vote},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{ElectionFilter, Store};

/// A [`Store`] backed by MongoDB.
///
/// The unique `{user_id, post_id}` index created by
/// [`ensure_indexes_exist`](crate::model::mongodb::ensure_indexes_exist) is
/// what makes [`Store::submit_vote`] refuse a second vote.
#[derive(Clone)]
pub struct MongoStore {
    elections: Coll<Election>,
    posts: Coll<Post>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            elections: Coll::from_db(db),
            posts: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            new_votes: Coll::from_db(db),
        }
    }
}

/// Filter matching documents whose `field` is any of the given IDs.
fn any_of(field: &str, ids: &[Id]) -> Document {
    let ids = ids.iter().copied().map(Bson::from).collect::<Vec<_>>();
    let mut filter = Document::new();
    filter.insert(field, doc! { "$in": ids });
    filter
}

/// Read a count produced by `$sum`, which may come back as either integer width.
fn count_of(group: &Document) -> u64 {
    match group.get("count") {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or_default(),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or_default(),
        _ => 0,
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn find_vote(&self, user: &UserId, post: Id) -> Result<Option<Vote>> {
        let vote = self
            .votes
            .find_one(user_post_filter(user, post), None)
            .await?;
        Ok(vote)
    }

    async fn list_votes_by_user(&self, user: &UserId) -> Result<Vec<Vote>> {
        let votes = self
            .votes
            .find(doc! { "user_id": user.as_str() }, None)
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn list_elections(&self, filter: ElectionFilter) -> Result<Vec<Election>> {
        let filter = match filter {
            ElectionFilter::Active => doc! { "is_active": true },
            ElectionFilter::All => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "end_time": 1 }).build();
        let elections = self
            .elections
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(elections)
    }

    async fn list_posts(&self, election: Id) -> Result<Vec<Post>> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let posts = self
            .posts
            .find(doc! { "election_id": election }, options)
            .await?
            .try_collect()
            .await?;
        Ok(posts)
    }

    async fn list_posts_in(&self, elections: &[Id]) -> Result<Vec<Post>> {
        if elections.is_empty() {
            return Ok(Vec::new());
        }
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let posts = self
            .posts
            .find(any_of("election_id", elections), options)
            .await?
            .try_collect()
            .await?;
        Ok(posts)
    }

    async fn list_candidates(&self, posts: &[Id]) -> Result<Vec<Candidate>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let candidates = self
            .candidates
            .find(any_of("post_id", posts), options)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }

    async fn post_with_election(&self, post: Id) -> Result<Option<PostWithElection>> {
        let post = match self.posts.find_one(post.as_doc(), None).await? {
            Some(post) => post,
            None => return Ok(None),
        };
        let election = self.elections.find_one(post.election_id.as_doc(), None).await?;
        if election.is_none() {
            warn!("Post {} refers to missing election {}", post.id, post.election_id);
        }
        Ok(election.map(|election| PostWithElection { post, election }))
    }

    async fn submit_vote(&self, post: Id, candidate: Id, user: &UserId) -> Result<Vote> {
        let vote = NewVote::new(user.clone(), post, candidate);
        let inserted = match self.new_votes.insert_one(&vote, None).await {
            Ok(inserted) => inserted,
            Err(e) if is_duplicate_key_error(&e) => {
                return Err(Error::UniqueConstraintViolation(post));
            }
            Err(e) => return Err(e.into()),
        };
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Transient("Inserted vote has no ObjectId".to_string()))?
            .into();
        Ok(Vote { id, vote })
    }

    async fn results(&self, post: Id) -> Result<Vec<CandidateVotes>> {
        let candidates = self.list_candidates(&[post]).await?;

        let pipeline = [
            doc! { "$match": { "post_id": post } },
            doc! { "$group": { "_id": "$candidate_id", "count": { "$sum": 1 } } },
        ];
        let counts = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect::<Vec<Document>>()
            .await?
            .into_iter()
            .filter_map(|group| {
                let candidate: Id = group.get_object_id("_id").ok()?.into();
                Some((candidate, count_of(&group)))
            })
            .collect::<HashMap<_, _>>();

        let results = candidates
            .into_iter()
            .map(|candidate| CandidateVotes {
                vote_count: counts.get(&candidate.id).copied().unwrap_or(0),
                candidate,
            })
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_of_lists_every_id() {
        let ids = [Id::new(), Id::new()];
        let filter = any_of("post_id", &ids);
        let ids_in_filter = filter
            .get_document("post_id")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(2, ids_in_filter.len());
        assert_eq!(&Bson::from(ids[0]), &ids_in_filter[0]);
    }

    #[test]
    fn counts_accept_either_integer_width() {
        assert_eq!(3, count_of(&doc! { "count": 3_i32 }));
        assert_eq!(4, count_of(&doc! { "count": 4_i64 }));
        assert_eq!(0, count_of(&doc! {}));
    }
}
