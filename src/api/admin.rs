use std::collections::HashMap;

use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        admin::{AdminElection, AdminOverview},
        auth::AdminUser,
        post::PostDescription,
    },
    mongodb::Id,
    store::{ElectionFilter, Gateway},
};

pub fn routes() -> Vec<Route> {
    routes![elections]
}

/// Every election, active or not, with its posts.
#[get("/admin/elections")]
pub async fn elections(_admin: AdminUser, store: Gateway) -> Result<Json<AdminOverview>> {
    let elections = store.list_elections(ElectionFilter::All).await?;
    let election_ids = elections.iter().map(|e| e.id).collect::<Vec<_>>();

    let mut posts_by_election: HashMap<Id, Vec<PostDescription>> = HashMap::new();
    for post in store.list_posts_in(&election_ids).await? {
        posts_by_election
            .entry(post.election_id)
            .or_default()
            .push((&post).into());
    }

    let elections = elections
        .iter()
        .map(|election| AdminElection {
            election: election.into(),
            posts: posts_by_election.remove(&election.id).unwrap_or_default(),
        })
        .collect();
    Ok(Json(AdminOverview { elections }))
}
