use std::collections::{HashMap, HashSet};

use rocket::{
    http::CookieJar, request::FlashMessage, response::Redirect, serde::json::Json,
    tokio::try_join, Route,
};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{CurrentUser, Role},
        dashboard::{Dashboard, DashboardPost},
        election::ElectionSummary,
        hint::VotedPostsHint,
        post::CandidateDescription,
    },
    mongodb::Id,
    store::{ElectionFilter, Gateway},
};

pub fn routes() -> Vec<Route> {
    routes![dashboard]
}

#[derive(Responder)]
pub enum DashboardResponse {
    View(Json<Dashboard>),
    /// Admins have their own overview.
    Elsewhere(Redirect),
}

#[get("/dashboard")]
pub async fn dashboard(
    user: CurrentUser,
    store: Gateway,
    cookies: &CookieJar<'_>,
    flash: Option<FlashMessage<'_>>,
) -> Result<DashboardResponse> {
    if user.has_role(Role::Admin) {
        return Ok(DashboardResponse::Elsewhere(Redirect::to(uri!(
            super::admin::elections
        ))));
    }

    let election = store
        .list_elections(ElectionFilter::Active)
        .await?
        .into_iter()
        .next();

    let (posts, votes) = match &election {
        Some(election) => try_join!(
            store.list_posts(election.id),
            store.list_votes_by_user(&user.id)
        )?,
        None => (Vec::new(), store.list_votes_by_user(&user.id).await?),
    };

    let voted = votes.iter().map(|vote| vote.post_id).collect::<HashSet<_>>();
    VotedPostsHint::from_posts(voted.iter().copied().map(Into::into)).store(cookies);

    let post_ids = posts.iter().map(|post| post.id).collect::<Vec<_>>();
    let mut candidates_by_post: HashMap<Id, Vec<CandidateDescription>> = HashMap::new();
    for candidate in store.list_candidates(&post_ids).await? {
        candidates_by_post
            .entry(candidate.post_id)
            .or_default()
            .push(candidate.into());
    }

    let posts = posts
        .iter()
        .map(|post| DashboardPost {
            post: post.into(),
            candidates: candidates_by_post.remove(&post.id).unwrap_or_default(),
            has_voted: voted.contains(&post.id),
        })
        .collect();

    Ok(DashboardResponse::View(Json(Dashboard {
        user_name: user.name,
        election: election.as_ref().map(ElectionSummary::from),
        posts,
        notice: flash.map(Into::into),
    })))
}
