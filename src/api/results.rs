use rocket::{
    http::CookieJar, request::FlashMessage, serde::json::Json, tokio::try_join, Route,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::CurrentUser,
        hint::VotedPostsHint,
        results::{tally, PostResults},
    },
    mongodb::Id,
    store::Gateway,
};

pub fn routes() -> Vec<Route> {
    routes![results]
}

#[get("/posts/<post_id>/results")]
pub async fn results(
    post_id: Id,
    user: CurrentUser,
    store: Gateway,
    cookies: &CookieJar<'_>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Json<PostResults>> {
    let found = store
        .post_with_election(post_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Post '{post_id}'")))?;

    let (counts, vote) = try_join!(store.results(post_id), store.find_vote(&user.id, post_id))?;

    let has_voted = vote.is_some();
    if has_voted {
        let mut hint = VotedPostsHint::from_cookies(cookies);
        hint.record(post_id.into());
        hint.store(cookies);
    }

    let (total_votes, candidates) = tally(counts);
    Ok(Json(PostResults {
        post: (&found.post).into(),
        total_votes,
        candidates,
        has_voted,
        notice: flash.map(Into::into),
    }))
}
