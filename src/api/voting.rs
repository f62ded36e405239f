use chrono::Utc;
use rocket::{
    http::CookieJar,
    response::{Flash, Redirect},
    serde::json::Json,
    Route,
};

use crate::error::Result;
use crate::logging::RequestId;
use crate::model::{
    api::{
        auth::CurrentUser,
        ballot::{BallotPage, ConfirmPage, VoteRequest},
        hint::VotedPostsHint,
        notice,
    },
    mongodb::Id,
    store::Gateway,
};
use crate::voting::{Ballot, Entry, Submission, VotingSession};

pub fn routes() -> Vec<Route> {
    routes![vote_page, cast_vote]
}

#[derive(Responder)]
pub enum VotePage {
    Ballot(Json<BallotPage>),
    Confirm(Json<ConfirmPage>),
    Navigate(Flash<Redirect>),
}

impl From<Ballot> for BallotPage {
    fn from(ballot: Ballot) -> Self {
        Self {
            election: (&ballot.election).into(),
            post: (&ballot.post).into(),
            candidates: ballot.candidates.into_iter().map(Into::into).collect(),
        }
    }
}

fn to_results(post_id: Id, message: &'static str) -> VotePage {
    VotePage::Navigate(Flash::success(
        Redirect::to(uri!(super::results::results(post_id))),
        message,
    ))
}

fn to_dashboard_closed() -> VotePage {
    VotePage::Navigate(Flash::warning(
        Redirect::to(uri!(super::dashboard::dashboard)),
        notice::ELECTION_CLOSED,
    ))
}

fn remember_vote(cookies: &CookieJar<'_>, post_id: Id) {
    let mut hint = VotedPostsHint::from_cookies(cookies);
    hint.record(post_id.into());
    hint.store(cookies);
}

/// Show the candidates for a post, unless the user has already voted on it
/// or its election has closed.
#[get("/posts/<post_id>/vote")]
pub async fn vote_page(
    post_id: Id,
    user: CurrentUser,
    store: Gateway,
    cookies: &CookieJar<'_>,
) -> Result<VotePage> {
    let mut session = VotingSession::new(&*store, &user, post_id);
    let page = match session.enter(Utc::now()).await? {
        Entry::AlreadyVoted => {
            remember_vote(cookies, post_id);
            to_results(post_id, notice::ALREADY_VOTED)
        }
        Entry::ElectionClosed(_) => to_dashboard_closed(),
        Entry::Selecting(ballot) => VotePage::Ballot(Json(ballot.into())),
    };
    Ok(page)
}

/// Confirm a selection, or submit a confirmed one.
#[post("/posts/<post_id>/vote", data = "<request>", format = "json")]
pub async fn cast_vote(
    post_id: Id,
    request: Json<VoteRequest>,
    user: CurrentUser,
    store: Gateway,
    cookies: &CookieJar<'_>,
    request_id: &RequestId,
) -> Result<VotePage> {
    let candidate_id: Id = request.candidate_id.into();

    if !request.confirmed {
        let mut session = VotingSession::new(&*store, &user, post_id);
        let page = match session.enter(Utc::now()).await? {
            Entry::AlreadyVoted => {
                remember_vote(cookies, post_id);
                to_results(post_id, notice::ALREADY_VOTED)
            }
            Entry::ElectionClosed(_) => to_dashboard_closed(),
            Entry::Selecting(ballot) => {
                let candidate = session.select(&ballot, candidate_id)?;
                VotePage::Confirm(Json(ConfirmPage {
                    post: (&ballot.post).into(),
                    candidate: candidate.into(),
                }))
            }
        };
        return Ok(page);
    }

    let mut session = VotingSession::confirmed(&*store, &user, post_id);
    let message = match session.submit(candidate_id, Utc::now()).await? {
        Submission::Recorded(_) => notice::VOTE_RECORDED,
        Submission::AlreadyRecorded => notice::ALREADY_VOTED,
    };
    info!("req{request_id} voting session on post {post_id} ended {}", session.state());
    remember_vote(cookies, post_id);
    Ok(to_results(post_id, message))
}
