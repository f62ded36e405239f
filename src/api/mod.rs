use rocket::{
    response::{Flash, Redirect},
    Catcher, Request, Route,
};

use crate::error::login_redirect;
use crate::model::api::notice;

pub mod admin;
pub mod dashboard;
pub mod results;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(dashboard::routes());
    routes.extend(results::routes());
    routes.extend(voting::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, forbidden, not_found, unprocessable]
}

/// Malformed request bodies.
#[catch(400)]
fn bad_request() -> Flash<Redirect> {
    Flash::warning(Redirect::to(uri!(dashboard::dashboard)), notice::BAD_REQUEST)
}

/// No valid token: send the user to the identity provider.
#[catch(401)]
fn unauthorized(req: &Request<'_>) -> Redirect {
    login_redirect(req)
}

/// Authenticated, but lacking the role for this page.
#[catch(403)]
fn forbidden() -> Flash<Redirect> {
    Flash::warning(Redirect::to(uri!(dashboard::dashboard)), notice::ADMIN_ONLY)
}

/// No route matched, including paths whose IDs don't parse.
#[catch(404)]
fn not_found(req: &Request<'_>) -> Flash<Redirect> {
    debug!("No route for {}", req.uri());
    Flash::warning(Redirect::to(uri!(dashboard::dashboard)), notice::PAGE_NOT_FOUND)
}

/// Well-formed JSON that doesn't describe a vote, e.g. an unparseable candidate ID.
#[catch(422)]
fn unprocessable() -> Flash<Redirect> {
    Flash::warning(Redirect::to(uri!(dashboard::dashboard)), notice::BAD_REQUEST)
}
