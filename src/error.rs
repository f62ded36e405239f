use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{status::Custom, Flash, Redirect, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::config::Config;
use crate::model::{
    api::notice::{self, Notice},
    mongodb::Id,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Election '{0}' has closed")]
    ElectionClosed(String),
    #[error("A vote on post {0} by this user already exists")]
    UniqueConstraintViolation(Id),
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Every error becomes a navigation: a redirect, usually with a notice.
impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let dashboard = || Redirect::to(uri!(crate::api::dashboard::dashboard));
        match self {
            Self::NotAuthenticated | Self::Jwt(_) => {
                debug!("{self}, sending to login");
                login_redirect(req).respond_to(req)
            }
            Self::Forbidden => Flash::warning(dashboard(), notice::ADMIN_ONLY).respond_to(req),
            Self::NotFound(what) => {
                warn!("Not found: {what}");
                Flash::warning(dashboard(), format!("{what} could not be found.")).respond_to(req)
            }
            Self::ElectionClosed(_) => {
                Flash::warning(dashboard(), notice::ELECTION_CLOSED).respond_to(req)
            }
            Self::UniqueConstraintViolation(post_id) => Flash::success(
                Redirect::to(uri!(crate::api::results::results(post_id))),
                notice::ALREADY_VOTED,
            )
            .respond_to(req),
            Self::Db(_) | Self::Transient(_) => {
                error!("{self}");
                // Redirecting the dashboard to itself would loop.
                if req.uri().path() == "/dashboard" {
                    let notice = Notice {
                        kind: "error".to_string(),
                        message: notice::TRY_AGAIN.to_string(),
                    };
                    Custom(Status::ServiceUnavailable, Json(notice)).respond_to(req)
                } else {
                    Flash::error(dashboard(), notice::TRY_AGAIN).respond_to(req)
                }
            }
        }
    }
}

/// Redirect to the identity provider's login page.
pub fn login_redirect(req: &Request<'_>) -> Redirect {
    let login_url = req
        .rocket()
        .state::<Config>()
        .map(|config| config.login_url().to_string())
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(login_url)
}
