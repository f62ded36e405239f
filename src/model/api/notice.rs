use rocket::request::FlashMessage;
use serde::{Deserialize, Serialize};

pub const VOTE_RECORDED: &str = "Your vote has been recorded.";
pub const ALREADY_VOTED: &str = "You have already voted for this post.";
pub const ELECTION_CLOSED: &str = "Voting for this election has closed.";
pub const ADMIN_ONLY: &str = "That page is only available to administrators.";
pub const PAGE_NOT_FOUND: &str = "That page could not be found.";
pub const BAD_REQUEST: &str = "That request could not be understood, please try again.";
pub const TRY_AGAIN: &str = "Something went wrong, please try again.";

/// A dismissible notice carried across a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// One of `success`, `warning` or `error`.
    pub kind: String,
    pub message: String,
}

impl From<FlashMessage<'_>> for Notice {
    fn from(flash: FlashMessage<'_>) -> Self {
        Self {
            kind: flash.kind().to_string(),
            message: flash.message().to_string(),
        }
    }
}
