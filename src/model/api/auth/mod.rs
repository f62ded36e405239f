mod token;
mod user;

pub use token::{AdminUser, AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{CurrentUser, Role, UserId};

#[cfg(test)]
pub use token::issue;
