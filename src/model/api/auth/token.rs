use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, TokenData, Validation};
use rocket::{
    http::Status,
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;

use super::user::{CurrentUser, Role, UserId};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// The claims we rely on from a token signed by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "sub")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    pub expire_at: DateTime<Utc>,
}

impl AuthToken {
    /// Verify and decode a raw token.
    pub fn decode(raw: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            raw,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Self>| data.claims)?;
        Ok(token)
    }

    pub fn into_user(self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            name: self.name,
            role: self.role,
        }
    }
}

/// Find the raw token: the cookie takes precedence over a bearer header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = Error;

    /// Get the current user from a verified token.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let user = raw_token(req)
            .ok_or(Error::NotAuthenticated)
            .and_then(|raw| AuthToken::decode(&raw, config))
            .map(AuthToken::into_user);

        match user {
            Ok(user) => Outcome::Success(user),
            Err(e) => {
                debug!("Rejecting unauthenticated request: {e}");
                Outcome::Failure((Status::Unauthorized, Error::NotAuthenticated))
            }
        }
    }
}

/// A user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = try_outcome!(req.guard::<CurrentUser>().await);
        Some(user)
            .filter(|user| user.has_role(Role::Admin))
            .map(AdminUser)
            .into_outcome((Status::Forbidden, Error::Forbidden))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_what_the_provider_signed() {
        let config = Config::example();
        let user = CurrentUser::admin_example();
        let raw = issue::token_for(&user, &config);
        let decoded = AuthToken::decode(&raw, &config).unwrap().into_user();
        assert_eq!(user, decoded);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let raw = issue::token_for(&CurrentUser::voter_example(), &Config::example());
        let other = Config::example_with_secret("a different secret");
        assert!(AuthToken::decode(&raw, &other).is_err());
    }
}
