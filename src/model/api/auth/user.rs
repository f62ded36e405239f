use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A user ID, as assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Different privilege levels.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Voter,
    Admin,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// The authenticated user making the current request.
///
/// Users are owned by the identity provider; this is a read-only view of the
/// claims it signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Does this user hold the given role?
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_capability_check() {
        assert!(CurrentUser::admin_example().has_role(Role::Admin));
        assert!(!CurrentUser::admin_example().has_role(Role::Voter));
        assert!(CurrentUser::voter_example().has_role(Role::Voter));
    }
}
