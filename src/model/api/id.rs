use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An API-friendly ID that serializes to a hex string rather than a nested struct.
/// This is needed for any struct that gets serialized into an API *response*,
/// and lets request bodies carry plain strings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ApiId(Id);

impl Debug for ApiId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for ApiId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiId {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<Id>()?))
    }
}

impl TryFrom<String> for ApiId {
    type Error = mongodb::bson::oid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ApiId> for String {
    fn from(id: ApiId) -> Self {
        id.to_string()
    }
}

impl From<Id> for ApiId {
    fn from(id: Id) -> Self {
        Self(id)
    }
}

impl From<ApiId> for Id {
    fn from(id: ApiId) -> Self {
        id.0
    }
}

impl Deref for ApiId {
    type Target = Id;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json;

    use super::*;

    #[test]
    fn serializes_as_a_plain_string() {
        let id = ApiId::from(Id::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(format!("\"{id}\""), json);
        assert_eq!(id, serde_json::from_str::<ApiId>(&json).unwrap());
        assert!(serde_json::from_str::<ApiId>("\"nope\"").is_err());
    }
}
