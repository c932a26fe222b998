use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque learner identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque learning resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An explicit rating a learner gave a resource (typically 1-5)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: UserId,
    pub resource_id: ResourceId,
    pub rating: f64,
}

impl Rating {
    pub fn new(user_id: impl Into<String>, resource_id: impl Into<String>, rating: f64) -> Self {
        Self {
            user_id: UserId::new(user_id),
            resource_id: ResourceId::new(resource_id),
            rating,
        }
    }
}

/// True if the user has at least one rating in the set
pub fn has_ratings(user_id: &UserId, ratings: &[Rating]) -> bool {
    ratings.iter().any(|r| &r.user_id == user_id)
}
