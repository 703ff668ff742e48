use serde::{Deserialize, Serialize};

/// Subject roles, persisted in the store.
///
/// The role gate re-reads the role from here on every request; the role hint
/// inside a bearer token is never trusted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Administrator,
    Customer,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Administrator => "administrator",
            Role::Customer => "customer",
            Role::Developer => "developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Role::Owner),
            "administrator" => Some(Role::Administrator),
            "customer" => Some(Role::Customer),
            "developer" => Some(Role::Developer),
            _ => None,
        }
    }

    /// Whether a subject holding this role passes a gate requiring `required`.
    /// Owner satisfies every check.
    pub fn satisfies(&self, required: Role) -> bool {
        matches!(self, Role::Owner) || *self == required
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or(())
    }
}

/// A stored subject (dashboard user or bot operator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub role: Role,
}

/// Per-request authenticated subject, resolved from a verified token plus a
/// store lookup. Attached to the request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: String,
    pub role: Role,
}
