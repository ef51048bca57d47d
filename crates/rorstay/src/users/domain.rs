use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
    Agent,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Agent => "agent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    /// Roles allowed to manage listings and respond to inquiries.
    pub const fn is_staff(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Agent)
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account as persisted, carrying the password hash that never leaves the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub hashed_password: String,
}

impl StoredUser {
    pub fn public(&self) -> &User {
        &self.user
    }

    pub fn into_public(self) -> User {
        self.user
    }
}
