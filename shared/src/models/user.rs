//! User model

use serde::{Deserialize, Serialize};

/// Back-office role. Determines the default permission set unless a
/// per-user override exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Operation,
    Manager,
    Staff,
    Internship,
    Freelance,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Operation => "Operation",
            Role::Manager => "Manager",
            Role::Staff => "Staff",
            Role::Internship => "Internship",
            Role::Freelance => "Freelance",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User entity.
///
/// The authentication UI (login, 2FA enrolment) lives outside the core;
/// the fields are persisted here because the permission evaluator and the
/// activity log need the user row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub is_2fa_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
    #[serde(default)]
    pub backup_codes: Vec<String>,
    /// Queue-display counter assignment, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_counter: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
