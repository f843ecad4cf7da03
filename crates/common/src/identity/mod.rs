//! User identities and role membership
//!
//! Provides:
//! - The fixed `Role` set
//! - The `IdentityStore` seam used by login and registration
//! - A SeaORM-backed store and an in-memory store for tests
//!
//! Emails are compared in normalized form (trimmed, lowercased).

mod db;
mod memory;

pub use self::db::DbIdentityStore;
pub use self::memory::InMemoryIdentityStore;

use crate::dto::UserProfile;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Lawyer,
    User,
}

impl Role {
    /// Every role, in seeding order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Lawyer, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Lawyer => "Lawyer",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Configuration {
                message: format!("Unknown role '{}'", s),
            })
    }
}

/// A user as seen by the rest of the application. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
        }
    }
}

/// Account to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Storage of user identities and credentials.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up a user by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Check a plaintext password against the stored hash.
    async fn check_password(&self, user: &User, password: &str) -> Result<bool>;

    /// Create an account. Fails with `PasswordPolicy` when the password is
    /// too weak and `DuplicateEmail` when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Create an account holding `role`. Either both land or neither does.
    async fn create_with_role(&self, new_user: NewUser, role: Role) -> Result<User>;

    /// Grant a role. Granting a held role is a no-op.
    async fn add_to_role(&self, user_id: &str, role: Role) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("lawyer".parse::<Role>().unwrap(), Role::Lawyer);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert!("Partner".parse::<Role>().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Firm.COM "), "jane.doe@firm.com");
    }

    #[test]
    fn test_profile_lists_role_names() {
        let user = User {
            id: "u1".into(),
            email: "a@x.com".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            phone_number: None,
            roles: vec![Role::Lawyer, Role::User],
        };
        assert!(user.has_role(Role::Lawyer));
        assert!(!user.has_role(Role::Admin));

        let profile = UserProfile::from(user);
        assert_eq!(profile.roles, vec!["Lawyer", "User"]);
    }
}
