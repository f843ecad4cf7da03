use super::{normalize_email, IdentityStore, NewUser, Role, User};
use crate::auth::{hash_password, verify_password, PasswordPolicy};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    password_hash: String,
}

/// Identity store kept in a process-local map. Used by tests and local tooling.
pub struct InMemoryIdentityStore {
    users: RwLock<HashMap<String, StoredUser>>,
    policy: PasswordPolicy,
}

impl InMemoryIdentityStore {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            policy,
        }
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new(PasswordPolicy::default())
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|stored| stored.user.email == email)
            .map(|stored| stored.user.clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).map(|stored| stored.user.clone()))
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool> {
        let users = self.users.read().await;
        match users.get(&user.id) {
            Some(stored) => verify_password(password, &stored.password_hash),
            None => Ok(false),
        }
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        self.insert(new_user, Vec::new()).await
    }

    async fn create_with_role(&self, new_user: NewUser, role: Role) -> Result<User> {
        self.insert(new_user, vec![role]).await
    }

    async fn add_to_role(&self, user_id: &str, role: Role) -> Result<()> {
        let mut users = self.users.write().await;
        let stored = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found("user", user_id))?;
        if !stored.user.roles.contains(&role) {
            stored.user.roles.push(role);
        }
        Ok(())
    }
}

impl InMemoryIdentityStore {
    async fn insert(&self, new_user: NewUser, roles: Vec<Role>) -> Result<User> {
        self.policy.check(&new_user.password)?;

        let email = normalize_email(&new_user.email);
        let password_hash = hash_password(&new_user.password)?;

        let mut users = self.users.write().await;
        if users.values().any(|stored| stored.user.email == email) {
            return Err(AppError::DuplicateEmail { email });
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone_number: new_user.phone_number,
            roles,
        };
        users.insert(
            user.id.clone(),
            StoredUser {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryIdentityStore::default();
        let user = store.create(new_user("Ada@Firm.com", "Str0ng!pw")).await.unwrap();
        assert_eq!(user.email, "ada@firm.com");

        let found = store.find_by_email("ADA@firm.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.check_password(&found, "Str0ng!pw").await.unwrap());
        assert!(!store.check_password(&found, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = InMemoryIdentityStore::default();
        store.create(new_user("a@x.com", "Str0ng!pw")).await.unwrap();
        let err = store.create(new_user("A@X.com", "Str0ng!pw")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let store = InMemoryIdentityStore::default();
        let err = store.create(new_user("a@x.com", "weak")).await.unwrap_err();
        assert!(matches!(err, AppError::PasswordPolicy { .. }));
        assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_to_role_is_idempotent() {
        let store = InMemoryIdentityStore::default();
        let user = store.create(new_user("a@x.com", "Str0ng!pw")).await.unwrap();
        store.add_to_role(&user.id, Role::User).await.unwrap();
        store.add_to_role(&user.id, Role::User).await.unwrap();

        let found = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.roles, vec![Role::User]);
    }
}
