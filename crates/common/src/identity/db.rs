use super::{normalize_email, IdentityStore, NewUser, Role, User};
use crate::auth::{blocking, hash_password, verify_password, PasswordPolicy};
use crate::db::models::{
    RoleColumn, RoleEntity, UserActiveModel, UserColumn, UserEntity, UserRecord,
    UserRoleActiveModel, UserRoleEntity,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Identity store backed by the `users`, `roles` and `user_roles` tables.
pub struct DbIdentityStore {
    pool: DbPool,
    policy: PasswordPolicy,
}

impl DbIdentityStore {
    pub fn new(pool: DbPool, policy: PasswordPolicy) -> Self {
        Self { pool, policy }
    }

    async fn to_user<C: ConnectionTrait>(&self, conn: &C, record: UserRecord) -> Result<User> {
        let roles = record
            .find_related(RoleEntity)
            .all(conn)
            .await?
            .iter()
            .filter_map(|role| role.name.parse::<Role>().ok())
            .collect();

        Ok(User {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            phone_number: record.phone_number,
            roles,
        })
    }
}

#[async_trait]
impl IdentityStore for DbIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.pool.read();
        let record = UserEntity::find()
            .filter(UserColumn::Email.eq(normalize_email(email)))
            .one(conn)
            .await?;

        match record {
            Some(record) => Ok(Some(self.to_user(conn, record).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.pool.read();
        match UserEntity::find_by_id(id.to_string()).one(conn).await? {
            Some(record) => Ok(Some(self.to_user(conn, record).await?)),
            None => Ok(None),
        }
    }

    async fn check_password(&self, user: &User, password: &str) -> Result<bool> {
        let Some(record) = UserEntity::find_by_id(user.id.clone())
            .one(self.pool.read())
            .await?
        else {
            return Ok(false);
        };

        let password = password.to_string();
        blocking(move || verify_password(&password, &record.password_hash)).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let conn = self.pool.write();
        let record = insert_user(conn, self.prepare(new_user).await?).await?;

        info!(user_id = %record.id, "User created");
        self.to_user(conn, record).await
    }

    async fn create_with_role(&self, new_user: NewUser, role: Role) -> Result<User> {
        let pending = self.prepare(new_user).await?;

        let txn = self.pool.write().begin().await?;
        let record = insert_user(&txn, pending).await?;
        grant_role(&txn, &record.id, role).await?;
        let user = self.to_user(&txn, record).await?;
        txn.commit().await?;

        info!(user_id = %user.id, role = role.as_str(), "User created");
        Ok(user)
    }

    async fn add_to_role(&self, user_id: &str, role: Role) -> Result<()> {
        grant_role(self.pool.write(), user_id, role).await
    }
}

/// A validated, hashed account waiting to be inserted
struct PendingUser {
    email: String,
    model: UserActiveModel,
}

impl DbIdentityStore {
    /// Policy check, duplicate check and hashing, in that order.
    async fn prepare(&self, new_user: NewUser) -> Result<PendingUser> {
        self.policy.check(&new_user.password)?;

        let email = normalize_email(&new_user.email);
        let existing = UserEntity::find()
            .filter(UserColumn::Email.eq(email.as_str()))
            .one(self.pool.write())
            .await?;
        if existing.is_some() {
            return Err(AppError::DuplicateEmail { email });
        }

        let password = new_user.password;
        let password_hash = blocking(move || hash_password(&password)).await?;

        let model = UserActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email.clone()),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            phone_number: Set(new_user.phone_number),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now().trunc_subsecs(6)),
        };
        Ok(PendingUser { email, model })
    }
}

async fn insert_user<C: ConnectionTrait>(conn: &C, pending: PendingUser) -> Result<UserRecord> {
    let PendingUser { email, model } = pending;
    model.insert(conn).await.map_err(|e| match e.sql_err() {
        // Lost a race with a concurrent registration
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateEmail { email },
        _ => AppError::Database(e),
    })
}

async fn grant_role<C: ConnectionTrait>(conn: &C, user_id: &str, role: Role) -> Result<()> {
    let role_record = RoleEntity::find()
        .filter(RoleColumn::Name.eq(role.as_str()))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Configuration {
            message: format!("Role '{}' has not been seeded", role),
        })?;

    if UserEntity::find_by_id(user_id.to_string()).one(conn).await?.is_none() {
        return Err(AppError::not_found("user", user_id));
    }

    let held = UserRoleEntity::find_by_id((user_id.to_string(), role_record.id))
        .one(conn)
        .await?;
    if held.is_some() {
        return Ok(());
    }

    UserRoleActiveModel {
        user_id: Set(user_id.to_string()),
        role_id: Set(role_record.id),
    }
    .insert(conn)
    .await?;

    debug!(user_id, role = role.as_str(), "Role granted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> DbIdentityStore {
        let pool = DbPool::in_memory().await.unwrap();
        DbIdentityStore::new(pool, PasswordPolicy::default())
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "Str0ng!pw".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            phone_number: Some("555-0100".into()),
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email_and_hashes_password() {
        let store = store().await;
        let user = store.create(new_user("  Grace@Firm.COM")).await.unwrap();
        assert_eq!(user.email, "grace@firm.com");
        assert!(user.roles.is_empty());

        let record = UserEntity::find_by_id(user.id.clone())
            .one(store.pool.read())
            .await
            .unwrap()
            .unwrap();
        assert!(record.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_check_password() {
        let store = store().await;
        let user = store.create(new_user("g@firm.com")).await.unwrap();
        assert!(store.check_password(&user, "Str0ng!pw").await.unwrap());
        assert!(!store.check_password(&user, "Str0ng!px").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = store().await;
        store.create(new_user("g@firm.com")).await.unwrap();
        let err = store.create(new_user("G@FIRM.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn test_policy_checked_before_insert() {
        let store = store().await;
        let mut weak = new_user("w@firm.com");
        weak.password = "password".into();

        let err = store.create(weak).await.unwrap_err();
        match err {
            AppError::PasswordPolicy { violations } => assert_eq!(violations.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.find_by_email("w@firm.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roles_are_loaded_with_the_user() {
        let store = store().await;
        let user = store.create(new_user("g@firm.com")).await.unwrap();
        store.add_to_role(&user.id, Role::Lawyer).await.unwrap();
        store.add_to_role(&user.id, Role::Lawyer).await.unwrap();

        let found = store.find_by_email("g@firm.com").await.unwrap().unwrap();
        assert_eq!(found.roles, vec![Role::Lawyer]);
    }

    #[tokio::test]
    async fn test_create_with_role_in_one_step() {
        let store = store().await;
        let user = store.create_with_role(new_user("g@firm.com"), Role::Lawyer).await.unwrap();
        assert_eq!(user.roles, vec![Role::Lawyer]);

        let found = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found.roles, vec![Role::Lawyer]);
    }

    #[tokio::test]
    async fn test_failed_role_grant_leaves_no_account() {
        let store = store().await;
        RoleEntity::delete_many()
            .filter(RoleColumn::Name.eq(Role::Lawyer.as_str()))
            .exec(store.pool.write())
            .await
            .unwrap();

        let err = store
            .create_with_role(new_user("g@firm.com"), Role::Lawyer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
        assert!(store.find_by_email("g@firm.com").await.unwrap().is_none());

        // Retrying with a seeded role is not blocked by a half-created account
        let user = store.create_with_role(new_user("g@firm.com"), Role::User).await.unwrap();
        assert_eq!(user.roles, vec![Role::User]);
    }

    #[tokio::test]
    async fn test_add_to_role_unknown_user() {
        let store = store().await;
        let err = store.add_to_role("missing", Role::User).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
