//! Table creation and reference data.
//!
//! Tables are derived from the entity definitions, so foreign keys carry the
//! delete behaviour declared on each relation. Creation is idempotent.

use super::models::{
    CaseEntity, DocumentEntity, MessageEntity, NotificationEntity, RoleActiveModel, RoleColumn,
    RoleEntity, UserEntity, UserRoleEntity,
};
use crate::errors::Result;
use crate::identity::Role;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityName, EntityTrait,
    QueryFilter, Schema, Set,
};
use tracing::{debug, info};

/// Create every table that does not exist yet, then seed the roles.
pub async fn create_schema(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    // Referenced tables first
    create_table(db, &schema, RoleEntity).await?;
    create_table(db, &schema, UserEntity).await?;
    create_table(db, &schema, UserRoleEntity).await?;
    create_table(db, &schema, CaseEntity).await?;
    create_table(db, &schema, DocumentEntity).await?;
    create_table(db, &schema, MessageEntity).await?;
    create_table(db, &schema, NotificationEntity).await?;

    seed_roles(db).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()> {
    let backend = db.get_database_backend();
    let table = entity.table_name().to_string();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    db.execute(backend.build(&stmt)).await?;
    debug!(table = %table, "Table ensured");
    Ok(())
}

/// Insert any of the fixed roles that are missing.
pub async fn seed_roles(db: &DatabaseConnection) -> Result<()> {
    for role in Role::ALL {
        let existing = RoleEntity::find()
            .filter(RoleColumn::Name.eq(role.as_str()))
            .one(db)
            .await?;

        if existing.is_none() {
            RoleActiveModel {
                name: Set(role.as_str().to_string()),
                normalized_name: Set(role.as_str().to_uppercase()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!(role = role.as_str(), "Seeded role");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = DbPool::in_memory().await.unwrap();

        create_schema(pool.write()).await.unwrap();

        let roles = RoleEntity::find().count(pool.read()).await.unwrap();
        assert_eq!(roles, 3);
    }

    #[tokio::test]
    async fn test_roles_are_seeded_with_normalized_names() {
        let pool = DbPool::in_memory().await.unwrap();

        let admin = RoleEntity::find()
            .filter(RoleColumn::Name.eq("Admin"))
            .one(pool.read())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.normalized_name, "ADMIN");
    }
}
