//! SeaORM entity models
//!
//! Database entities for Casebook

pub(crate) mod case;
pub(crate) mod document;
pub(crate) mod message;
pub(crate) mod notification;
pub(crate) mod role;
pub(crate) mod user;
pub(crate) mod user_role;

pub use user::{
    Entity as UserEntity,
    Model as UserRecord,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use role::{
    Entity as RoleEntity,
    Model as RoleRecord,
    ActiveModel as RoleActiveModel,
    Column as RoleColumn,
};

pub use user_role::{
    Entity as UserRoleEntity,
    Model as UserRoleRecord,
    ActiveModel as UserRoleActiveModel,
    Column as UserRoleColumn,
};

pub use case::{
    Entity as CaseEntity,
    Model as CaseRecord,
    ActiveModel as CaseActiveModel,
    Column as CaseColumn,
};

pub use document::{
    Entity as DocumentEntity,
    Model as DocumentRecord,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use message::{
    Entity as MessageEntity,
    Model as MessageRecord,
    ActiveModel as MessageActiveModel,
    Column as MessageColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as NotificationRecord,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
};
