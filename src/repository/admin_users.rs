use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};

use crate::{
    db::is_unique_violation,
    entity::admin_users::{ActiveModel as AdminActive, Column as AdminCol, Entity as AdminUsers},
    models::AdminUser,
    repository::AdminUserRepository,
};

#[derive(Clone)]
pub struct SeaAdminUserRepository {
    db: DatabaseConnection,
}

impl SeaAdminUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdminUserRepository for SeaAdminUserRepository {
    async fn ensure_user(&self, username: &str, password_hash: &str) -> Result<bool, DbErr> {
        if self.find_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let inserted = AdminActive {
            id: NotSet,
            username: Set(username.to_string()),
            password_hash: Set(password_hash.to_string()),
            created_at: NotSet,
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(true),
            // Lost a race with another instance creating the same admin.
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUser>, DbErr> {
        let model = AdminUsers::find()
            .filter(AdminCol::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(model.map(|m| AdminUser {
            id: m.id,
            username: m.username,
            password_hash: m.password_hash,
            created_at: m.created_at.with_timezone(&Utc),
        }))
    }
}
