use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, DatabaseConnection, DbErr, EntityTrait, Set,
    sea_query::{Expr, OnConflict},
};

use crate::{
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    models::User,
    repository::{TelegramProfile, UserRepository},
};

#[derive(Clone)]
pub struct SeaUserRepository {
    db: DatabaseConnection,
}

impl SeaUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SeaUserRepository {
    async fn upsert_telegram_user(&self, profile: TelegramProfile) -> Result<User, DbErr> {
        let active = UserActive {
            id: NotSet,
            telegram_id: Set(profile.telegram_id),
            first_name: Set(profile.first_name),
            last_name: Set(profile.last_name),
            username: Set(profile.username),
            phone: Set(profile.phone),
            language: Set(profile.language),
            latitude: Set(profile.latitude),
            longitude: Set(profile.longitude),
            created_at: NotSet,
        };

        let on_conflict = OnConflict::column(UserCol::TelegramId)
            .update_columns([
                UserCol::FirstName,
                UserCol::LastName,
                UserCol::Username,
                UserCol::Language,
            ])
            .value(
                UserCol::Phone,
                Expr::cust("COALESCE(NULLIF(excluded.phone, ''), users.phone)"),
            )
            .value(
                UserCol::Latitude,
                Expr::cust("COALESCE(excluded.latitude, users.latitude)"),
            )
            .value(
                UserCol::Longitude,
                Expr::cust("COALESCE(excluded.longitude, users.longitude)"),
            )
            .to_owned();

        let model = Users::insert(active)
            .on_conflict(on_conflict)
            .exec_with_returning(&self.db)
            .await?;
        Ok(user_from_entity(model))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbErr> {
        let model = Users::find_by_id(id).one(&self.db).await?;
        Ok(model.map(user_from_entity))
    }
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        telegram_id: model.telegram_id,
        first_name: model.first_name,
        last_name: model.last_name,
        username: model.username,
        phone: model.phone,
        language: model.language,
        latitude: model.latitude,
        longitude: model.longitude,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
