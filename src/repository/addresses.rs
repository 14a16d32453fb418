use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};

use crate::{
    entity::addresses::{
        ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses,
        Model as AddressModel,
    },
    models::Address,
    repository::{AddressInput, AddressRepository},
};

#[derive(Clone)]
pub struct SeaAddressRepository {
    db: DatabaseConnection,
}

impl SeaAddressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn clear_default<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<(), DbErr> {
    Addresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .filter(AddressCol::UserId.eq(user_id))
        .filter(AddressCol::IsDefault.eq(true))
        .exec(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl AddressRepository for SeaAddressRepository {
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Address>, DbErr> {
        let addresses = Addresses::find()
            .filter(AddressCol::UserId.eq(user_id))
            .order_by_desc(AddressCol::IsDefault)
            .order_by_desc(AddressCol::CreatedAt)
            .order_by_desc(AddressCol::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(address_from_entity)
            .collect();
        Ok(addresses)
    }

    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Address>, DbErr> {
        let model = Addresses::find_by_id(id)
            .filter(AddressCol::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(model.map(address_from_entity))
    }

    async fn create(&self, user_id: i64, input: AddressInput) -> Result<Address, DbErr> {
        let txn = self.db.begin().await?;
        if input.is_default {
            clear_default(&txn, user_id).await?;
        }

        let model = AddressActive {
            id: NotSet,
            user_id: Set(user_id),
            region_id: Set(input.region_id),
            street: Set(input.street),
            house: Set(input.house),
            entrance: Set(input.entrance),
            flat: Set(input.flat),
            comment: Set(input.comment),
            is_default: Set(input.is_default),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(address_from_entity(model))
    }

    async fn update(
        &self,
        id: i64,
        user_id: i64,
        input: AddressInput,
    ) -> Result<Option<Address>, DbErr> {
        let txn = self.db.begin().await?;
        let existing = Addresses::find_by_id(id)
            .filter(AddressCol::UserId.eq(user_id))
            .one(&txn)
            .await?;
        let existing = match existing {
            Some(a) => a,
            None => return Ok(None),
        };

        if input.is_default {
            clear_default(&txn, user_id).await?;
        }

        let mut active: AddressActive = existing.into();
        active.region_id = Set(input.region_id);
        active.street = Set(input.street);
        active.house = Set(input.house);
        active.entrance = Set(input.entrance);
        active.flat = Set(input.flat);
        active.comment = Set(input.comment);
        active.is_default = Set(input.is_default);
        let model = active.update(&txn).await?;

        txn.commit().await?;
        Ok(Some(address_from_entity(model)))
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, DbErr> {
        let res = Addresses::delete_many()
            .filter(AddressCol::Id.eq(id))
            .filter(AddressCol::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }
}

pub fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        region_id: model.region_id,
        street: model.street,
        house: model.house,
        entrance: model.entrance,
        flat: model.flat,
        comment: model.comment,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
