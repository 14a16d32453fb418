use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::{
    entity::regions::{
        ActiveModel as RegionActive, Column as RegionCol, Entity as Regions, Model as RegionModel,
    },
    models::Region,
    repository::{RegionInput, RegionRepository},
};

#[derive(Clone)]
pub struct SeaRegionRepository {
    db: DatabaseConnection,
}

impl SeaRegionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegionRepository for SeaRegionRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Region>, DbErr> {
        let model = Regions::find_by_id(id).one(&self.db).await?;
        Ok(model.map(region_from_entity))
    }

    async fn list_active(&self) -> Result<Vec<Region>, DbErr> {
        let regions = Regions::find()
            .filter(RegionCol::IsActive.eq(true))
            .order_by_asc(RegionCol::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(region_from_entity)
            .collect();
        Ok(regions)
    }

    async fn create(&self, input: RegionInput) -> Result<Region, DbErr> {
        let model = RegionActive {
            id: NotSet,
            name: Set(input.name),
            delivery_price: Set(input.delivery_price),
            is_active: Set(input.is_active),
        }
        .insert(&self.db)
        .await?;
        Ok(region_from_entity(model))
    }

    async fn update(&self, id: i64, input: RegionInput) -> Result<Option<Region>, DbErr> {
        let existing = match Regions::find_by_id(id).one(&self.db).await? {
            Some(r) => r,
            None => return Ok(None),
        };
        let mut active: RegionActive = existing.into();
        active.name = Set(input.name);
        active.delivery_price = Set(input.delivery_price);
        active.is_active = Set(input.is_active);
        let model = active.update(&self.db).await?;
        Ok(Some(region_from_entity(model)))
    }

    async fn delete(&self, id: i64) -> Result<bool, DbErr> {
        let res = Regions::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}

pub fn region_from_entity(model: RegionModel) -> Region {
    Region {
        id: model.id,
        name: model.name,
        delivery_price: model.delivery_price,
        is_active: model.is_active,
    }
}
