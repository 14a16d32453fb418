use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::{
    entity::{
        categories::{
            ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories,
            Model as CategoryModel,
        },
        products::{
            ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
            Model as ProductModel,
        },
    },
    models::{Category, Product},
    repository::{CategoryInput, MenuRepository, ProductInput},
};

#[derive(Clone)]
pub struct SeaMenuRepository {
    db: DatabaseConnection,
}

impl SeaMenuRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MenuRepository for SeaMenuRepository {
    async fn list_active_categories(&self) -> Result<Vec<Category>, DbErr> {
        let categories = Categories::find()
            .filter(CategoryCol::IsActive.eq(true))
            .order_by_asc(CategoryCol::SortOrder)
            .order_by_asc(CategoryCol::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(categories)
    }

    async fn list_active_products(&self) -> Result<Vec<Product>, DbErr> {
        let products = Products::find()
            .filter(ProductCol::IsActive.eq(true))
            .order_by_asc(ProductCol::SortOrder)
            .order_by_asc(ProductCol::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(products)
    }

    async fn find_active_products(&self, ids: &[i64]) -> Result<HashMap<i64, Product>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let products = Products::find()
            .filter(ProductCol::Id.is_in(ids.iter().copied()))
            .filter(ProductCol::IsActive.eq(true))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, product_from_entity(m)))
            .collect();
        Ok(products)
    }

    async fn create_category(&self, input: CategoryInput) -> Result<Category, DbErr> {
        let model = CategoryActive {
            id: NotSet,
            name: Set(input.name),
            emoji: Set(input.emoji),
            sort_order: Set(input.sort_order),
            is_active: Set(input.is_active),
        }
        .insert(&self.db)
        .await?;
        Ok(category_from_entity(model))
    }

    async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<Option<Category>, DbErr> {
        let existing = match Categories::find_by_id(id).one(&self.db).await? {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut active: CategoryActive = existing.into();
        active.name = Set(input.name);
        active.emoji = Set(input.emoji);
        active.sort_order = Set(input.sort_order);
        active.is_active = Set(input.is_active);
        let model = active.update(&self.db).await?;
        Ok(Some(category_from_entity(model)))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, DbErr> {
        let res = Categories::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn create_product(&self, input: ProductInput) -> Result<Product, DbErr> {
        let model = ProductActive {
            id: NotSet,
            category_id: Set(input.category_id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            old_price: Set(input.old_price),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active),
            sort_order: Set(input.sort_order),
        }
        .insert(&self.db)
        .await?;
        Ok(product_from_entity(model))
    }

    async fn update_product(&self, id: i64, input: ProductInput) -> Result<Option<Product>, DbErr> {
        let existing = match Products::find_by_id(id).one(&self.db).await? {
            Some(p) => p,
            None => return Ok(None),
        };
        let mut active: ProductActive = existing.into();
        active.category_id = Set(input.category_id);
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.price = Set(input.price);
        active.old_price = Set(input.old_price);
        active.image_url = Set(input.image_url);
        active.is_active = Set(input.is_active);
        active.sort_order = Set(input.sort_order);
        let model = active.update(&self.db).await?;
        Ok(Some(product_from_entity(model)))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, DbErr> {
        let res = Products::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }
}

pub fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        emoji: model.emoji,
        sort_order: model.sort_order,
        is_active: model.is_active,
    }
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        category_id: model.category_id,
        name: model.name,
        description: model.description,
        price: model.price,
        old_price: model.old_price,
        image_url: model.image_url,
        is_active: model.is_active,
        sort_order: model.sort_order,
    }
}
