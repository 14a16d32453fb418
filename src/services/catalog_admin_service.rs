use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;

use crate::{
    db::is_foreign_key_violation,
    models::{Category, Product, Region},
    repository::{CategoryInput, MenuRepository, ProductInput, RegionInput, RegionRepository},
    services::menu_service::MenuService,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    InUse(&'static str),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] DbErr),
}

/// Admin writes to categories, products and regions. Every successful write
/// evicts the affected cache snapshots.
#[derive(Clone)]
pub struct CatalogAdminService {
    menu: Arc<dyn MenuRepository>,
    regions: Arc<dyn RegionRepository>,
    reader: MenuService,
}

impl CatalogAdminService {
    pub fn new(
        menu: Arc<dyn MenuRepository>,
        regions: Arc<dyn RegionRepository>,
        reader: MenuService,
    ) -> Self {
        Self {
            menu,
            regions,
            reader,
        }
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, CatalogError> {
        let input = validate_category(input)?;
        let category = self.menu.create_category(input).await?;
        self.reader.invalidate_menu().await;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<Category, CatalogError> {
        let input = validate_category(input)?;
        let category = match self.menu.update_category(id, input).await? {
            Some(c) => c,
            None => return Err(CatalogError::NotFound),
        };
        self.reader.invalidate_menu().await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), CatalogError> {
        if !self.menu.delete_category(id).await? {
            return Err(CatalogError::NotFound);
        }
        self.reader.invalidate_menu().await;
        Ok(())
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let input = validate_product(input)?;
        let product = self
            .menu
            .create_product(input)
            .await
            .map_err(unknown_category)?;
        self.reader.invalidate_menu().await;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: i64,
        input: ProductInput,
    ) -> Result<Product, CatalogError> {
        let input = validate_product(input)?;
        let product = match self
            .menu
            .update_product(id, input)
            .await
            .map_err(unknown_category)?
        {
            Some(p) => p,
            None => return Err(CatalogError::NotFound),
        };
        self.reader.invalidate_menu().await;
        Ok(product)
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        if !self.menu.delete_product(id).await? {
            return Err(CatalogError::NotFound);
        }
        self.reader.invalidate_menu().await;
        Ok(())
    }

    pub async fn create_region(&self, input: RegionInput) -> Result<Region, CatalogError> {
        let input = validate_region(input)?;
        let region = self.regions.create(input).await?;
        self.reader.invalidate_regions().await;
        Ok(region)
    }

    pub async fn update_region(&self, id: i64, input: RegionInput) -> Result<Region, CatalogError> {
        let input = validate_region(input)?;
        let region = match self.regions.update(id, input).await? {
            Some(r) => r,
            None => return Err(CatalogError::NotFound),
        };
        self.reader.invalidate_regions().await;
        Ok(region)
    }

    pub async fn delete_region(&self, id: i64) -> Result<(), CatalogError> {
        let deleted = self.regions.delete(id).await.map_err(|err| {
            if is_foreign_key_violation(&err) {
                CatalogError::InUse("region is referenced by addresses or orders")
            } else {
                CatalogError::Storage(err)
            }
        })?;
        if !deleted {
            return Err(CatalogError::NotFound);
        }
        self.reader.invalidate_regions().await;
        Ok(())
    }
}

fn unknown_category(err: DbErr) -> CatalogError {
    if is_foreign_key_violation(&err) {
        CatalogError::InvalidInput("unknown category")
    } else {
        CatalogError::Storage(err)
    }
}

fn validate_category(mut input: CategoryInput) -> Result<CategoryInput, CatalogError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(CatalogError::InvalidInput("name is required"));
    }
    Ok(input)
}

fn validate_product(mut input: ProductInput) -> Result<ProductInput, CatalogError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(CatalogError::InvalidInput("name is required"));
    }
    if input.category_id <= 0 {
        return Err(CatalogError::InvalidInput("category_id is required"));
    }
    if input.price < Decimal::ZERO || input.old_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(CatalogError::InvalidInput("price must not be negative"));
    }
    Ok(input)
}

fn validate_region(mut input: RegionInput) -> Result<RegionInput, CatalogError> {
    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(CatalogError::InvalidInput("name is required"));
    }
    if input.delivery_price < Decimal::ZERO {
        return Err(CatalogError::InvalidInput("price must not be negative"));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{MENU_KEY, REGIONS_KEY},
        test_support::{InMemoryStore, MemoryCache},
    };
    use rstest::rstest;
    use std::time::Duration;

    fn service() -> (CatalogAdminService, Arc<MemoryCache>) {
        let store = InMemoryStore::new();
        let cache = MemoryCache::new();
        let reader = MenuService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            Duration::from_secs(30),
            Duration::from_secs(30),
        );
        (
            CatalogAdminService::new(store.clone(), store, reader),
            cache,
        )
    }

    fn product(category_id: i64, name: &str, price: Decimal) -> ProductInput {
        ProductInput {
            category_id,
            name: name.into(),
            description: String::new(),
            price,
            old_price: None,
            image_url: String::new(),
            is_active: true,
            sort_order: 0,
        }
    }

    #[rstest]
    #[case(product(1, "  ", Decimal::ONE))]
    #[case(product(0, "Lula", Decimal::ONE))]
    #[case(product(1, "Lula", Decimal::NEGATIVE_ONE))]
    #[tokio::test]
    async fn invalid_products_are_rejected(#[case] input: ProductInput) {
        let (svc, _) = service();
        assert!(matches!(
            svc.create_product(input).await,
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn writes_evict_cached_snapshots() {
        let (svc, cache) = service();
        cache.put_raw(MENU_KEY, "[]");
        cache.put_raw(REGIONS_KEY, "[]");

        let category = svc
            .create_category(CategoryInput {
                name: " Grill ".into(),
                emoji: String::new(),
                sort_order: 0,
                is_active: true,
            })
            .await
            .unwrap();
        assert_eq!(category.name, "Grill");
        assert!(!cache.contains(MENU_KEY));
        assert!(cache.contains(REGIONS_KEY));

        svc.create_region(RegionInput {
            name: "Center".into(),
            delivery_price: Decimal::TEN,
            is_active: true,
        })
        .await
        .unwrap();
        assert!(!cache.contains(REGIONS_KEY));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let (svc, _) = service();
        assert!(matches!(
            svc.delete_product(404).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            svc.update_region(
                404,
                RegionInput {
                    name: "X".into(),
                    delivery_price: Decimal::ZERO,
                    is_active: true,
                }
            )
            .await,
            Err(CatalogError::NotFound)
        ));
    }
}
