//! Cached public reads of the menu and the regions list.

use std::{sync::Arc, time::Duration};

use sea_orm::DbErr;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    cache::{Cache, MENU_KEY, REGIONS_KEY},
    models::{Category, MenuCategory, Product, Region},
    repository::{MenuRepository, RegionRepository},
};

#[derive(Clone)]
pub struct MenuService {
    menu: Arc<dyn MenuRepository>,
    regions: Arc<dyn RegionRepository>,
    cache: Arc<dyn Cache>,
    menu_ttl: Duration,
    regions_ttl: Duration,
}

impl MenuService {
    pub fn new(
        menu: Arc<dyn MenuRepository>,
        regions: Arc<dyn RegionRepository>,
        cache: Arc<dyn Cache>,
        menu_ttl: Duration,
        regions_ttl: Duration,
    ) -> Self {
        Self {
            menu,
            regions,
            cache,
            menu_ttl,
            regions_ttl,
        }
    }

    pub async fn get_menu(&self) -> Result<Vec<MenuCategory>, DbErr> {
        if let Some(menu) = self.read_cached::<Vec<MenuCategory>>(MENU_KEY).await {
            return Ok(menu);
        }
        let categories = self.menu.list_active_categories().await?;
        let products = self.menu.list_active_products().await?;
        let menu = build_menu(categories, products);
        self.write_cached(MENU_KEY, &menu, self.menu_ttl).await;
        Ok(menu)
    }

    pub async fn get_regions(&self) -> Result<Vec<Region>, DbErr> {
        if let Some(regions) = self.read_cached::<Vec<Region>>(REGIONS_KEY).await {
            return Ok(regions);
        }
        let regions = self.regions.list_active().await?;
        self.write_cached(REGIONS_KEY, &regions, self.regions_ttl).await;
        Ok(regions)
    }

    pub async fn invalidate_menu(&self) {
        self.evict(MENU_KEY).await;
    }

    /// Drops both the regions and the menu snapshot.
    pub async fn invalidate_regions(&self) {
        self.evict(REGIONS_KEY).await;
        self.evict(MENU_KEY).await;
    }

    async fn evict(&self, key: &str) {
        if let Err(err) = self.cache.delete(key).await {
            tracing::warn!(error = %err, key, "cache invalidation failed");
        }
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, key, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, key, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write_cached<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, key, "cache encode failed");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, &raw, ttl).await {
            tracing::warn!(error = %err, key, "cache write failed");
        }
    }
}

/// Groups products under their categories. Both inputs are expected to be
/// active and already sorted; products of unknown categories are dropped.
pub fn build_menu(categories: Vec<Category>, products: Vec<Product>) -> Vec<MenuCategory> {
    let mut menu: Vec<MenuCategory> = categories
        .into_iter()
        .map(|c| MenuCategory {
            id: c.id,
            name: c.name,
            emoji: c.emoji,
            sort_order: c.sort_order,
            products: Vec::new(),
        })
        .collect();

    for product in products {
        if let Some(category) = menu.iter_mut().find(|c| c.id == product.category_id) {
            category.products.push(product);
        }
    }
    menu
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryStore, MemoryCache};
    use rust_decimal::Decimal;

    fn category(id: i64, sort_order: i32) -> Category {
        Category {
            id,
            name: format!("c{id}"),
            emoji: String::new(),
            sort_order,
            is_active: true,
        }
    }

    fn product(id: i64, category_id: i64) -> Product {
        Product {
            id,
            category_id,
            name: format!("p{id}"),
            description: String::new(),
            price: Decimal::ONE,
            old_price: None,
            image_url: String::new(),
            is_active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn build_menu_groups_and_drops_orphans() {
        let menu = build_menu(
            vec![category(2, 0), category(1, 1)],
            vec![product(10, 1), product(11, 2), product(12, 99), product(13, 1)],
        );
        assert_eq!(menu.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(
            menu[1].products.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![10, 13]
        );
        assert_eq!(menu[0].products.len(), 1);
    }

    #[tokio::test]
    async fn cached_snapshot_is_served_without_touching_storage() {
        let store = InMemoryStore::new();
        let cache = MemoryCache::new();
        let c = store.add_category("Grill", 0, true);
        store.add_product(c.id, "Shashlik", Decimal::TEN, true);
        store.add_region("Center", Decimal::ONE, true);
        let svc = MenuService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            Duration::from_secs(30),
            Duration::from_secs(45),
        );

        assert_eq!(svc.get_menu().await.unwrap()[0].products.len(), 1);
        assert_eq!(svc.get_regions().await.unwrap().len(), 1);
        assert_eq!(cache.ttl(MENU_KEY), Some(Duration::from_secs(30)));
        assert_eq!(cache.ttl(REGIONS_KEY), Some(Duration::from_secs(45)));

        store.fail_reads(true);
        assert!(svc.get_menu().await.is_ok());
        assert!(svc.get_regions().await.is_ok());

        svc.invalidate_regions().await;
        assert!(!cache.contains(MENU_KEY));
        assert!(!cache.contains(REGIONS_KEY));
        assert!(svc.get_menu().await.is_err());
    }
}
