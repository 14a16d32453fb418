//! Order placement, history and administration.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    metrics::AppMetrics,
    models::{Order, OrderStatus, OrderType},
    notifications::Notifier,
    repository::{
        AddressRepository, InsertOutcome, MenuRepository, NewOrder, NewOrderItem, OrderFilter,
        OrderRepository, RegionRepository, UserRepository,
    },
};

pub const USER_ORDER_LIMIT: u64 = 50;
pub const ADMIN_DEFAULT_LIMIT: u64 = 100;
pub const ADMIN_MAX_LIMIT: u64 = 500;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("client_request_id must be a UUID")]
    InvalidClientRequestId,
    #[error("items must not be empty")]
    EmptyItems,
    #[error("qty must be a positive integer")]
    InvalidQuantity,
    #[error("type must be delivery or pickup")]
    InvalidOrderType,
    #[error("address is required for delivery")]
    AddressRequired,
    #[error("payment method is required")]
    MissingPaymentMethod,
    #[error("invalid region")]
    InvalidRegion,
    #[error("invalid address")]
    InvalidAddress,
    #[error("product not found or inactive")]
    ProductNotFound,
    #[error("client_request_id is already used by another order")]
    IdempotencyConflict,
    #[error("invalid status")]
    InvalidStatus,
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: i64,
    pub qty: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrderInput {
    pub client_request_id: String,
    pub order_type: String,
    pub payment_method: String,
    pub region_id: i64,
    /// Zero means no address.
    pub address_id: i64,
    pub comment: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// False when an earlier request with the same key is being replayed.
    pub created: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AdminOrderQuery {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    regions: Arc<dyn RegionRepository>,
    menu: Arc<dyn MenuRepository>,
    addresses: Arc<dyn AddressRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    metrics: AppMetrics,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        regions: Arc<dyn RegionRepository>,
        menu: Arc<dyn MenuRepository>,
        addresses: Arc<dyn AddressRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        metrics: AppMetrics,
    ) -> Self {
        Self {
            orders,
            regions,
            menu,
            addresses,
            users,
            notifier,
            metrics,
        }
    }

    pub async fn create(
        &self,
        user_id: i64,
        input: CreateOrderInput,
    ) -> Result<PlacedOrder, OrderError> {
        let key = Uuid::parse_str(input.client_request_id.trim())
            .map_err(|_| OrderError::InvalidClientRequestId)?;
        if input.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }
        if input.items.iter().any(|line| line.qty <= 0) {
            return Err(OrderError::InvalidQuantity);
        }
        let order_type: OrderType = input
            .order_type
            .parse()
            .map_err(|_| OrderError::InvalidOrderType)?;
        if order_type == OrderType::Delivery && input.address_id == 0 {
            return Err(OrderError::AddressRequired);
        }
        let payment_method = input.payment_method.trim().to_string();
        if payment_method.is_empty() {
            return Err(OrderError::MissingPaymentMethod);
        }

        let region = match self.regions.find_by_id(input.region_id).await? {
            Some(r) if r.is_active => r,
            _ => return Err(OrderError::InvalidRegion),
        };

        let address_id = if input.address_id != 0 {
            match self
                .addresses
                .find_for_user(input.address_id, user_id)
                .await?
            {
                Some(a) => Some(a.id),
                None => return Err(OrderError::InvalidAddress),
            }
        } else {
            None
        };

        let lines = merge_lines(&input.items)?;
        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products = self.menu.find_active_products(&ids).await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut items_total = Decimal::ZERO;
        for line in &lines {
            let product = match products.get(&line.product_id) {
                Some(p) => p,
                None => {
                    tracing::debug!(product_id = line.product_id, "order references unknown product");
                    return Err(OrderError::ProductNotFound);
                }
            };
            let total = product.price * Decimal::from(line.qty);
            items_total += total;
            items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                qty: line.qty,
                price: product.price,
                total,
            });
        }

        let delivery_price = match order_type {
            OrderType::Delivery => region.delivery_price,
            OrderType::Pickup => Decimal::ZERO,
        };

        let outcome = self
            .orders
            .insert(NewOrder {
                client_request_id: key,
                user_id,
                address_id,
                order_type,
                payment_method,
                region_id: region.id,
                delivery_price,
                items_total,
                total_price: items_total + delivery_price,
                comment: input.comment.trim().to_string(),
                customer_name: input.customer_name.trim().to_string(),
                customer_phone: input.customer_phone.trim().to_string(),
                items,
            })
            .await?;

        let order = match outcome {
            InsertOutcome::Inserted(order) => order,
            InsertOutcome::DuplicateKey => {
                let existing = self.orders.find_by_client_request_id(key).await?;
                return match existing {
                    Some(order) if order.user_id == user_id => {
                        tracing::debug!(order_id = order.id, "replaying order for repeated key");
                        Ok(PlacedOrder {
                            order,
                            created: false,
                        })
                    }
                    Some(_) => Err(OrderError::IdempotencyConflict),
                    None => Err(OrderError::Storage(DbErr::RecordNotFound(format!(
                        "order with client_request_id {key}"
                    )))),
                };
            }
        };

        self.metrics.order_created();
        tracing::info!(order_id = order.id, user_id, total = %order.total_price, "order created");
        self.notify_created(&order).await;

        Ok(PlacedOrder {
            order,
            created: true,
        })
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Order>, OrderError> {
        Ok(self
            .orders
            .list_by_user(user_id, USER_ORDER_LIMIT)
            .await?)
    }

    pub async fn get(&self, user_id: i64, order_id: i64) -> Result<Order, OrderError> {
        match self.orders.find_for_user(order_id, user_id).await? {
            Some(order) => Ok(order),
            None => Err(OrderError::NotFound),
        }
    }

    pub async fn list_admin(&self, query: AdminOrderQuery) -> Result<Vec<Order>, OrderError> {
        let filter = admin_filter(query)?;
        Ok(self.orders.list_admin(filter).await?)
    }

    pub async fn update_status(&self, order_id: i64, status: &str) -> Result<Order, OrderError> {
        let status: OrderStatus = status.parse().map_err(|_| OrderError::InvalidStatus)?;
        let order = match self.orders.update_status(order_id, status).await? {
            Some(o) => o,
            None => return Err(OrderError::NotFound),
        };
        tracing::info!(order_id, status = %status, "order status updated");
        self.notify_status(&order).await;
        Ok(order)
    }

    async fn telegram_chat(&self, user_id: i64) -> Option<i64> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) if user.telegram_id != 0 => Some(user.telegram_id),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, user_id, "user lookup for notification failed");
                None
            }
        }
    }

    async fn notify_created(&self, order: &Order) {
        let Some(chat_id) = self.telegram_chat(order.user_id).await else {
            return;
        };
        if let Err(err) = self.notifier.order_created(order, chat_id).await {
            tracing::warn!(error = %err, order_id = order.id, "order notification failed");
        }
    }

    async fn notify_status(&self, order: &Order) {
        let Some(chat_id) = self.telegram_chat(order.user_id).await else {
            return;
        };
        if let Err(err) = self.notifier.order_status_changed(order, chat_id).await {
            tracing::warn!(error = %err, order_id = order.id, "status notification failed");
        }
    }
}

/// Sums quantities of repeated products, keeping first-appearance order.
pub fn merge_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, OrderError> {
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    let mut index: HashMap<i64, usize> = HashMap::new();
    for line in lines {
        match index.get(&line.product_id) {
            Some(&i) => {
                merged[i].qty = merged[i]
                    .qty
                    .checked_add(line.qty)
                    .ok_or(OrderError::InvalidQuantity)?;
            }
            None => {
                index.insert(line.product_id, merged.len());
                merged.push(line.clone());
            }
        }
    }
    Ok(merged)
}

fn admin_filter(query: AdminOrderQuery) -> Result<OrderFilter, OrderError> {
    let status = match query.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(s.parse().map_err(|_| OrderError::InvalidStatus)?),
        _ => None,
    };
    let limit = match query.limit {
        Some(l) if l > 0 => (l as u64).min(ADMIN_MAX_LIMIT),
        _ => ADMIN_DEFAULT_LIMIT,
    };
    Ok(OrderFilter {
        status,
        from: parse_time("from", query.from.as_deref())?,
        to: parse_time("to", query.to.as_deref())?,
        limit,
        offset: query.offset.unwrap_or(0).max(0) as u64,
    })
}

fn parse_time(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, OrderError> {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => DateTime::parse_from_rfc3339(s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| OrderError::InvalidFilter(format!("{name} must be an RFC 3339 timestamp"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notifications::{MockNotifier, NotifyError},
        test_support::InMemoryStore,
    };
    use rust_decimal_macros::dec;

    fn line(product_id: i64, qty: i32) -> OrderLine {
        OrderLine { product_id, qty }
    }

    #[test]
    fn merge_keeps_first_appearance_order() {
        let merged = merge_lines(&[line(3, 1), line(1, 2), line(3, 4)]).unwrap();
        assert_eq!(merged, vec![line(3, 5), line(1, 2)]);
    }

    #[test]
    fn merge_overflow_is_invalid_quantity() {
        let err = merge_lines(&[line(1, i32::MAX), line(1, 1)]).unwrap_err();
        assert!(matches!(err, OrderError::InvalidQuantity));
    }

    #[test]
    fn admin_limit_defaults_and_clamps() {
        let f = admin_filter(AdminOrderQuery::default()).unwrap();
        assert_eq!((f.limit, f.offset), (ADMIN_DEFAULT_LIMIT, 0));

        let f = admin_filter(AdminOrderQuery {
            limit: Some(10_000),
            offset: Some(-5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!((f.limit, f.offset), (ADMIN_MAX_LIMIT, 0));
    }

    #[test]
    fn admin_filter_parses_status_and_bounds() {
        let f = admin_filter(AdminOrderQuery {
            status: Some("Cooking".into()),
            from: Some("2025-01-01T00:00:00Z".into()),
            to: Some("2025-01-02T00:00:00+05:00".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.status, Some(OrderStatus::Cooking));
        assert!(f.from.is_some() && f.to.is_some());

        assert!(matches!(
            admin_filter(AdminOrderQuery {
                from: Some("yesterday".into()),
                ..Default::default()
            }),
            Err(OrderError::InvalidFilter(_))
        ));
        assert!(matches!(
            admin_filter(AdminOrderQuery {
                status: Some("lost".into()),
                ..Default::default()
            }),
            Err(OrderError::InvalidStatus)
        ));
    }

    fn service(store: &Arc<InMemoryStore>, notifier: MockNotifier) -> OrderService {
        OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(notifier),
            AppMetrics::new().unwrap(),
        )
    }

    fn pickup(region_id: i64, product_id: i64) -> CreateOrderInput {
        CreateOrderInput {
            client_request_id: Uuid::new_v4().to_string(),
            order_type: "pickup".into(),
            payment_method: "cash".into(),
            region_id,
            items: vec![line(product_id, 1)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn new_order_notifies_user_chat_once() {
        let store = InMemoryStore::new();
        let user = store.add_user(777, "Ali");
        let region = store.add_region("Center", dec!(5), true);
        let category = store.add_category("Kebab", 1, true);
        let product = store.add_product(category.id, "Shashlik", dec!(12.5), true);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_order_created()
            .withf(|_, chat_id| *chat_id == 777)
            .times(1)
            .returning(|_, _| Ok(()));

        let input = pickup(region.id, product.id);
        let svc = service(&store, notifier);
        assert!(svc.create(user.id, input.clone()).await.unwrap().created);
        // Replay does not notify again.
        assert!(!svc.create(user.id, input).await.unwrap().created);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_the_order() {
        let store = InMemoryStore::new();
        let user = store.add_user(778, "Vali");
        let region = store.add_region("Center", dec!(5), true);
        let category = store.add_category("Kebab", 1, true);
        let product = store.add_product(category.id, "Lula", dec!(10), true);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_order_created()
            .returning(|_, _| Err(NotifyError::Rejected(400)));
        notifier
            .expect_order_status_changed()
            .returning(|_, _| Err(NotifyError::Rejected(400)));

        let svc = service(&store, notifier);
        let placed = svc.create(user.id, pickup(region.id, product.id)).await.unwrap();
        assert_eq!(store.order_count(), 1);

        let updated = svc.update_status(placed.order.id, "ACCEPTED").await.unwrap();
        assert_eq!(updated.status, OrderStatus::Accepted);
    }
}
