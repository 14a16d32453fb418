use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::is_unique_violation,
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    models::{Order, OrderItem, OrderStatus, OrderType},
    repository::{InsertOutcome, NewOrder, OrderFilter, OrderRepository},
};

#[derive(Clone)]
pub struct SeaOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for SeaOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<InsertOutcome, DbErr> {
        let txn = self.db.begin().await?;

        let header = OrderActive {
            id: NotSet,
            client_request_id: Set(order.client_request_id),
            user_id: Set(order.user_id),
            address_id: Set(order.address_id),
            order_type: Set(order.order_type.as_str().to_string()),
            payment_method: Set(order.payment_method),
            status: Set(OrderStatus::New.as_str().to_string()),
            region_id: Set(order.region_id),
            delivery_price: Set(order.delivery_price),
            items_total: Set(order.items_total),
            total_price: Set(order.total_price),
            comment: Set(order.comment),
            customer_name: Set(order.customer_name),
            customer_phone: Set(order.customer_phone),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await;

        // Dropping `txn` on any early return rolls the transaction back.
        let header = match header {
            Ok(h) => h,
            Err(err) if is_unique_violation(&err) => return Ok(InsertOutcome::DuplicateKey),
            Err(err) => return Err(err),
        };

        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            let model = OrderItemActive {
                id: NotSet,
                order_id: Set(header.id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name),
                qty: Set(item.qty),
                price: Set(item.price),
                total: Set(item.total),
            }
            .insert(&txn)
            .await?;
            items.push(model);
        }

        txn.commit().await?;
        Ok(InsertOutcome::Inserted(order_from_entity(header, items)?))
    }

    async fn find_by_client_request_id(&self, key: Uuid) -> Result<Option<Order>, DbErr> {
        let model = Orders::find()
            .filter(OrderCol::ClientRequestId.eq(key))
            .one(&self.db)
            .await?;
        match model {
            Some(m) => Ok(with_items(&self.db, vec![m]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Order>, DbErr> {
        let model = Orders::find_by_id(id)
            .filter(OrderCol::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        match model {
            Some(m) => Ok(with_items(&self.db, vec![m]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: i64, limit: u64) -> Result<Vec<Order>, DbErr> {
        let models = Orders::find()
            .filter(OrderCol::UserId.eq(user_id))
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        with_items(&self.db, models).await
    }

    async fn list_admin(&self, filter: OrderFilter) -> Result<Vec<Order>, DbErr> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.from {
            condition = condition.add(OrderCol::CreatedAt.gte(from.fixed_offset()));
        }
        if let Some(to) = filter.to {
            condition = condition.add(OrderCol::CreatedAt.lte(to.fixed_offset()));
        }

        let models = Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt)
            .order_by_desc(OrderCol::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.db)
            .await?;
        with_items(&self.db, models).await
    }

    async fn update_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>, DbErr> {
        let existing = match Orders::find_by_id(id).one(&self.db).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let mut active: OrderActive = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        let model = active.update(&self.db).await?;
        Ok(with_items(&self.db, vec![model]).await?.pop())
    }
}

async fn with_items<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> Result<Vec<Order>, DbErr> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
    let mut grouped: HashMap<i64, Vec<OrderItemModel>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?
    {
        grouped.entry(item.order_id).or_default().push(item);
    }

    models
        .into_iter()
        .map(|m| {
            let items = grouped.remove(&m.id).unwrap_or_default();
            order_from_entity(m, items)
        })
        .collect()
}

pub fn order_from_entity(model: OrderModel, items: Vec<OrderItemModel>) -> Result<Order, DbErr> {
    let order_type: OrderType = model
        .order_type
        .parse()
        .map_err(|e| DbErr::Type(format!("orders.type: {e}")))?;
    let status: OrderStatus = model
        .status
        .parse()
        .map_err(|e| DbErr::Type(format!("orders.status: {e}")))?;

    Ok(Order {
        id: model.id,
        client_request_id: model.client_request_id,
        user_id: model.user_id,
        address_id: model.address_id,
        order_type,
        payment_method: model.payment_method,
        status,
        region_id: model.region_id,
        delivery_price: model.delivery_price,
        items_total: model.items_total,
        total_price: model.total_price,
        comment: model.comment,
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        items: items.into_iter().map(order_item_from_entity).collect(),
    })
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        qty: model.qty,
        price: model.price,
        total: model.total,
    }
}
