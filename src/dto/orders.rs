use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::Order,
    services::order_service::{AdminOrderQuery, CreateOrderInput, OrderLine},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub qty: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub client_request_id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub payment_method: String,
    pub region_id: i64,
    #[serde(default)]
    pub address_id: Option<i64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

impl From<CreateOrderRequest> for CreateOrderInput {
    fn from(req: CreateOrderRequest) -> Self {
        CreateOrderInput {
            client_request_id: req.client_request_id,
            order_type: req.order_type,
            payment_method: req.payment_method,
            region_id: req.region_id,
            address_id: req.address_id.unwrap_or(0),
            comment: req.comment,
            customer_name: req.customer_name,
            customer_phone: req.customer_phone,
            items: req
                .items
                .into_iter()
                .map(|i| OrderLine {
                    product_id: i.product_id,
                    qty: i.qty,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminOrderListQuery {
    /// One of new, accepted, cooking, delivery, delivered, canceled.
    pub status: Option<String>,
    /// RFC 3339 lower bound on creation time.
    pub from: Option<String>,
    /// RFC 3339 upper bound on creation time.
    pub to: Option<String>,
    /// Default 100, at most 500.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<AdminOrderListQuery> for AdminOrderQuery {
    fn from(q: AdminOrderListQuery) -> Self {
        AdminOrderQuery {
            status: q.status,
            from: q.from,
            to: q.to,
            limit: q.limit,
            offset: q.offset,
        }
    }
}
