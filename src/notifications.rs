//! Outbound Telegram notifications about order lifecycle events.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Order, OrderStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram rejected message: status {0}")]
    Rejected(u16),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A new order was placed by the user with `user_chat_id`.
    async fn order_created(&self, order: &Order, user_chat_id: i64) -> Result<(), NotifyError>;
    /// An admin changed the status of `order`.
    async fn order_status_changed(
        &self,
        order: &Order,
        user_chat_id: i64,
    ) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    admin_chat_id: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, admin_chat_id: Option<i64>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
            admin_chat_id,
        })
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }

    /// Sends to the user and, if configured, the admin chat. Both are attempted;
    /// the first failure is returned.
    async fn fan_out(
        &self,
        user_chat_id: i64,
        user_text: &str,
        admin_text: &str,
    ) -> Result<(), NotifyError> {
        let user_result = self.send(user_chat_id, user_text).await;
        let admin_result = match self.admin_chat_id {
            Some(chat_id) => self.send(chat_id, admin_text).await,
            None => Ok(()),
        };
        user_result.and(admin_result)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn order_created(&self, order: &Order, user_chat_id: i64) -> Result<(), NotifyError> {
        self.fan_out(
            user_chat_id,
            &format!(
                "Your order #{} has been received. Total: {}",
                order.id, order.total_price
            ),
            &admin_order_summary(order),
        )
        .await
    }

    async fn order_status_changed(
        &self,
        order: &Order,
        user_chat_id: i64,
    ) -> Result<(), NotifyError> {
        self.fan_out(
            user_chat_id,
            &format!(
                "Order #{} status: {}",
                order.id,
                status_label(order.status)
            ),
            &format!("Order #{} is now {}", order.id, order.status),
        )
        .await
    }
}

/// Notifier used when no bot token is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn order_created(&self, _order: &Order, _user_chat_id: i64) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn order_status_changed(
        &self,
        _order: &Order,
        _user_chat_id: i64,
    ) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::New => "received",
        OrderStatus::Accepted => "accepted",
        OrderStatus::Cooking => "being cooked",
        OrderStatus::Delivery => "on the way",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Canceled => "canceled",
    }
}

fn admin_order_summary(order: &Order) -> String {
    let mut text = format!(
        "New order #{} ({})\n{} {}\n",
        order.id,
        order.order_type.as_str(),
        order.customer_name,
        order.customer_phone
    );
    for item in &order.items {
        text.push_str(&format!("- {} x{} = {}\n", item.product_name, item.qty, item.total));
    }
    text.push_str(&format!(
        "Delivery: {}\nTotal: {}\nPayment: {}",
        order.delivery_price, order.total_price, order.payment_method
    ));
    if !order.comment.is_empty() {
        text.push_str(&format!("\nComment: {}", order.comment));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::{OrderItem, OrderType};

    fn sample_order() -> Order {
        Order {
            id: 7,
            client_request_id: Uuid::new_v4(),
            user_id: 1,
            address_id: None,
            order_type: OrderType::Pickup,
            payment_method: "cash".into(),
            status: OrderStatus::New,
            region_id: 1,
            delivery_price: Decimal::ZERO,
            items_total: Decimal::new(2500, 2),
            total_price: Decimal::new(2500, 2),
            comment: String::new(),
            customer_name: "Ali".into(),
            customer_phone: "+998901234567".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: vec![OrderItem {
                id: 1,
                order_id: 7,
                product_id: 3,
                product_name: "Shashlik".into(),
                qty: 2,
                price: Decimal::new(1250, 2),
                total: Decimal::new(2500, 2),
            }],
        }
    }

    #[test]
    fn admin_summary_lists_items_and_totals() {
        let text = admin_order_summary(&sample_order());
        assert!(text.contains("New order #7 (pickup)"));
        assert!(text.contains("- Shashlik x2 = 25.00"));
        assert!(text.contains("Total: 25.00"));
        assert!(!text.contains("Comment"));
    }
}
