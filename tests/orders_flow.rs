use std::sync::Arc;

use kabob_food::{
    cache::Cache,
    models::{OrderStatus, OrderType},
    services::order_service::{AdminOrderQuery, CreateOrderInput, OrderError, OrderLine},
    state::AppState,
    test_support::{InMemoryStore, MemoryCache, RecordingNotifier, Sent, test_state},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

struct Fixture {
    store: Arc<InMemoryStore>,
    notifier: Arc<RecordingNotifier>,
    state: AppState,
    user_id: i64,
    region_id: i64,
    shashlik: i64,
    tea: i64,
}

fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::new();
    let cache: Arc<dyn Cache> = MemoryCache::new();
    let state = test_state(&store, cache, notifier.clone());

    let user = store.add_user(5001, "Aziz");
    let region = store.add_region("Yunusabad", dec!(5), true);
    let category = store.add_category("Grill", 1, true);
    let shashlik = store.add_product(category.id, "Shashlik", dec!(12.5), true);
    let tea = store.add_product(category.id, "Green tea", dec!(2), true);

    Fixture {
        store,
        notifier,
        state,
        user_id: user.id,
        region_id: region.id,
        shashlik: shashlik.id,
        tea: tea.id,
    }
}

fn delivery(f: &Fixture, address_id: i64, items: Vec<OrderLine>) -> CreateOrderInput {
    CreateOrderInput {
        client_request_id: Uuid::new_v4().to_string(),
        order_type: "delivery".into(),
        payment_method: "cash".into(),
        region_id: f.region_id,
        address_id,
        customer_name: "Aziz".into(),
        customer_phone: "+998901234567".into(),
        items,
        ..Default::default()
    }
}

async fn address_for(f: &Fixture, user_id: i64) -> i64 {
    f.state
        .addresses
        .create(
            user_id,
            kabob_food::repository::AddressInput {
                region_id: f.region_id,
                street: "Amir Temur".into(),
                house: "1".into(),
                entrance: None,
                flat: None,
                comment: None,
                is_default: true,
            },
        )
        .await
        .expect("address")
        .id
}

fn line(product_id: i64, qty: i32) -> OrderLine {
    OrderLine { product_id, qty }
}

#[tokio::test]
async fn delivery_total_is_recomputed_from_catalog_prices() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;

    let placed = f
        .state
        .orders
        .create(f.user_id, delivery(&f, address_id, vec![line(f.shashlik, 2)]))
        .await
        .unwrap();

    assert!(placed.created);
    let order = placed.order;
    assert_eq!(order.order_type, OrderType::Delivery);
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.items_total, dec!(25));
    assert_eq!(order.delivery_price, dec!(5));
    assert_eq!(order.total_price, dec!(30));
    assert_eq!(order.address_id, Some(address_id));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].product_name, "Shashlik");
    assert_eq!(order.items[0].price, dec!(12.5));
    assert_eq!(order.items[0].total, dec!(25));
    assert_eq!(f.state.metrics.orders_created(), 1);
    assert_eq!(
        f.notifier.sent(),
        vec![Sent::Created {
            order_id: order.id,
            chat_id: 5001
        }]
    );
}

#[tokio::test]
async fn pickup_has_no_delivery_charge_and_needs_no_address() {
    let f = fixture();
    let mut input = delivery(&f, 0, vec![line(f.tea, 3)]);
    input.order_type = " Pickup ".into();

    let order = f.state.orders.create(f.user_id, input).await.unwrap().order;
    assert_eq!(order.order_type, OrderType::Pickup);
    assert_eq!(order.delivery_price, dec!(0));
    assert_eq!(order.total_price, dec!(6));
    assert_eq!(order.address_id, None);
}

#[tokio::test]
async fn repeated_lines_are_merged_in_first_appearance_order() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;
    let input = delivery(
        &f,
        address_id,
        vec![line(f.tea, 1), line(f.shashlik, 1), line(f.tea, 2)],
    );

    let order = f.state.orders.create(f.user_id, input).await.unwrap().order;
    let lines: Vec<(i64, i32)> = order.items.iter().map(|i| (i.product_id, i.qty)).collect();
    assert_eq!(lines, vec![(f.tea, 3), (f.shashlik, 1)]);
    assert_eq!(order.items_total, dec!(18.5));
}

#[tokio::test]
async fn replay_returns_the_original_order_even_after_price_change() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;
    let input = delivery(&f, address_id, vec![line(f.shashlik, 2)]);

    let first = f.state.orders.create(f.user_id, input.clone()).await.unwrap();
    f.store.set_product_price(f.shashlik, dec!(99));
    let second = f.state.orders.create(f.user_id, input).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.order, second.order);
    assert_eq!(second.order.total_price, dec!(30));
    assert_eq!(f.store.order_count(), 1);
    assert_eq!(f.state.metrics.orders_created(), 1);
    assert_eq!(f.notifier.sent().len(), 1);
}

#[tokio::test]
async fn concurrent_requests_with_one_key_create_one_order() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;
    let input = delivery(&f, address_id, vec![line(f.tea, 1)]);

    let (a, b, c) = tokio::join!(
        f.state.orders.create(f.user_id, input.clone()),
        f.state.orders.create(f.user_id, input.clone()),
        f.state.orders.create(f.user_id, input),
    );
    let results = [a.unwrap(), b.unwrap(), c.unwrap()];

    assert_eq!(results.iter().filter(|p| p.created).count(), 1);
    assert!(results.iter().all(|p| p.order.id == results[0].order.id));
    assert_eq!(f.store.order_count(), 1);
}

#[tokio::test]
async fn key_owned_by_another_user_conflicts() {
    let f = fixture();
    let other = f.store.add_user(5002, "Bobur");
    let input = CreateOrderInput {
        order_type: "pickup".into(),
        ..delivery(&f, 0, vec![line(f.tea, 1)])
    };

    f.state.orders.create(f.user_id, input.clone()).await.unwrap();
    let err = f.state.orders.create(other.id, input).await.unwrap_err();
    assert!(matches!(err, OrderError::IdempotencyConflict));
}

#[tokio::test]
async fn unknown_or_inactive_product_writes_nothing() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;
    let hidden = f.store.add_product(1, "Off menu", dec!(1), false);

    for missing in [hidden.id, 999_999] {
        let err = f
            .state
            .orders
            .create(
                f.user_id,
                delivery(&f, address_id, vec![line(f.tea, 1), line(missing, 1)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::ProductNotFound));
        assert_eq!(err.to_string(), "product not found or inactive");
    }
    assert_eq!(f.store.order_count(), 0);
    assert!(f.notifier.sent().is_empty());
}

#[tokio::test]
async fn validation_rejects_bad_requests() {
    let f = fixture();
    let address_id = address_for(&f, f.user_id).await;
    let inactive = f.store.add_region("Closed", dec!(1), false);
    let other = f.store.add_user(5003, "Dilnoza");
    let foreign_address = address_for(&f, other.id).await;

    let base = delivery(&f, address_id, vec![line(f.tea, 1)]);
    let cases = vec![
        (
            CreateOrderInput {
                client_request_id: "not-a-uuid".into(),
                ..base.clone()
            },
            OrderError::InvalidClientRequestId,
        ),
        (
            CreateOrderInput {
                items: vec![],
                ..base.clone()
            },
            OrderError::EmptyItems,
        ),
        (
            CreateOrderInput {
                items: vec![line(f.tea, 0)],
                ..base.clone()
            },
            OrderError::InvalidQuantity,
        ),
        (
            CreateOrderInput {
                order_type: "drone".into(),
                ..base.clone()
            },
            OrderError::InvalidOrderType,
        ),
        (
            CreateOrderInput {
                address_id: 0,
                ..base.clone()
            },
            OrderError::AddressRequired,
        ),
        (
            CreateOrderInput {
                payment_method: "  ".into(),
                ..base.clone()
            },
            OrderError::MissingPaymentMethod,
        ),
        (
            CreateOrderInput {
                region_id: inactive.id,
                ..base.clone()
            },
            OrderError::InvalidRegion,
        ),
        (
            CreateOrderInput {
                region_id: 424_242,
                ..base.clone()
            },
            OrderError::InvalidRegion,
        ),
        (
            CreateOrderInput {
                address_id: foreign_address,
                ..base.clone()
            },
            OrderError::InvalidAddress,
        ),
    ];

    for (input, expected) in cases {
        let err = f.state.orders.create(f.user_id, input).await.unwrap_err();
        assert_eq!(
            std::mem::discriminant(&err),
            std::mem::discriminant(&expected),
            "expected {expected:?}, got {err:?}"
        );
    }
    assert_eq!(f.store.order_count(), 0);
}

#[tokio::test]
async fn users_only_see_their_own_orders() {
    let f = fixture();
    let other = f.store.add_user(5004, "Kamola");
    let pickup = |f: &Fixture| CreateOrderInput {
        order_type: "pickup".into(),
        ..delivery(f, 0, vec![line(f.tea, 1)])
    };

    let first = f.state.orders.create(f.user_id, pickup(&f)).await.unwrap().order;
    let second = f.state.orders.create(f.user_id, pickup(&f)).await.unwrap().order;
    let foreign = f.state.orders.create(other.id, pickup(&f)).await.unwrap().order;

    let mine = f.state.orders.list(f.user_id).await.unwrap();
    let ids: Vec<i64> = mine.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert_eq!(f.state.orders.get(f.user_id, first.id).await.unwrap(), first);
    assert!(matches!(
        f.state.orders.get(f.user_id, foreign.id).await,
        Err(OrderError::NotFound)
    ));
}

#[tokio::test]
async fn admin_updates_status_and_user_is_notified() {
    let f = fixture();
    let input = CreateOrderInput {
        order_type: "pickup".into(),
        ..delivery(&f, 0, vec![line(f.shashlik, 1)])
    };
    let order = f.state.orders.create(f.user_id, input).await.unwrap().order;

    let updated = f.state.orders.update_status(order.id, " Cooking ").await.unwrap();
    assert_eq!(updated.status, OrderStatus::Cooking);
    assert!(f.notifier.sent().contains(&Sent::StatusChanged {
        order_id: order.id,
        chat_id: 5001,
        status: OrderStatus::Cooking,
    }));

    assert!(matches!(
        f.state.orders.update_status(order.id, "lost").await,
        Err(OrderError::InvalidStatus)
    ));
    assert!(matches!(
        f.state.orders.update_status(9_999, "accepted").await,
        Err(OrderError::NotFound)
    ));

    let cooking = f
        .state
        .orders
        .list_admin(AdminOrderQuery {
            status: Some("cooking".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cooking.len(), 1);
    let delivered = f
        .state
        .orders
        .list_admin(AdminOrderQuery {
            status: Some("delivered".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(delivered.is_empty());
}

#[tokio::test]
async fn failing_notifier_never_fails_order_creation() {
    let store = InMemoryStore::new();
    let notifier = RecordingNotifier::failing();
    let state = test_state(&store, MemoryCache::new(), notifier.clone());
    let user = store.add_user(6001, "Jasur");
    let region = store.add_region("Chilonzor", dec!(3), true);
    let category = store.add_category("Drinks", 1, true);
    let product = store.add_product(category.id, "Ayran", dec!(1.5), true);

    let placed = state
        .orders
        .create(
            user.id,
            CreateOrderInput {
                client_request_id: Uuid::new_v4().to_string(),
                order_type: "pickup".into(),
                payment_method: "card".into(),
                region_id: region.id,
                items: vec![line(product.id, 2)],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(placed.created);
    assert_eq!(placed.order.total_price, dec!(3));
    assert_eq!(notifier.sent().len(), 1);
}
