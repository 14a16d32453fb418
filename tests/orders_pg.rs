use std::sync::Arc;

use kabob_food::{
    cache::NoopCache,
    db::{OrmConn, create_orm_conn, run_migrations},
    models::OrderStatus,
    repository::{
        AddressInput, CategoryInput, MenuRepository, ProductInput, RegionInput, RegionRepository,
        SeaAddressRepository, SeaAdminUserRepository, SeaMenuRepository, SeaOrderRepository,
        SeaRegionRepository, SeaUserRepository, TelegramProfile, UserRepository,
    },
    services::{
        address_service::AddressError,
        catalog_admin_service::CatalogError,
        order_service::{AdminOrderQuery, CreateOrderInput, OrderError, OrderLine},
    },
    state::{AppState, Ports},
    test_support::{RecordingNotifier, test_config},
};
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;

// Order, address and catalog flows against a real Postgres.
#[tokio::test]
async fn order_lifecycle_against_postgres() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL to run Postgres flow tests.");
            return Ok(());
        }
    };

    let (orm, state) = setup_state(&database_url).await?;

    let user = SeaUserRepository::new(orm.clone())
        .upsert_telegram_user(TelegramProfile {
            telegram_id: 90_001,
            first_name: "Pg".into(),
            ..Default::default()
        })
        .await?;
    let other = SeaUserRepository::new(orm.clone())
        .upsert_telegram_user(TelegramProfile {
            telegram_id: 90_002,
            first_name: "Other".into(),
            ..Default::default()
        })
        .await?;

    let regions = SeaRegionRepository::new(orm.clone());
    let region = regions
        .create(RegionInput {
            name: "Center".into(),
            delivery_price: dec!(5),
            is_active: true,
        })
        .await?;

    let menu = SeaMenuRepository::new(orm.clone());
    let category = menu
        .create_category(CategoryInput {
            name: "Grill".into(),
            emoji: String::new(),
            sort_order: 1,
            is_active: true,
        })
        .await?;
    let product = menu
        .create_product(ProductInput {
            category_id: category.id,
            name: "Shashlik".into(),
            description: String::new(),
            price: dec!(12.5),
            old_price: None,
            image_url: String::new(),
            is_active: true,
            sort_order: 0,
        })
        .await?;

    // Address defaults and FK checks
    let address_input = |street: &str| AddressInput {
        region_id: region.id,
        street: street.into(),
        house: "1".into(),
        entrance: None,
        flat: None,
        comment: None,
        is_default: true,
    };
    let first = state.addresses.create(user.id, address_input("A")).await?;
    let second = state.addresses.create(user.id, address_input("B")).await?;
    let listed = state.addresses.list(user.id).await?;
    assert_eq!(listed[0].id, second.id);
    assert!(!listed.iter().find(|a| a.id == first.id).unwrap().is_default);
    assert!(matches!(
        state
            .addresses
            .create(
                user.id,
                AddressInput {
                    region_id: 9_999_999,
                    ..address_input("C")
                }
            )
            .await,
        Err(AddressError::InvalidRegion)
    ));

    // Create, replay, conflict
    let input = CreateOrderInput {
        client_request_id: Uuid::new_v4().to_string(),
        order_type: "delivery".into(),
        payment_method: "cash".into(),
        region_id: region.id,
        address_id: second.id,
        items: vec![OrderLine {
            product_id: product.id,
            qty: 2,
        }],
        ..Default::default()
    };
    let placed = state.orders.create(user.id, input.clone()).await?;
    assert!(placed.created);
    assert_eq!(placed.order.total_price, dec!(30));
    assert_eq!(placed.order.items.len(), 1);

    let replay = state.orders.create(user.id, input.clone()).await?;
    assert!(!replay.created);
    assert_eq!(replay.order.id, placed.order.id);

    assert!(matches!(
        state.orders.create(other.id, input).await,
        Err(OrderError::IdempotencyConflict)
    ));

    // Unknown product leaves nothing behind
    let before = state.orders.list(user.id).await?.len();
    let missing = state
        .orders
        .create(
            user.id,
            CreateOrderInput {
                client_request_id: Uuid::new_v4().to_string(),
                order_type: "pickup".into(),
                payment_method: "cash".into(),
                region_id: region.id,
                items: vec![OrderLine {
                    product_id: 9_999_999,
                    qty: 1,
                }],
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(missing, Err(OrderError::ProductNotFound)));
    assert_eq!(state.orders.list(user.id).await?.len(), before);

    // Admin status update and filter
    let updated = state
        .orders
        .update_status(placed.order.id, "delivered")
        .await?;
    assert_eq!(updated.status, OrderStatus::Delivered);
    let delivered = state
        .orders
        .list_admin(AdminOrderQuery {
            status: Some("delivered".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(delivered.len(), 1);

    // Regions referenced by orders cannot be deleted
    assert!(matches!(
        state.catalog.delete_region(region.id).await,
        Err(CatalogError::InUse(_))
    ));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<(OrmConn, AppState)> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, addresses, products, categories, regions, admin_users, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let ports = Ports {
        users: Arc::new(SeaUserRepository::new(orm.clone())),
        admins: Arc::new(SeaAdminUserRepository::new(orm.clone())),
        regions: Arc::new(SeaRegionRepository::new(orm.clone())),
        menu: Arc::new(SeaMenuRepository::new(orm.clone())),
        addresses: Arc::new(SeaAddressRepository::new(orm.clone())),
        orders: Arc::new(SeaOrderRepository::new(orm.clone())),
        cache: Arc::new(NoopCache),
        notifier: RecordingNotifier::new(),
    };
    let state = AppState::build(test_config(), ports, Arc::new(mockable::DefaultClock))?;
    Ok((orm, state))
}
