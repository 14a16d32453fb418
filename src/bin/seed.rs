use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};

use kabob_food::{
    db::{create_orm_conn, run_migrations},
    entity::Categories,
    repository::{
        AdminUserRepository, CategoryInput, MenuRepository, ProductInput, RegionInput,
        RegionRepository, SeaAdminUserRepository, SeaMenuRepository, SeaRegionRepository,
    },
    services::admin_auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let orm = create_orm_conn(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admins = SeaAdminUserRepository::new(orm.clone());
    let username = std::env::var("ADMIN_DEFAULT_USERNAME").unwrap_or_else(|_| "admin".into());
    let password = std::env::var("ADMIN_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".into());
    let hash = hash_password(&password)?;
    admins.ensure_user(&username, &hash).await?;

    if Categories::find().count(&orm).await? > 0 {
        println!("Catalog already seeded; admin ensured");
        return Ok(());
    }

    let regions = SeaRegionRepository::new(orm.clone());
    for (name, price) in [("Chilonzor", 10_000), ("Yunusobod", 15_000), ("Sergeli", 20_000)] {
        regions
            .create(RegionInput {
                name: name.to_string(),
                delivery_price: Decimal::from(price),
                is_active: true,
            })
            .await?;
    }

    let menu = SeaMenuRepository::new(orm);
    let catalog: [(&str, &str, &[(&str, i64)]); 3] = [
        (
            "Kabob",
            "🍢",
            &[
                ("Lamb shashlik", 18_000),
                ("Chicken shashlik", 15_000),
                ("Lula kabob", 16_000),
            ],
        ),
        ("Salads", "🥗", &[("Achichuk", 8_000), ("Shakarob", 9_000)]),
        ("Drinks", "🥤", &[("Green tea", 5_000), ("Ayran", 7_000)]),
    ];

    let mut products = 0;
    for (sort_order, (name, emoji, items)) in catalog.iter().enumerate() {
        let category = menu
            .create_category(CategoryInput {
                name: name.to_string(),
                emoji: emoji.to_string(),
                sort_order: sort_order as i32,
                is_active: true,
            })
            .await?;
        for (position, (product, price)) in items.iter().enumerate() {
            menu.create_product(ProductInput {
                category_id: category.id,
                name: product.to_string(),
                description: String::new(),
                price: Decimal::from(*price),
                old_price: None,
                image_url: String::new(),
                is_active: true,
                sort_order: position as i32,
            })
            .await?;
            products += 1;
        }
    }

    println!("Seed completed. Admin: {username}, products: {products}");
    Ok(())
}
