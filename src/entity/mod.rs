pub mod addresses;
pub mod admin_users;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod regions;
pub mod users;

pub use addresses::Entity as Addresses;
pub use admin_users::Entity as AdminUsers;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use regions::Entity as Regions;
pub use users::Entity as Users;

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, EntityTrait, QueryTrait};

    use super::*;

    #[test]
    fn orders_join_their_region() {
        let sql = Orders::find()
            .find_also_related(Regions)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""orders"."region_id" = "regions"."id""#), "{sql}");

        let sql = Regions::find()
            .find_with_related(Orders)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""orders"."region_id""#), "{sql}");
    }
}
