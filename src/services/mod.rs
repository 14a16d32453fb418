pub mod address_service;
pub mod admin_auth_service;
pub mod auth_service;
pub mod catalog_admin_service;
pub mod menu_service;
pub mod order_service;
pub mod profile_service;
pub mod token_service;
