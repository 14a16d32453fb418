use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, AddressRequest},
        admin::{CategoryRequest, ProductRequest, RegionRequest},
        auth::{
            AdminLoginRequest, BotRegisterRequest, LocationPayload, TelegramAuthRequest,
            TelegramAuthResponse, TokenResponse,
        },
        menu::{MenuResponse, RegionList},
        orders::{CreateOrderRequest, OrderItemRequest, OrderList, UpdateOrderStatusRequest},
        profile::ProfileResponse,
    },
    models::{
        Address, Category, MenuCategory, Order, OrderItem, OrderStatus, OrderType, Product,
        Region, User,
    },
    response::{ApiResponse, Meta},
    routes::{addresses, admin, auth, health, menu, orders, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::version,
        menu::get_menu,
        menu::list_regions,
        auth::telegram_login,
        auth::bot_register,
        auth::admin_login,
        profile::get_profile,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        admin::list_all_orders,
        admin::update_order_status,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_region,
        admin::update_region,
        admin::delete_region
    ),
    components(
        schemas(
            User,
            Region,
            Category,
            Product,
            MenuCategory,
            Address,
            Order,
            OrderItem,
            OrderStatus,
            OrderType,
            TelegramAuthRequest,
            TelegramAuthResponse,
            BotRegisterRequest,
            LocationPayload,
            AdminLoginRequest,
            TokenResponse,
            AddressRequest,
            AddressList,
            CreateOrderRequest,
            OrderItemRequest,
            OrderList,
            UpdateOrderStatusRequest,
            CategoryRequest,
            ProductRequest,
            RegionRequest,
            MenuResponse,
            RegionList,
            ProfileResponse,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<MenuResponse>,
            ApiResponse<TokenResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and build info"),
        (name = "Menu", description = "Public menu and delivery regions"),
        (name = "Auth", description = "Telegram, bot and admin authentication"),
        (name = "Profile", description = "Current user profile"),
        (name = "Addresses", description = "Delivery addresses"),
        (name = "Orders", description = "Order placement and history"),
        (name = "Admin", description = "Order management and catalog editing"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
