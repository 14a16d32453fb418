use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use kabob_food::{
    cache::MENU_KEY,
    config::AppConfig,
    routes,
    state::AppState,
    test_support::{
        InMemoryStore, MemoryCache, RecordingNotifier, test_config, test_state, test_state_with,
    },
};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.10");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    cache: Arc<MemoryCache>,
    state: AppState,
}

async fn spawn_app(config: AppConfig) -> TestApp {
    let store = InMemoryStore::new();
    let cache = MemoryCache::new();
    let state = test_state_with(config, &store, cache.clone(), RecordingNotifier::new());
    state
        .admin_auth
        .ensure_default_admin("admin", "admin-pass")
        .await
        .unwrap();
    TestApp {
        app: routes::app(state.clone()),
        store,
        cache,
        state,
    }
}

impl TestApp {
    fn user_token(&self, telegram_id: i64) -> (i64, String) {
        let user = self.store.add_user(telegram_id, "Test");
        let token = self.state.tokens.issue_user(user.id, telegram_id).unwrap();
        (user.id, token)
    }

    async fn admin_token(&self) -> String {
        self.state.admin_auth.login("admin", "admin-pass").await.unwrap()
    }
}

#[tokio::test]
async fn protected_routes_check_token_and_role() {
    let t = spawn_app(test_config()).await;
    let (_, user) = t.user_token(100);
    let admin = t.admin_token().await;

    let (status, body) = send(&t.app, Method::GET, "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
    assert!(body["data"]["error"].is_string());

    let (status, _) = send(&t.app, Method::GET, "/orders", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, Method::GET, "/orders", Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&t.app, Method::GET, "/admin/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&t.app, Method::GET, "/admin/orders", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
}

#[tokio::test]
async fn admin_login_endpoint_issues_token() {
    let t = spawn_app(test_config()).await;

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/admin/login",
        None,
        Some(json!({ "username": "admin", "password": "admin-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some_and(|s| !s.is_empty()));

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_lists_saved_addresses() {
    let t = spawn_app(test_config()).await;
    let region = t.store.add_region("Chilonzor", dec!(5), true);
    let (user_id, token) = t.user_token(300);

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/addresses",
        Some(&token),
        Some(json!({ "region_id": region.id, "street": "Bunyodkor", "house": "12" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["region_id"], region.id);

    let (status, body) = send(&t.app, Method::GET, "/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["id"], user_id);
    assert_eq!(body["data"]["user"]["telegram_id"], 300);
    assert_eq!(body["data"]["addresses"][0]["street"], "Bunyodkor");

    let (status, _) = send(&t.app, Method::GET, "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_creation_returns_201_then_200_on_replay() {
    let t = spawn_app(test_config()).await;
    let (_, user) = t.user_token(200);
    let region = t.store.add_region("Center", dec!(5), true);
    let category = t.store.add_category("Grill", 1, true);
    let product = t.store.add_product(category.id, "Shashlik", dec!(12.5), true);

    let payload = json!({
        "client_request_id": Uuid::new_v4().to_string(),
        "type": "pickup",
        "payment_method": "cash",
        "region_id": region.id,
        "items": [{ "product_id": product.id, "qty": 2 }]
    });

    let (status, first) =
        send(&t.app, Method::POST, "/orders", Some(&user), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["data"]["type"], "pickup");
    assert_eq!(first["data"]["status"], "new");
    assert_eq!(first["data"]["total_price"], json!(25.0));

    let (status, second) =
        send(&t.app, Method::POST, "/orders", Some(&user), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["id"], first["data"]["id"]);

    let id = first["data"]["id"].as_i64().unwrap();
    let (status, got) =
        send(&t.app, Method::GET, &format!("/orders/{id}"), Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(got["data"]["items"][0]["qty"], 2);

    let (_, other) = t.user_token(201);
    let (status, _) =
        send(&t.app, Method::GET, &format!("/orders/{id}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_order_is_a_bad_request() {
    let t = spawn_app(test_config()).await;
    let (_, user) = t.user_token(300);

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/orders",
        Some(&user),
        Some(json!({
            "client_request_id": "nope",
            "type": "pickup",
            "payment_method": "cash",
            "region_id": 1,
            "items": [{ "product_id": 1, "qty": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request");
    assert_eq!(body["data"]["error"], "client_request_id must be a UUID");
}

#[tokio::test]
async fn admin_status_update_over_http() {
    let t = spawn_app(test_config()).await;
    let (_, user) = t.user_token(400);
    let admin = t.admin_token().await;
    let region = t.store.add_region("Center", dec!(5), true);
    let category = t.store.add_category("Grill", 1, true);
    let product = t.store.add_product(category.id, "Lula", dec!(10), true);

    let (_, created) = send(
        &t.app,
        Method::POST,
        "/orders",
        Some(&user),
        Some(json!({
            "client_request_id": Uuid::new_v4().to_string(),
            "type": "pickup",
            "payment_method": "card",
            "region_id": region.id,
            "items": [{ "product_id": product.id, "qty": 1 }]
        })),
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let uri = format!("/admin/orders/{id}/status");
    let (status, body) = send(
        &t.app,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "accepted");

    let (status, _) = send(
        &t.app,
        Method::PUT,
        &uri,
        Some(&admin),
        Some(json!({ "status": "teleported" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        Method::GET,
        "/admin/orders?status=accepted&limit=0",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn menu_is_cached_and_admin_writes_invalidate_it() {
    let t = spawn_app(test_config()).await;
    let admin = t.admin_token().await;
    let category = t.store.add_category("Grill", 1, true);
    t.store.add_product(category.id, "Shashlik", dec!(12.5), true);

    let (status, body) = send(&t.app, Method::GET, "/menu", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["categories"][0]["products"][0]["name"], "Shashlik");
    assert!(t.cache.contains(MENU_KEY));

    // Direct store writes are invisible while the snapshot is cached.
    t.store.add_product(category.id, "Hidden", dec!(1), true);
    let (_, body) = send(&t.app, Method::GET, "/menu", None, None).await;
    assert_eq!(
        body["data"]["categories"][0]["products"]
            .as_array()
            .map(Vec::len),
        Some(1)
    );

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/admin/products",
        Some(&admin),
        Some(json!({ "category_id": category.id, "name": "Lula", "price": 10.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!t.cache.contains(MENU_KEY));

    let (_, body) = send(&t.app, Method::GET, "/menu", None, None).await;
    assert_eq!(
        body["data"]["categories"][0]["products"]
            .as_array()
            .map(Vec::len),
        Some(3)
    );
}

#[tokio::test]
async fn menu_read_survives_a_corrupt_cache_entry() {
    let t = spawn_app(test_config()).await;
    t.store.add_region("Center", dec!(5), true);
    t.cache.put_raw(kabob_food::cache::REGIONS_KEY, "{broken");

    let (status, body) = send(&t.app, Method::GET, "/regions", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["regions"][0]["name"], "Center");
}

#[tokio::test]
async fn user_routes_are_rate_limited_per_client() {
    let t = spawn_app(AppConfig {
        rate_user_limit: 2,
        ..test_config()
    })
    .await;
    let (_, user) = t.user_token(500);

    for _ in 0..2 {
        let (status, _) = send(&t.app, Method::GET, "/orders", Some(&user), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&t.app, Method::GET, "/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too Many Requests");

    // Public routes are not limited.
    let (status, _) = send(&t.app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bot_register_checks_shared_secret_when_configured() {
    let t = spawn_app(AppConfig {
        bot_register_secret: Some("hush".into()),
        ..test_config()
    })
    .await;
    let payload = json!({
        "telegram_id": 777,
        "phone": "+998900000000",
        "first_name": "Nodir",
        "location": { "latitude": 41.3, "longitude": 69.2 }
    });

    let (status, _) = send(&t.app, Method::POST, "/bot/register", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/bot/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-bot-secret", "hush")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_paths_and_metrics() {
    let store = InMemoryStore::new();
    let app = routes::app(test_state(&store, MemoryCache::new(), RecordingNotifier::new()));

    let (status, body) = send(&app, Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");

    let response = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8_lossy(&text);
    assert!(text.contains("orders_created_total"));
}
