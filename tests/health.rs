use kabob_food::routes::health::{health_check, version};

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[tokio::test]
async fn version_reports_package_version() {
    let response = version().await;
    let data = response.0.data.expect("version data");
    assert_eq!(data.version, env!("CARGO_PKG_VERSION"));
}
