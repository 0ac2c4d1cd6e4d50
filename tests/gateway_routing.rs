//! End-to-end routing through a live gateway.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use common::{client, closed_address, start_echo_backend, start_gateway};
use dynamic_gateway::config::{EndpointTemplate, GatewayConfig, StaticServiceConfig};
use dynamic_gateway::{FilterError, Service, StaticProvider};

fn config(endpoints: Vec<EndpointTemplate>) -> GatewayConfig {
    GatewayConfig {
        downstream_path_prefix: "/api".into(),
        endpoints,
        ..Default::default()
    }
}

fn accounts_template() -> EndpointTemplate {
    EndpointTemplate {
        service_name: "users".into(),
        downstream_path: "/accounts/{id}".into(),
        upstream_path: "/v1/accounts/{id}".into(),
        methods: vec!["GET".into()],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_default_route_forwards_path_remainder() {
    let backend = start_echo_backend().await;
    let gw = start_gateway(&config(Vec::new())).await;
    gw.gateway
        .on_service_added(&Service::new("users-1", backend.url(), "users", "default"));

    let resp = client()
        .get(gw.url("/api/users/accounts/7?x=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-gateway"], "dynamic-gateway");
    assert!(resp.headers().contains_key("x-request-id"));

    let body = resp.text().await.unwrap();
    assert!(body.starts_with("GET /accounts/7?x=1 HTTP/1.1"), "unexpected head: {}", body);
    assert!(body.contains(&format!("host: {}", backend.addr)));
    assert!(body.contains(&format!("x-forwarded-host: {}", gw.addr)));
    assert!(body.contains("x-forwarded-for: 127.0.0.1"));
    assert!(body.contains("x-request-id: "));
}

#[tokio::test]
async fn test_template_route_with_methods() {
    let backend = start_echo_backend().await;
    let gw = start_gateway(&config(vec![accounts_template()])).await;
    gw.gateway
        .on_service_added(&Service::new("users-1", backend.url(), "users", "default"));

    let resp = client()
        .get(gw.url("/api/users/accounts/42?expand=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.starts_with("GET /v1/accounts/42?expand=1 HTTP/1.1"), "unexpected head: {}", body);

    let resp = client().post(gw.url("/api/users/accounts/42")).send().await.unwrap();
    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers()["x-gateway"], "dynamic-gateway");

    let resp = client().get(gw.url("/api/users/accounts/42/extra")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_filter_rejection_stops_pipeline() {
    let backend = start_echo_backend().await;
    let gw = start_gateway(&config(Vec::new())).await;
    gw.gateway
        .on_service_added(&Service::new("users-1", backend.url(), "users", "default"));

    let later = Arc::new(AtomicUsize::new(0));
    let counter = later.clone();
    gw.gateway
        .register_filter(Arc::new(|_req: &mut Request<Body>| Ok::<_, FilterError>(())));
    gw.gateway
        .register_filter(Arc::new(|_req: &mut Request<Body>| -> Result<(), FilterError> {
            Err(FilterError::new("boom"))
        }));
    gw.gateway.register_filter(Arc::new(move |_req: &mut Request<Body>| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, FilterError>(())
    }));

    let resp = client().get(gw.url("/api/users/anything")).send().await.unwrap();

    assert_eq!(resp.status(), 500);
    assert_eq!(resp.headers()["content-type"], "text/html");
    assert_eq!(resp.headers()["x-gateway"], "dynamic-gateway");
    assert_eq!(resp.text().await.unwrap(), "boom");
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_removed_service_returns_not_found() {
    let backend = start_echo_backend().await;
    let gw = start_gateway(&config(Vec::new())).await;
    let users = Service::new("users-1", backend.url(), "users", "default");

    gw.gateway.on_service_added(&users);
    let resp = client().get(gw.url("/api/users")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    gw.gateway.on_service_removed(&users);
    assert!(gw.router.is_empty());
    let resp = client().get(gw.url("/api/users")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.headers()["x-gateway"], "dynamic-gateway");
}

#[tokio::test]
async fn test_updated_service_moves_to_new_address() {
    let first = start_echo_backend().await;
    let second = start_echo_backend().await;
    let gw = start_gateway(&config(Vec::new())).await;
    let old = Service::new("users-1", first.url(), "users", "default");
    let new = Service::new("users-1", second.url(), "users", "default");

    gw.gateway.on_service_added(&old);
    gw.gateway.on_service_updated(&old, &new);

    let resp = client().get(gw.url("/api/users/x")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(first.hits(), 0);
    assert_eq!(second.hits(), 1);
    assert_eq!(gw.router.len(), 1);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let addr = closed_address().await;
    let gw = start_gateway(&config(Vec::new())).await;
    gw.gateway
        .on_service_added(&Service::new("dead-1", format!("http://{}", addr), "dead", "default"));

    let resp = client().get(gw.url("/api/dead/ping")).send().await.unwrap();
    assert_eq!(resp.status(), 502);
    assert_eq!(resp.headers()["x-gateway"], "dynamic-gateway");
}

#[tokio::test]
async fn test_provider_events_drive_routes() {
    let backend = start_echo_backend().await;
    let gw = start_gateway(&config(Vec::new())).await;
    let (provider, events) = StaticProvider::new();
    tokio::spawn(gw.gateway.clone().run(events, gw.shutdown.subscribe()));

    let services = vec![StaticServiceConfig {
        uid: Some("orders-1".into()),
        address: backend.url(),
        resource: "orders".into(),
        namespace: "default".into(),
    }];
    provider.publish_config(&services).unwrap();
    wait_until(|| gw.router.len() == 1).await;

    let resp = client().get(gw.url("/api/orders/17")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().starts_with("GET /17 HTTP/1.1"));

    provider.publish_config(&[]).unwrap();
    wait_until(|| gw.router.is_empty()).await;

    let resp = client().get(gw.url("/api/orders/17")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}
