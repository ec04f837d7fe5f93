mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use stockroom::{config::Config, create_router, store::MemoryStore, AppState};
use tower::ServiceExt;

use common::{product, warehouse};

fn app(store: Arc<MemoryStore>) -> Router {
    create_router(AppState::new(store, Config::in_memory("test-secret")))
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Registers an account and signs it in, returning the `Cookie` header value.
async fn sign_in(app: &Router, username: &str) -> String {
    let form = format!(
        "username={username}&email={username}%40example.com&full_name=Test+User&password=correct-horse"
    );
    let response = app
        .clone()
        .oneshot(post_form("/register", &form, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let form = format!("username={username}&password=correct-horse");
    let response = app
        .clone()
        .oneshot(post_form("/login", &form, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("auth_token="))
        .expect("session cookie")
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(Arc::new(MemoryStore::new()));
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn pages_redirect_anonymous_users_to_login() {
    let app = app(Arc::new(MemoryStore::new()));
    for uri in ["/dashboard", "/products", "/inventory", "/users"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login");
    }
}

#[tokio::test]
async fn api_answers_401_without_session() {
    let app = app(Arc::new(MemoryStore::new()));
    let response = app.oneshot(get("/api/products", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = app(Arc::new(MemoryStore::new()));
    sign_in(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(post_form("/login", "username=alice&password=wrong-password", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn signed_in_user_sees_dashboard() {
    let app = app(Arc::new(MemoryStore::new()));
    let cookie = sign_in(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(get("/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/dashboard", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["product_count"], 0);
    assert_eq!(summary["order_trend"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn movement_round_trip_through_the_api() {
    let store = Arc::new(MemoryStore::new());
    let p = product(store.as_ref(), "X-100", "ABC Widget").await;
    warehouse(store.as_ref(), "W1").await;
    let app = app(store);
    let cookie = sign_in(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/movements",
            json!({
                "product_id": p.id,
                "warehouse_code": "w1",
                "direction": "IN",
                "quantity": "5",
                "reference": "PO-1"
            }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = json_body(response).await;
    assert_eq!(receipt["movement"]["warehouse_code"], "W1");
    assert_eq!(receipt["movement"]["direction"], "IN");
    assert_eq!(receipt["balance"]["quantity"], "5");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/inventory?product_id={}", p.id), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let balances = json_body(response).await;
    assert_eq!(balances.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/api/movements/recent?limit=5", Some(&cookie)))
        .await
        .unwrap();
    let recent = json_body(response).await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
    assert_eq!(recent[0]["reference"], "PO-1");

    let response = app
        .oneshot(post_json(
            "/api/movements",
            json!({
                "product_id": p.id,
                "warehouse_code": "W1",
                "direction": "OUT",
                "quantity": "0"
            }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_failure");
}

#[tokio::test]
async fn reconcile_and_user_admin_need_the_admin_role() {
    let app = app(Arc::new(MemoryStore::new()));
    let admin = sign_in(&app, "alice").await;
    let staff = sign_in(&app, "bob").await;

    let response = app
        .clone()
        .oneshot(post_json("/api/inventory/reconcile", json!({}), Some(&staff)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get("/users", Some(&staff)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(post_json("/api/inventory/reconcile", json!({}), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["corrections"], json!([]));

    let response = app.oneshot(get("/users", Some(&admin))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = app(Arc::new(MemoryStore::new()));
    sign_in(&app, "alice").await;

    let response = app
        .oneshot(post_form(
            "/register",
            "username=alice&email=other%40example.com&full_name=Other&password=correct-horse",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
