//! Resource routes of the three services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde_json::{json, Value};
use service_chain::config::Role;

mod common;

use common::{
    http_client, metric_sum, scrape, spawn_chain, spawn_service, start_programmable_backend,
    test_config,
};

#[tokio::test]
async fn test_users_list_get_create() {
    let service = spawn_service(test_config(Role::Users)).await;
    let client = http_client();
    let base = service.base_url();

    let users: Value = client
        .get(format!("{base}/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert_eq!(users[0]["name"], "Alice");

    let bob: Value = client
        .get(format!("{base}/users/2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bob, json!({"id": 2, "name": "Bob", "email": "bob@example.com"}));

    let created = client
        .post(format!("{base}/users/create"))
        .json(&json!({"name": "Charlie", "email": "charlie@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["id"], 3);

    let duplicate = client
        .post(format!("{base}/users/create"))
        .json(&json!({"name": "Other", "email": "ALICE@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body, json!({"code": "conflict", "message": "Email already registered"}));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_payloads_are_validation_errors() {
    let service = spawn_service(test_config(Role::Users)).await;
    let client = http_client();
    let base = service.base_url();

    let bad_email = client
        .post(format!("{base}/users/create"))
        .json(&json!({"name": "Dan", "email": "not-an-email"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_email.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing_field = client
        .post(format!("{base}/users/create"))
        .json(&json!({"name": "Dan"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let malformed = client
        .post(format!("{base}/users/create"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = malformed.json().await.unwrap();
    assert_eq!(body["code"], "validation_error");

    let bad_id = client.get(format!("{base}/users/abc")).send().await.unwrap();
    assert_eq!(bad_id.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let samples = scrape(&service).await;
    assert_eq!(
        metric_sum(&samples, "http_errors_total", &[("error_type", "validation_error")]),
        4.0
    );
    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_products_create_rules() {
    let service = spawn_service(test_config(Role::Products)).await;
    let client = http_client();
    let base = service.base_url();

    let created: Value = client
        .post(format!("{base}/products/create"))
        .json(&json!({"name": "Keyboard", "price": 149.99}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created, json!({"id": 3, "name": "Keyboard", "price": 149.99}));

    let duplicate = client
        .post(format!("{base}/products/create"))
        .json(&json!({"name": "laptop", "price": 10.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    let free = client
        .post(format!("{base}/products/create"))
        .json(&json!({"name": "Sticker", "price": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(free.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = client.get(format!("{base}/products/42")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body, json!({"code": "not_found", "message": "Product not found"}));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_order_validated_against_chain() {
    let chain = spawn_chain().await;
    let client = http_client();
    let base = chain.orders.base_url();

    let created = client
        .post(format!("{base}/orders/create"))
        .json(&json!({"user_id": 1, "product_id": 2, "quantity": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::OK);
    let created: Value = created.json().await.unwrap();
    assert_eq!(created, json!({"id": 3, "user_id": 1, "product_id": 2, "quantity": 4}));

    let fetched: Value = client
        .get(format!("{base}/orders/3"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    let unknown_user = client
        .post(format!("{base}/orders/create"))
        .json(&json!({"user_id": 99, "product_id": 1, "quantity": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_user.status(), StatusCode::NOT_FOUND);
    let body: Value = unknown_user.json().await.unwrap();
    assert_eq!(body["message"], "User not found");

    let unknown_product = client
        .post(format!("{base}/orders/create"))
        .json(&json!({"user_id": 1, "product_id": 99, "quantity": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_product.status(), StatusCode::NOT_FOUND);
    let body: Value = unknown_product.json().await.unwrap();
    assert_eq!(body["message"], "Product not found");

    let zero = client
        .post(format!("{base}/orders/create"))
        .json(&json!({"user_id": 1, "product_id": 1, "quantity": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(zero.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let orders: Value = client
        .get(format!("{base}/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 3);

    let samples = scrape(&chain.orders).await;
    assert_eq!(
        metric_sum(
            &samples,
            "external_service_calls_total",
            &[("callee", "users-service"), ("outcome", "success")]
        ),
        2.0
    );
    assert_eq!(
        metric_sum(
            &samples,
            "external_service_calls_total",
            &[("callee", "users-service"), ("outcome", "error")]
        ),
        1.0
    );

    chain.orders.stop().await.unwrap();
    chain.products.stop().await.unwrap();
    chain.users.stop().await.unwrap();
}

#[tokio::test]
async fn test_downstream_base_path_is_kept() {
    let heads = Arc::new(Mutex::new(Vec::new()));
    let recorded = heads.clone();
    let gateway = start_programmable_backend(move |head| {
        recorded.lock().unwrap().push(head);
        async { (200, r#"{"id":1}"#.to_string()) }
    })
    .await;

    let mut config = test_config(Role::Orders);
    config.downstream.users = Some(format!("http://{gateway}/api"));
    let orders = spawn_service(config).await;

    let res = http_client()
        .post(format!("{}/orders/create", orders.base_url()))
        .json(&json!({"user_id": 1, "product_id": 1, "quantity": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let heads = heads.lock().unwrap().clone();
    assert_eq!(heads.len(), 1);
    assert!(heads[0].starts_with("GET /api/users/1 "), "{}", heads[0]);

    orders.stop().await.unwrap();
}

#[tokio::test]
async fn test_unconfigured_dependency_is_skipped() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let users = start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { (200, r#"{"id":5}"#.to_string()) }
    })
    .await;

    let mut config = test_config(Role::Orders);
    config.downstream.users = Some(format!("http://{users}"));
    let orders = spawn_service(config).await;

    let res = http_client()
        .post(format!("{}/orders/create", orders.base_url()))
        .json(&json!({"user_id": 5, "product_id": 777, "quantity": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    orders.stop().await.unwrap();
}
