//! Request metrics: one observation per request, bounded labels.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use service_chain::config::Role;

mod common;

use common::{
    http_client, metric_sum, parse_metrics, scrape, series_count, spawn_service, test_config,
};

const REQUESTS: &str = "http_requests_total";
const DURATION_COUNT: &str = "http_request_duration_seconds_count";
const DURATION_SUM: &str = "http_request_duration_seconds_sum";
const ERRORS: &str = "http_errors_total";

#[tokio::test]
async fn test_one_observation_per_request() {
    let service = spawn_service(test_config(Role::Users)).await;
    let client = http_client();
    let base = service.base_url();

    let before = scrape(&service).await;
    assert_eq!(metric_sum(&before, REQUESTS, &[]), 0.0);

    let ok = client.get(format!("{base}/users/1")).send().await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let missing = client.get(format!("{base}/users/999")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let failed = client.get(format!("{base}/users/error")).send().await.unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let after = scrape(&service).await;
    let by_id = ("route", "/users/{id}");
    let on_error = ("route", "/users/error");
    assert_eq!(metric_sum(&after, REQUESTS, &[by_id, ("status_code", "200")]), 1.0);
    assert_eq!(metric_sum(&after, REQUESTS, &[by_id, ("status_code", "404")]), 1.0);
    assert_eq!(metric_sum(&after, DURATION_COUNT, &[by_id, ("method", "GET")]), 2.0);
    assert_eq!(metric_sum(&after, ERRORS, &[by_id, ("error_type", "not_found")]), 1.0);

    assert_eq!(metric_sum(&after, REQUESTS, &[on_error, ("status_code", "500")]), 1.0);
    assert_eq!(metric_sum(&after, DURATION_COUNT, &[on_error]), 1.0);
    assert_eq!(metric_sum(&after, ERRORS, &[on_error, ("error_type", "internal_error")]), 1.0);

    // Scrapes themselves are not counted.
    assert_eq!(metric_sum(&after, REQUESTS, &[]), 3.0);
    assert!(after.iter().all(|s| s.labels.get("service").map_or(true, |v| v == "users-service")));

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_slow_route_latency_is_recorded() {
    let service = spawn_service(test_config(Role::Products)).await;

    let started = Instant::now();
    let res = http_client()
        .get(format!("{}/products/slow/2.0", service.base_url()))
        .send()
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["delay"], 2.0);

    let samples = scrape(&service).await;
    let route = [("route", "/products/slow/{seconds}")];
    assert_eq!(metric_sum(&samples, DURATION_COUNT, &route), 1.0);
    assert!(metric_sum(&samples, DURATION_SUM, &route) >= 2.0);
    assert_eq!(
        metric_sum(
            &samples,
            "http_request_duration_seconds_bucket",
            &[("route", "/products/slow/{seconds}"), ("le", "1")]
        ),
        0.0
    );

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_negative_delay_is_a_validation_error() {
    let service = spawn_service(test_config(Role::Users)).await;

    let res = http_client()
        .get(format!("{}/users/slow/-1", service.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let samples = scrape(&service).await;
    assert_eq!(metric_sum(&samples, ERRORS, &[("error_type", "validation_error")]), 1.0);
    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_trace_ids_do_not_create_series() {
    let service = spawn_service(test_config(Role::Users)).await;
    let client = http_client();

    for i in 0..50 {
        let res = client
            .get(format!("{}/users/{}", service.base_url(), i % 4))
            .header("X-Trace-ID", format!("burst-{i}"))
            .send()
            .await
            .unwrap();
        assert!(res.status() == StatusCode::OK || res.status() == StatusCode::NOT_FOUND);
    }

    let text = http_client()
        .get(format!("{}/metrics", service.base_url()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!text.contains("burst-"), "trace id leaked into metrics");

    let samples = parse_metrics(&text);
    assert_eq!(metric_sum(&samples, REQUESTS, &[]), 50.0);
    // ids 1 and 2 exist; 0 and 3 do not: two status codes, one route.
    assert_eq!(series_count(&samples, REQUESTS), 2);
    assert_eq!(series_count(&samples, DURATION_COUNT), 1);

    service.stop().await.unwrap();
}

#[tokio::test]
async fn test_unmatched_paths_are_not_recorded() {
    let service = spawn_service(test_config(Role::Users)).await;

    let res = http_client()
        .get(format!("{}/no/such/route", service.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let samples = scrape(&service).await;
    assert_eq!(metric_sum(&samples, REQUESTS, &[]), 0.0);
    service.stop().await.unwrap();
}
