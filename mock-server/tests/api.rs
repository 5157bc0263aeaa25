use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn empty(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_path_query_headers_and_body() {
    let req = Request::builder()
        .method("PATCH")
        .uri("/echo/a/b?q=x&q=y&other=1")
        .header("x-trace", "one")
        .header("x-trace", "two")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"k":"v"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.path, "/echo/a/b");
    assert_eq!(
        echo.query,
        vec![
            ("q".to_string(), "x".to_string()),
            ("q".to_string(), "y".to_string()),
            ("other".to_string(), "1".to_string()),
        ]
    );
    assert_eq!(echo.headers["x-trace"], vec!["one", "two"]);
    assert_eq!(echo.body, r#"{"k":"v"}"#);
}

#[tokio::test]
async fn echo_without_query_has_no_pairs() {
    let resp = app().oneshot(empty("GET", "/echo")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert!(echo.query.is_empty());
    assert!(echo.body.is_empty());
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code_and_body() {
    let resp = app().oneshot(empty("DELETE", "/status/420")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 420);
    assert_eq!(body_bytes(resp).await, "status 420");
}

#[tokio::test]
async fn status_rejects_out_of_range_codes() {
    let resp = app().oneshot(empty("GET", "/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_rejects_non_numeric_codes() {
    let resp = app().oneshot(empty("GET", "/status/teapot")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- json ---

#[tokio::test]
async fn json_wraps_value() {
    let resp = app().oneshot(empty("GET", "/json/propane")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let value: serde_json::Value = body_json(resp).await;
    assert_eq!(value, serde_json::json!({ "SomeValue": "propane" }));
}

// --- redirect ---

#[tokio::test]
async fn redirect_sets_location() {
    let resp = app().oneshot(empty("GET", "/redirect/307")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()[http::header::LOCATION], "/echo");
}

#[tokio::test]
async fn redirect_rejects_non_3xx() {
    let resp = app().oneshot(empty("GET", "/redirect/200")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- slow ---

#[tokio::test]
async fn slow_eventually_answers() {
    let resp = app().oneshot(empty("GET", "/slow/10")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "done");
}
