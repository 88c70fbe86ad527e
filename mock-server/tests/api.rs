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

fn request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(http::header::CONTENT_TYPE, content_type);
    }
    builder.body(body.to_string()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_without_query_is_empty() {
    let resp = app()
        .oneshot(request("GET", "/demo/request", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert!(echo.get.is_empty());
    assert!(echo.post.is_empty());
    assert_eq!(echo.raw, "");
}

#[tokio::test]
async fn echo_reports_query_params() {
    let resp = app()
        .oneshot(request("GET", "/demo/request?name=peter&age=3", None, ""))
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.get["name"], "peter");
    assert_eq!(echo.get["age"], "3");
}

#[tokio::test]
async fn echo_parses_form_body() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/demo/request?a=1",
            Some("application/x-www-form-urlencoded"),
            "title=good&desc=hello+world",
        ))
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.raw, "title=good&desc=hello+world");
    assert_eq!(echo.post["title"], "good");
    assert_eq!(echo.post["desc"], "hello world");
    assert_eq!(
        echo.header["Content-Type"],
        vec!["application/x-www-form-urlencoded".to_string()]
    );
}

#[tokio::test]
async fn echo_parses_json_object_body() {
    let resp = app()
        .oneshot(request(
            "PUT",
            "/demo/request",
            Some("application/json; charset=UTF-8"),
            r#"{"age":11,"name":"Mary"}"#,
        ))
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.post["age"], 11);
    assert_eq!(echo.post["name"], "Mary");
}

#[tokio::test]
async fn echo_keeps_unparsed_body_raw() {
    let resp = app()
        .oneshot(request("POST", "/demo/request", Some("text/plain"), "hello"))
        .await
        .unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.raw, "hello");
    assert!(echo.post.is_empty());
}

#[tokio::test]
async fn echo_parses_multipart_fields() {
    let boundary = "XyZ";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         good\r\n--{boundary}--\r\n"
    );
    let resp = app()
        .oneshot(request(
            "POST",
            "/demo/request",
            Some(&format!("multipart/form-data; boundary={boundary}")),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.post["title"], "good");
    assert_eq!(echo.raw, "");
}

#[tokio::test]
async fn echo_title_cases_headers() {
    let req = Request::builder()
        .uri("/demo/request")
        .header("user-auth", "abc123")
        .header("x-multi", "1")
        .header("x-multi", "2")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.header["User-Auth"], vec!["abc123".to_string()]);
    assert_eq!(echo.header["X-Multi"], vec!["1".to_string(), "2".to_string()]);
}

// --- status ---

#[tokio::test]
async fn status_route_returns_requested_code() {
    let resp = app()
        .oneshot(request("GET", "/demo/status/404", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "status 404");
}

#[tokio::test]
async fn status_route_rejects_invalid_code() {
    let resp = app()
        .oneshot(request("GET", "/demo/status/1000", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- sleep ---

#[tokio::test]
async fn sleep_route_waits_and_reports() {
    let started = std::time::Instant::now();
    let resp = app()
        .oneshot(request("GET", "/demo/sleep?ms=20", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(20));
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["slept_ms"], 20);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let resp = app()
        .oneshot(request("GET", "/nope", None, ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
