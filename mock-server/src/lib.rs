use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Path, Query, Request},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode, Uri},
    routing::any,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tracing::debug;

/// What `/demo/request` saw: method, query, parsed body, raw body, headers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub get: Map<String, Value>,
    pub post: Map<String, Value>,
    pub raw: String,
    /// Header names in `Title-Case`, each with every value received.
    pub header: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
pub struct SleepParams {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/demo/request", any(echo))
        .route("/demo/sleep", any(sleep))
        .route("/demo/status/{code}", any(status))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    request: Request,
) -> Result<Json<Echo>, StatusCode> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mut echo = Echo {
        method: method.to_string(),
        get: uri.query().map(parse_form).unwrap_or_default(),
        header: title_cased(&headers),
        ..Echo::default()
    };

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?
        {
            let name = field.name().unwrap_or_default().to_string();
            let text = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            echo.post.insert(name, Value::String(text));
        }
    } else {
        let bytes = to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;
        echo.raw = String::from_utf8_lossy(&bytes).into_owned();
        if content_type.starts_with("application/x-www-form-urlencoded") {
            echo.post = parse_form(&echo.raw);
        } else if content_type.starts_with("application/json") {
            if let Ok(Value::Object(fields)) = serde_json::from_str(&echo.raw) {
                echo.post = fields;
            }
        }
    }

    debug!(method = %echo.method, query = ?uri.query(), "echoing request");
    Ok(Json(echo))
}

async fn sleep(Query(params): Query<SleepParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(serde_json::json!({ "slept_ms": params.ms }))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

fn parse_form(input: &str) -> Map<String, Value> {
    url::form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

fn title_cased(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(title_case(name.as_str()))
            .or_default()
            .push(value.to_string());
    }
    out
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_capitalizes_each_segment() {
        assert_eq!(title_case("user-auth"), "User-Auth");
        assert_eq!(title_case("CONTENT-TYPE"), "Content-Type");
        assert_eq!(title_case("x"), "X");
    }

    #[test]
    fn parse_form_decodes_pairs() {
        let fields = parse_form("name=peter+pan&age=1%3D1");
        assert_eq!(fields["name"], "peter pan");
        assert_eq!(fields["age"], "1=1");
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let mut echo = Echo {
            method: "POST".to_string(),
            raw: "a=1".to_string(),
            ..Echo::default()
        };
        echo.header.insert("Accept".to_string(), vec!["application/json".to_string()]);
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
    }

    #[test]
    fn sleep_params_default_to_zero() {
        let params: SleepParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.ms, 0);
    }
}
