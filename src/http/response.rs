//! Response rendering.
//!
//! # Responsibilities
//! - Render [`MockResponse`] as an axum response
//! - Pick a content type when the variant did not set one
//! - Produce JSON error bodies for transport-level failures
//!
//! # Design Decisions
//! - Invalid status codes become 500; invalid headers are skipped with a
//!   warning rather than failing the request

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::{MockBody, MockResponse};

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (content_type, body) = match self.body {
            MockBody::Empty => (None, Body::empty()),
            MockBody::Json(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => (Some("application/json"), Body::from(bytes)),
                Err(e) => {
                    tracing::error!(error = %e, "Could not serialize mock body");
                    return error_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid mock body");
                }
            },
            MockBody::Text(text) => (Some("text/plain; charset=utf-8"), Body::from(text)),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Skipping invalid mock header"),
            }
        }

        response
    }
}

/// `{"error": message}` with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_response() {
        let response = MockResponse::json(201, json!({ "ok": true }))
            .with_header("x-mock", "yes")
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-mock"], "yes");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }

    #[test]
    fn test_variant_content_type_wins() {
        let response = MockResponse::text(200, "<p>hi</p>")
            .with_header("content-type", "text/html")
            .into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    }

    #[test]
    fn test_bad_status_and_header() {
        let response = MockResponse::empty(42).with_header("bad header", "x").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("bad header").is_none());
    }
}
