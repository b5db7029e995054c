//! Forwarding of mock routes to an upstream chosen by the session.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the selected upstream
//! - Copy method, end-to-end headers and body
//! - Relay the upstream status, headers and body back to the client
//!
//! # Design Decisions
//! - Hop-by-hop headers and `host` are never forwarded in either direction
//! - Upstream failures answer 502; nothing is retried
//! - Environment proxy settings are ignored; targets are dialled directly

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use reqwest::Url;

use crate::http::response::error_response;
use crate::plugins::proxy::{upstream_url, ProxyTargets};

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Upstream client plus the named targets sessions may select.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    targets: ProxyTargets,
}

impl Forwarder {
    pub fn new(targets: ProxyTargets, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).no_proxy().build()?;
        Ok(Self { client, targets })
    }

    pub fn targets(&self) -> &ProxyTargets {
        &self.targets
    }

    /// Send the request to `base` and relay whatever comes back.
    pub async fn forward(&self, base: &Url, method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> Response {
        let url = upstream_url(base, uri.path(), uri.query());
        tracing::debug!(method = %method, upstream = %url, "Proxying request");

        let upstream = self
            .client
            .request(method.clone(), url.clone())
            .headers(end_to_end(headers))
            .body(body)
            .send()
            .await;

        let upstream = match upstream {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(upstream = %url, error = %e, "Upstream error");
                return error_response(StatusCode::BAD_GATEWAY, "Upstream request failed");
            }
        };

        let status = upstream.status();
        let upstream_headers = end_to_end(upstream.headers());
        match upstream.bytes().await {
            Ok(bytes) => {
                let mut response = (status, Body::from(bytes)).into_response();
                response.headers_mut().extend(upstream_headers);
                response
            }
            Err(e) => {
                tracing::error!(upstream = %url, error = %e, "Upstream body failed");
                error_response(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        }
    }
}

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = headers.clone();
    for name in &HOP_BY_HOP {
        filtered.remove(name);
    }
    filtered.remove(header::CONTENT_LENGTH);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_end_to_end_drops_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("mock.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("3"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let filtered = end_to_end(&headers);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[header::ACCEPT], "application/json");
    }
}
