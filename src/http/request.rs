//! Request conversion.
//!
//! # Responsibilities
//! - Turn the wire request into transport-neutral [`RequestData`]
//! - Parse the query string and JSON payload
//!
//! # Design Decisions
//! - Header names are lower-cased; non-UTF-8 values are dropped
//! - A payload that is not JSON is kept as a string value

use std::collections::BTreeMap;

use axum::extract::Query;
use axum::http::{HeaderMap, Method, Uri};
use serde_json::Value;

use crate::routing::RequestData;

/// Build the request value handed to response builders.
pub fn request_data(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
    params: BTreeMap<String, String>,
) -> RequestData {
    let query = Query::<BTreeMap<String, String>>::try_from_uri(uri)
        .map(|Query(query)| query)
        .unwrap_or_default();

    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();

    RequestData {
        method: method.to_string(),
        path: uri.path().to_string(),
        params,
        query,
        headers,
        payload: parse_payload(body),
    }
}

fn parse_payload(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body)
        .ok()
        .or_else(|| Some(Value::String(String::from_utf8_lossy(body).into_owned())))
}
