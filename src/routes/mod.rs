//! HTTP routes for Scribe

pub mod aggregate;
pub mod health;
pub mod profile;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::ScribeError;

pub use aggregate::handle_aggregate;
pub use health::{health_check, version_info};
pub use profile::handle_inscription_count;

/// JSON response with the CORS header every route sends
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Serialize `value` into a JSON response, or a 500 if that fails
pub fn serialize_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => json_response(status, body),
        Err(e) => error_response("Failed to serialize response", &ScribeError::from(e)),
    }
}

/// `{ error, details }` body with the error's status code
pub fn error_response(error: &str, err: &ScribeError) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": error,
        "details": err.details(),
    });
    json_response(err.status_code(), body.to_string())
}
