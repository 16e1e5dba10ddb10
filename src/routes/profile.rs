//! Cached profile inscription count
//!
//! `GET /profile/inscription-count?address=<addr>` serves the count stored
//! by the last successful aggregation for that address.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_response, serialize_response};
use crate::server::AppState;
use crate::types::ScribeError;

#[derive(Deserialize)]
struct CountQuery {
    address: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse<'a> {
    address: &'a str,
    inscription_count: u64,
}

/// Handle GET /profile/inscription-count
pub async fn handle_inscription_count(
    state: Arc<AppState>,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    let address = serde_urlencoded::from_str::<CountQuery>(query.unwrap_or(""))
        .ok()
        .and_then(|q| q.address)
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let Some(address) = address else {
        return error_response(
            "Missing address parameter",
            &ScribeError::BadRequest("Query parameter 'address' is required".to_string()),
        );
    };

    match state.counts.cached_inscription_count(&address).await {
        Some(count) => serialize_response(
            StatusCode::OK,
            &CountResponse {
                address: &address,
                inscription_count: count,
            },
        ),
        None => error_response(
            "No cached inscription count",
            &ScribeError::NotFound(format!("No aggregation recorded for {}", address)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use clap::Parser;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_count_lookup() {
        let state = Arc::new(AppState::new(Args::parse_from(["scribe"])));

        let missing = handle_inscription_count(Arc::clone(&state), Some("address=bc1q")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        state.counts.set_cached_inscription_count("bc1q", 42).await;
        let found = handle_inscription_count(Arc::clone(&state), Some("address=bc1q")).await;
        assert_eq!(found.status(), StatusCode::OK);

        let body = found.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["inscriptionCount"], 42);
    }

    #[tokio::test]
    async fn test_missing_address_is_bad_request() {
        let state = Arc::new(AppState::new(Args::parse_from(["scribe"])));
        let response = handle_inscription_count(state, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
