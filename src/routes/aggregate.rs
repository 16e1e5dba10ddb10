//! Inscription aggregation endpoint
//!
//! `GET /aggregate-inscriptions?address=<addr>[&order=latest|oldest]`

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::{error_response, json_response};
use crate::aggregator::{AggregationResult, SortOrder};
use crate::server::AppState;
use crate::sources::SourceReport;
use crate::types::{CanonicalRecord, ScribeError};

const MISSING_ADDRESS: &str = "Missing address parameter";
const INVALID_ORDER: &str = "Invalid order parameter";
const AGGREGATION_FAILED: &str = "Failed to aggregate inscriptions";

#[derive(Debug, Default, Deserialize)]
struct AggregateQuery {
    address: Option<String>,
    order: Option<String>,
}

/// Validated request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRequest {
    pub address: String,
    pub order: SortOrder,
}

/// Parse and validate the query string
///
/// Returns the short error label alongside the error so callers can build
/// the `{ error, details }` body.
pub fn parse_query(query: Option<&str>) -> Result<AggregateRequest, (&'static str, ScribeError)> {
    let parsed: AggregateQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| (MISSING_ADDRESS, ScribeError::BadRequest(e.to_string())))?;

    let address = parsed
        .address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            (
                MISSING_ADDRESS,
                ScribeError::BadRequest("Query parameter 'address' is required".to_string()),
            )
        })?;

    let order = match parsed.order {
        Some(order) => order
            .parse()
            .map_err(|e: String| (INVALID_ORDER, ScribeError::BadRequest(e)))?,
        None => SortOrder::default(),
    };

    Ok(AggregateRequest { address, order })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregateResponse<'a> {
    success: bool,
    inscriptions: &'a [CanonicalRecord],
    total: u64,
    stats: AggregateStats,
    sources: &'a [SourceReport],
    timed_out: bool,
}

#[derive(Serialize)]
struct AggregateStats {
    fetched: u64,
    reported: u64,
    cursed: u64,
    normal: u64,
    missing: u64,
}

impl<'a> From<&'a AggregationResult> for AggregateResponse<'a> {
    fn from(result: &'a AggregationResult) -> Self {
        Self {
            success: true,
            inscriptions: &result.records,
            total: result.total,
            stats: AggregateStats {
                fetched: result.fetched_count,
                reported: result.reported_total,
                cursed: result.curse_count,
                normal: result.normal_count,
                missing: result.missing_count,
            },
            sources: &result.sources,
            timed_out: result.timed_out,
        }
    }
}

/// Handle GET /aggregate-inscriptions
///
/// The aggregation runs on its own task so that a panic inside an adapter
/// becomes a 500 instead of tearing down the connection.
pub async fn handle_aggregate(state: Arc<AppState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let request = match parse_query(query) {
        Ok(request) => request,
        Err((label, err)) => return error_response(label, &err),
    };

    info!(address = %request.address, order = %request.order, "Aggregating inscriptions");

    let aggregator = Arc::clone(&state.aggregator);
    let address = request.address.clone();
    let order = request.order;
    let task = tokio::spawn(async move { aggregator.aggregate(&address, order).await });

    let result = match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(address = %request.address, error = %e, "Aggregation task failed");
            return error_response(AGGREGATION_FAILED, &ScribeError::Internal(e.to_string()));
        }
    };

    state
        .counts
        .set_cached_inscription_count(&request.address, result.total)
        .await;

    match serde_json::to_vec(&AggregateResponse::from(&result)) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            error!(address = %request.address, error = %e, "Failed to serialize aggregation");
            error_response(AGGREGATION_FAILED, &ScribeError::from(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_defaults_to_latest() {
        let request = parse_query(Some("address=bc1pabc")).unwrap();
        assert_eq!(request.address, "bc1pabc");
        assert_eq!(request.order, SortOrder::Latest);
    }

    #[test]
    fn test_parse_query_order_and_encoding() {
        let request = parse_query(Some("order=oldest&address=bc1p%20abc")).unwrap();
        assert_eq!(request.address, "bc1p abc");
        assert_eq!(request.order, SortOrder::Oldest);
    }

    #[test]
    fn test_missing_or_blank_address() {
        for query in [None, Some(""), Some("address="), Some("address=%20%20"), Some("order=latest")] {
            let (label, err) = parse_query(query).unwrap_err();
            assert_eq!(label, MISSING_ADDRESS);
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_invalid_order() {
        let (label, err) = parse_query(Some("address=bc1p&order=random")).unwrap_err();
        assert_eq!(label, INVALID_ORDER);
        assert!(err.details().contains("random"));
    }

    #[test]
    fn test_response_shape() {
        let mut record = CanonicalRecord::new("ai0", "https://ordinals.com");
        record.sequence_number = Some(-1);
        let result = crate::aggregator::reconcile(vec![record], 3);

        let json = serde_json::to_value(AggregateResponse::from(&result)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 3);
        assert_eq!(json["stats"]["cursed"], 1);
        assert_eq!(json["stats"]["missing"], 2);
        assert_eq!(json["inscriptions"][0]["id"], "ai0");
        assert_eq!(json["timedOut"], false);
    }
}
