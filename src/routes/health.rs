//! Health check endpoints
//!
//! - /health, /healthz - Liveness check, lists the configured sources
//! - /version - Build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::serialize_response;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    /// 'online' with at least one source configured, 'degraded' otherwise
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    pub node_id: String,
    pub sources: Vec<String>,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let sources = state.aggregator.source_names();
    let status = if sources.is_empty() { "degraded" } else { "online" };

    HealthResponse {
        healthy: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        node_id: state.args.node_id.to_string(),
        sources,
    }
}

/// Handle liveness check (/health, /healthz)
///
/// Always 200 while the process is serving; a node without sources is
/// reported as degraded in the body only.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    serialize_response(StatusCode::OK, &build_health_response(&state))
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "scribe",
    };
    serialize_response(StatusCode::OK, &response)
}
