//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; routing is a plain
//! match on method and path.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::aggregator::Aggregator;
use crate::config::Args;
use crate::profile::{InMemoryCountCache, InscriptionCountCache};
use crate::routes;
use crate::sources::{
    build_client, CursorSource, CursorSourceConfig, ExplorerSource, ExplorerSourceConfig,
    InscriptionSource, PagedSource, PagedSourceConfig, SnapshotSource, SnapshotSourceConfig,
};
use crate::types::ScribeError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub aggregator: Arc<Aggregator>,
    /// Last aggregated count per address
    pub counts: Arc<dyn InscriptionCountCache>,
    pub started_at: Instant,
}

impl AppState {
    /// Build the configured sources and an in-memory count cache
    pub fn new(args: Args) -> Self {
        let aggregator = Aggregator::new(build_sources(&args)).with_deadline(args.aggregate_timeout());
        Self::with_parts(args, aggregator, Arc::new(InMemoryCountCache::new()))
    }

    /// Assemble state from pre-built parts
    pub fn with_parts(
        args: Args,
        aggregator: Aggregator,
        counts: Arc<dyn InscriptionCountCache>,
    ) -> Self {
        Self {
            args,
            aggregator: Arc::new(aggregator),
            counts,
            started_at: Instant::now(),
        }
    }
}

/// One adapter per configured indexer, in A, B, C, D order
pub fn build_sources(args: &Args) -> Vec<Arc<dyn InscriptionSource>> {
    let client = build_client(args.request_timeout());
    let host = args.content_host.as_str();
    let mut sources: Vec<Arc<dyn InscriptionSource>> = Vec::new();

    if let Some(endpoint) = args.sources.source_a() {
        let mut config = PagedSourceConfig::new(endpoint);
        args.tune_paging(&mut config.policy);
        sources.push(Arc::new(PagedSource::new(config, client.clone(), host)));
    }
    if let Some(endpoint) = args.sources.source_b() {
        let mut config = CursorSourceConfig::new(endpoint);
        args.tune_paging(&mut config.policy);
        sources.push(Arc::new(CursorSource::new(config, client.clone(), host)));
    }
    if let Some(endpoint) = args.sources.source_c() {
        // Single page by construction; only the empty-page limit applies
        let mut config = SnapshotSourceConfig::new(endpoint);
        config.policy.max_empty_pages = args.max_empty_pages;
        sources.push(Arc::new(SnapshotSource::new(config, client.clone(), host)));
    }
    if let Some(endpoint) = args.sources.source_d() {
        let mut config = ExplorerSourceConfig::new(endpoint);
        args.tune_paging(&mut config.policy);
        sources.push(Arc::new(ExplorerSource::new(config, client, host)));
    }

    sources
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ScribeError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Scribe listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    let sources = state.aggregator.source_names();
    if sources.is_empty() {
        warn!("No indexer sources configured - aggregations will be empty");
    } else {
        info!("Sources enabled: {}", sources.join(", "));
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
pub async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    debug!("[{}] {} {}", addr, method, path);

    Ok(route(state, method, &path, query.as_deref()).await)
}

/// Dispatch on method and path
pub async fn route(
    state: Arc<AppState>,
    method: Method,
    path: &str,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    if method == Method::OPTIONS {
        return preflight_response();
    }

    match (method, path) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),
        (Method::GET, "/version") => routes::version_info(),
        (Method::GET, "/aggregate-inscriptions") => routes::handle_aggregate(state, query).await,
        (Method::GET, "/profile/inscription-count") => {
            routes::handle_inscription_count(state, query).await
        }
        _ => not_found_response(path),
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });
    routes::json_response(StatusCode::NOT_FOUND, body.to_string())
}
