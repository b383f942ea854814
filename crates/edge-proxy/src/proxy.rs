use crate::error::ProxyError;
use crate::router::{Origin, OriginMap};
use crate::upstream::FetchTransport;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use edge_cache::{CacheStore, StoredResponse};
use std::sync::Arc;
use std::time::Instant;

/// Provenance header appended to every proxied response.
pub const CACHE_STATUS_HEADER: &str = "x-edgefunctions-cache";

/// Preflight cache lifetime advertised on Access-Control-Max-Age.
const PREFLIGHT_MAX_AGE_SECS: u64 = 2_592_000;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub origins: OriginMap,
    pub store: Arc<dyn CacheStore>,
    pub transport: Arc<dyn FetchTransport>,
    /// Advisory TTL on outbound Cache-Control headers only.
    pub ttl_seconds: u64,
}

/// Main proxy handler. Resolves the origin, serves from cache, forwards to
/// the upstream on a miss and caches the rebuilt response.
pub async fn proxy_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response<Body> {
    match handle(&state, &uri).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle(state: &AppState, uri: &Uri) -> Result<Response<Body>, ProxyError> {
    let start = Instant::now();
    let path = uri.path();
    let query = uri.query();

    let origin = state.origins.resolve(path).ok_or(ProxyError::RouteNotFound)?;

    // The matched prefix is stripped by length from the front, never by
    // substring replace, so a path containing the prefix text twice stays
    // intact past the first.
    let stripped = &path[origin.prefix.len()..];

    // Manual purge short-circuits before any lookup or fetch. The purge
    // refers to the entry a plain GET of this URL would have created, so the
    // flag itself is dropped before the key is rebuilt: a key carrying the
    // flag could never match, since flagged requests never populate the cache.
    if has_delete_flag(query) {
        let key = origin_url(origin, stripped, strip_delete_flag(query).as_deref());
        let existed = state.store.purge(&key).await?;
        tracing::info!(key = %key, existed, "cache entry purged");
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Body::from("cache entry deleted"))
            .unwrap());
    }

    // The origin URL is the cache key: two routes resolving to the same
    // origin URL share one entry.
    let origin_url = origin_url(origin, stripped, query);
    let cache_key = origin_url.as_str();

    if let Some(cached) = state.store.lookup(cache_key).await? {
        tracing::debug!(
            key = %cache_key,
            latency_us = start.elapsed().as_micros(),
            "cache HIT"
        );
        return Ok(rebuild_response(cached, "HIT"));
    }

    // Cache miss: fetch from the origin with its own Host.
    let upstream = state.transport.fetch(&origin_url, &origin.host).await?;

    let headers = response_headers(upstream.content_type.as_deref(), state.ttl_seconds);
    let rebuilt = StoredResponse {
        status: upstream.status,
        headers,
        body: upstream.body,
    };

    // Only 200s are cached. The write is best-effort: a failed store never
    // fails the response that was already fetched.
    let stored = if upstream.status == 200 {
        match state.store.store(cache_key, rebuilt.clone()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "cache store write failed");
                false
            }
        }
    } else {
        false
    };

    tracing::debug!(
        key = %cache_key,
        status = upstream.status,
        cached = stored,
        latency_us = start.elapsed().as_micros(),
        "cache MISS → upstream"
    );

    Ok(rebuild_response(rebuilt, "MISS"))
}

/// Byte-for-byte concatenation of origin base, stripped path and query. No
/// slash normalization, no percent re-encoding.
fn origin_url(origin: &Origin, stripped_path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) => format!("{}{}?{}", origin.base_url, stripped_path, q),
        None => format!("{}{}", origin.base_url, stripped_path),
    }
}

/// A request asks for invalidation when its query string carries a `delete`
/// parameter, whatever its value, including none at all.
fn has_delete_flag(query: Option<&str>) -> bool {
    let Some(query) = query else { return false };
    query.split('&').any(|pair| param_name(pair) == "delete")
}

/// Remove the `delete` parameter from a query string, keeping everything
/// else verbatim. `None` when nothing remains.
fn strip_delete_flag(query: Option<&str>) -> Option<String> {
    let retained: Vec<&str> = query?
        .split('&')
        .filter(|pair| param_name(pair) != "delete")
        .collect();
    if retained.is_empty() {
        None
    } else {
        Some(retained.join("&"))
    }
}

fn param_name(pair: &str) -> &str {
    pair.split('=').next().unwrap_or(pair)
}

/// The fixed header set every proxied response carries. Upstream headers are
/// not forwarded; only the content type survives.
fn response_headers(content_type: Option<&str>, ttl_seconds: u64) -> Vec<(String, String)> {
    vec![
        ("Access-Control-Allow-Origin".into(), "*".into()),
        ("Access-Control-Allow-Methods".into(), "GET,POST".into()),
        (
            "Access-Control-Max-Age".into(),
            PREFLIGHT_MAX_AGE_SECS.to_string(),
        ),
        (
            "Cache-Control".into(),
            format!("public,max-age={ttl_seconds},immutable"),
        ),
        ("content-type".into(), content_type.unwrap_or("").to_string()),
    ]
}

/// Build an HTTP response from a stored entry, tagging its provenance.
fn rebuild_response(stored: StoredResponse, provenance: &'static str) -> Response<Body> {
    let mut response = Response::builder().status(stored.status);
    for (key, value) in &stored.headers {
        if let Ok(v) = HeaderValue::from_str(value) {
            response = response.header(key.as_str(), v);
        }
    }
    response
        .header(CACHE_STATUS_HEADER, provenance)
        .body(Body::from(stored.body))
        .unwrap()
}
