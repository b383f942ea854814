use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Ways a proxied request can fail.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No configured prefix matches the request path.
    #[error("no configured origin matches the request path")]
    RouteNotFound,

    /// Transport-level failure contacting the origin. Not retried.
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// The backing store failed on a read or purge.
    #[error(transparent)]
    CacheStore(#[from] edge_cache::StoreError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::RouteNotFound => {
                (StatusCode::NOT_FOUND, "404 Not Found").into_response()
            }
            ProxyError::UpstreamFetch(_) | ProxyError::CacheStore(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }
}
