use crate::config::RouteConfig;
use axum::http::Uri;
use thiserror::Error;

/// One configured upstream origin.
#[derive(Debug, Clone)]
pub struct Origin {
    pub prefix: String,
    /// Absolute base URL, scheme and host included, no trailing path added.
    pub base_url: String,
    /// Authority of `base_url`, sent as the Host header on upstream fetches.
    pub host: String,
}

#[derive(Debug, Error)]
pub enum OriginMapError {
    #[error("route '{prefix}': origin '{origin}' is not an absolute URL")]
    InvalidOrigin { prefix: String, origin: String },

    #[error("route prefix '{0}' is configured twice")]
    DuplicatePrefix(String),
}

/// Ordered prefix → origin table. Built once at startup, immutable afterwards.
#[derive(Debug, Clone)]
pub struct OriginMap {
    origins: Vec<Origin>,
}

impl OriginMap {
    /// Build the table from config, preserving order. The origin host is
    /// extracted here so a malformed origin URL fails at startup instead of
    /// on the first request that routes to it.
    pub fn from_routes(routes: &[RouteConfig]) -> Result<Self, OriginMapError> {
        let mut origins = Vec::with_capacity(routes.len());

        for route in routes {
            if origins.iter().any(|o: &Origin| o.prefix == route.prefix) {
                return Err(OriginMapError::DuplicatePrefix(route.prefix.clone()));
            }

            let invalid = || OriginMapError::InvalidOrigin {
                prefix: route.prefix.clone(),
                origin: route.origin.clone(),
            };
            let uri: Uri = route.origin.parse().map_err(|_| invalid())?;
            if uri.scheme().is_none() {
                return Err(invalid());
            }
            let host = uri.authority().ok_or_else(invalid)?.as_str().to_string();

            origins.push(Origin {
                prefix: route.prefix.clone(),
                base_url: route.origin.clone(),
                host,
            });
        }

        Ok(Self { origins })
    }

    /// First configured prefix the path starts with, or `None`.
    ///
    /// Matching is literal string prefix, deliberately not segment-aware:
    /// a configured `/api` also matches `/apikey`.
    pub fn resolve(&self, path: &str) -> Option<&Origin> {
        self.origins.iter().find(|o| path.starts_with(&o.prefix))
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, origin: &str) -> RouteConfig {
        RouteConfig {
            prefix: prefix.to_string(),
            origin: origin.to_string(),
        }
    }

    #[test]
    fn resolves_first_matching_prefix_in_order() {
        let map = OriginMap::from_routes(&[
            route("/api/v2", "https://v2.example.com"),
            route("/api", "https://v1.example.com"),
        ])
        .unwrap();

        assert_eq!(map.resolve("/api/v2/users").unwrap().base_url, "https://v2.example.com");
        assert_eq!(map.resolve("/api/users").unwrap().base_url, "https://v1.example.com");
    }

    #[test]
    fn order_decides_between_overlapping_prefixes() {
        // Same table the other way around: the broad prefix shadows the
        // narrow one. First match wins, by design.
        let map = OriginMap::from_routes(&[
            route("/api", "https://v1.example.com"),
            route("/api/v2", "https://v2.example.com"),
        ])
        .unwrap();

        assert_eq!(map.resolve("/api/v2/users").unwrap().base_url, "https://v1.example.com");
    }

    #[test]
    fn matching_is_literal_not_segment_aware() {
        let map = OriginMap::from_routes(&[route("/api", "https://x.example.com")]).unwrap();
        assert!(map.resolve("/apikey").is_some());
    }

    #[test]
    fn unmatched_path_resolves_to_none() {
        let map = OriginMap::from_routes(&[route("/api", "https://x.example.com")]).unwrap();
        assert!(map.resolve("/other").is_none());
        assert!(map.resolve("/").is_none());
    }

    #[test]
    fn host_is_the_origin_authority() {
        let map = OriginMap::from_routes(&[
            route("/a", "https://cdn.example.com"),
            route("/b", "http://internal.example.com:8081"),
        ])
        .unwrap();

        assert_eq!(map.resolve("/a/x").unwrap().host, "cdn.example.com");
        assert_eq!(map.resolve("/b/x").unwrap().host, "internal.example.com:8081");
    }

    #[test]
    fn rejects_duplicate_prefix() {
        let err = OriginMap::from_routes(&[
            route("/a", "https://one.example.com"),
            route("/a", "https://two.example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, OriginMapError::DuplicatePrefix(p) if p == "/a"));
    }

    #[test]
    fn rejects_relative_origin() {
        let err = OriginMap::from_routes(&[route("/a", "not-a-url")]).unwrap_err();
        assert!(matches!(err, OriginMapError::InvalidOrigin { .. }));
    }
}
