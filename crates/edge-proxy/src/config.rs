use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Ordered prefix → origin table. First match wins, so more specific
    /// prefixes belong earlier in the file.
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Advisory TTL carried on outbound Cache-Control headers. The store
    /// itself enforces nothing.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub prefix: String,
    pub origin: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Config {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: vec![
                RouteConfig {
                    prefix: "/emoticons".to_string(),
                    origin: "https://emoticons-cloudflare.hzchu.top".to_string(),
                },
                RouteConfig {
                    prefix: "/shenlong".to_string(),
                    origin: "http://webapi.shenlongip.com".to_string(),
                },
            ],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            ttl_seconds: default_ttl(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}
fn default_namespace() -> String {
    "multi-origin".to_string()
}
fn default_ttl() -> u64 {
    2_592_000 // 30 days
}
fn default_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
            [server]
            listen_addr = "127.0.0.1:9000"

            [cache]
            namespace = "edge"
            ttl_seconds = 3600

            [upstream]
            timeout_ms = 2500

            [[routes]]
            prefix = "/img"
            origin = "https://img.example.com"

            [[routes]]
            prefix = "/api"
            origin = "https://api.example.com"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.cache.namespace, "edge");
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.upstream.timeout_ms, 2500);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].prefix, "/img");
        assert_eq!(config.routes[1].origin, "https://api.example.com");
    }

    #[test]
    fn omitted_sections_use_defaults() {
        let toml = r#"
            [[routes]]
            prefix = "/a"
            origin = "https://a.example.com"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cache.namespace, "multi-origin");
        assert_eq!(config.cache.ttl_seconds, 2_592_000);
        assert_eq!(config.upstream.timeout_ms, 5000);
    }

    #[test]
    fn route_order_is_preserved() {
        let config = Config::default_config();
        assert_eq!(config.routes[0].prefix, "/emoticons");
        assert_eq!(config.routes[1].prefix, "/shenlong");
    }
}
