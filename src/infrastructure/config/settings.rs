use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::message::CalcStrategy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Fan-out worker pool and message template selection
#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    /// Maximum number of in-flight dispatches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-dispatch transport timeout in milliseconds
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Notifier channel every duplicate is sent on
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Template key the canonical message is bound to
    #[serde(default = "default_template")]
    pub template: String,
    /// How the `calc` placeholder is computed
    #[serde(default)]
    pub calc: CalcStrategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// "memory" or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Recipients fetched per page when streaming the active set
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// JSON fixtures loaded into the memory backend at startup
    #[serde(default)]
    pub fixtures_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// "log" or "smtp"
    #[serde(default = "default_notifier_backend")]
    pub backend: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Named pattern ("long", "medium", "short") or a chrono format string
    #[serde(default = "default_date_pattern")]
    pub date_pattern: String,
    /// Image style applied to teaser card images
    #[serde(default = "default_image_style")]
    pub image_style: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_concurrency() -> usize {
    8
}

fn default_dispatch_timeout_ms() -> u64 {
    5000
}

fn default_channel() -> String {
    "email".to_string()
}

fn default_template() -> String {
    "news_item".to_string()
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_page_size() -> usize {
    500
}

fn default_database_url() -> String {
    "postgres://localhost/news".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    600
}

fn default_notifier_backend() -> String {
    "log".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_address() -> String {
    "news@localhost".to_string()
}

fn default_date_pattern() -> String {
    "long".to_string()
}

fn default_image_style() -> String {
    "card".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "news-fanout-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("fanout.concurrency", 8)?
            .set_default("fanout.dispatch_timeout_ms", 5000)?
            .set_default("store.backend", "memory")?
            .set_default("notifier.backend", "log")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // NEWS_SERVER__PORT, NEWS_FANOUT__CONCURRENCY, NEWS_STORE__BACKEND, etc.
            .add_source(
                Environment::with_prefix("NEWS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            fanout: FanoutConfig::default(),
            store: StoreConfig::default(),
            database: DatabaseConfig::default(),
            notifier: NotifierConfig::default(),
            render: RenderConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            channel: default_channel(),
            template: default_template(),
            calc: CalcStrategy::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            page_size: default_page_size(),
            fixtures_path: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend: default_notifier_backend(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_address: default_from_address(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            date_pattern: default_date_pattern(),
            image_style: default_image_style(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.fanout.concurrency, 8);
        assert_eq!(settings.fanout.dispatch_timeout_ms, 5000);
        assert_eq!(settings.fanout.channel, "email");
        assert_eq!(settings.fanout.template, "news_item");
        assert_eq!(settings.store.backend, "memory");
        assert_eq!(settings.notifier.backend, "log");
        assert_eq!(settings.render.date_pattern, "long");
    }

    #[test]
    fn test_partial_fanout_section_fills_defaults() {
        let fanout: FanoutConfig = serde_json::from_value(serde_json::json!({
            "concurrency": 2
        }))
        .unwrap();

        assert_eq!(fanout.concurrency, 2);
        assert_eq!(fanout.channel, "email");
        assert_eq!(fanout.calc, CalcStrategy::Random);
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8081");
    }
}
