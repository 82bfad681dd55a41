use crate::error::CrmResult;
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `DONOR_CRM__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Populate the in-memory store with demo donors at startup.
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
    /// Audit entries kept in memory; the oldest are evicted first.
    #[serde(default = "default_audit_log_capacity")]
    pub audit_log_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Maximum donors returned by a segment preview.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
}

// Default functions
fn default_node_id() -> String {
    "crm-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_seed_demo_data() -> bool {
    true
}
fn default_audit_log_capacity() -> usize {
    10_000
}
fn default_preview_limit() -> usize {
    50
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: default_seed_demo_data(),
            audit_log_capacity: default_audit_log_capacity(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            preview_limit: default_preview_limit(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            store: StoreConfig::default(),
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> CrmResult<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("DONOR_CRM")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}
