//! Configuration schema for Insight.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root config for the Insight workflow engine and server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InsightConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

impl InsightConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> InsightConfigBuilder {
        InsightConfigBuilder::new()
    }
}

/// Builder for assembling an `InsightConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct InsightConfigBuilder {
    config: InsightConfig,
}

impl InsightConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: InsightConfig::default(),
        }
    }

    /// Replace the workflow buffer and stream settings.
    pub fn workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.config.workflow = workflow;
        self
    }

    /// Replace the simulated latency settings.
    pub fn latency(mut self, latency: LatencyConfig) -> Self {
        self.config.latency = latency;
        self
    }

    /// Replace the simulated chain settings.
    pub fn anchor(mut self, anchor: AnchorConfig) -> Self {
        self.config.anchor = anchor;
        self
    }

    /// Replace the HTTP server settings.
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Replace the contact relay settings.
    pub fn mail(mut self, mail: MailConfig) -> Self {
        self.config.mail = mail;
        self
    }

    /// Finalize and return the built `InsightConfig`.
    pub fn build(self) -> InsightConfig {
        self.config
    }
}

/// Record buffer and live stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Most-recent-N window kept in memory.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Records produced by a batch generation when no count is given.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Period between live stream appends.
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,
    /// Oldest offset a batch record may be stamped with.
    #[serde(default = "default_batch_lookback_secs")]
    pub batch_lookback_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            batch_size: default_batch_size(),
            stream_interval_ms: default_stream_interval_ms(),
            batch_lookback_secs: default_batch_lookback_secs(),
        }
    }
}

impl WorkflowConfig {
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

fn default_buffer_capacity() -> usize {
    50
}

fn default_batch_size() -> usize {
    25
}

fn default_stream_interval_ms() -> u64 {
    1500
}

/// One day.
fn default_batch_lookback_secs() -> u64 {
    86_400
}

/// Artificial delays used to render multi-stage progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_capsule_ms")]
    pub capsule_ms: u64,
    #[serde(default = "default_preparing_ms")]
    pub anchor_preparing_ms: u64,
    #[serde(default = "default_broadcasting_ms")]
    pub anchor_broadcasting_ms: u64,
    #[serde(default = "default_confirming_ms")]
    pub anchor_confirming_ms: u64,
    #[serde(default = "default_verify_ms")]
    pub verify_ms: u64,
    /// Delay applied by the mock REST services.
    #[serde(default = "default_api_ms")]
    pub api_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            capsule_ms: default_capsule_ms(),
            anchor_preparing_ms: default_preparing_ms(),
            anchor_broadcasting_ms: default_broadcasting_ms(),
            anchor_confirming_ms: default_confirming_ms(),
            verify_ms: default_verify_ms(),
            api_ms: default_api_ms(),
        }
    }
}

impl LatencyConfig {
    /// All delays set to zero.
    pub fn instant() -> Self {
        Self {
            capsule_ms: 0,
            anchor_preparing_ms: 0,
            anchor_broadcasting_ms: 0,
            anchor_confirming_ms: 0,
            verify_ms: 0,
            api_ms: 0,
        }
    }

    pub fn capsule(&self) -> Duration {
        Duration::from_millis(self.capsule_ms)
    }

    pub fn verify(&self) -> Duration {
        Duration::from_millis(self.verify_ms)
    }

    pub fn api(&self) -> Duration {
        Duration::from_millis(self.api_ms)
    }

    /// Delays for the preparing, broadcasting, and confirming phases in order.
    pub fn anchor_phases(&self) -> [Duration; 3] {
        [
            Duration::from_millis(self.anchor_preparing_ms),
            Duration::from_millis(self.anchor_broadcasting_ms),
            Duration::from_millis(self.anchor_confirming_ms),
        ]
    }
}

fn default_capsule_ms() -> u64 {
    1500
}

fn default_preparing_ms() -> u64 {
    800
}

fn default_broadcasting_ms() -> u64 {
    1200
}

fn default_confirming_ms() -> u64 {
    1500
}

fn default_verify_ms() -> u64 {
    1200
}

fn default_api_ms() -> u64 {
    300
}

/// Simulated chain parameters for the blockchain demo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    #[serde(default = "default_network")]
    pub network: String,
    /// Prefix the transaction hash is appended to.
    #[serde(default = "default_explorer_base_url")]
    pub explorer_base_url: String,
    /// Baseline block height; anchors land at a random offset above it.
    #[serde(default = "default_base_block")]
    pub base_block: u64,
    #[serde(default = "default_block_spread")]
    pub block_spread: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            explorer_base_url: default_explorer_base_url(),
            base_block: default_base_block(),
            block_spread: default_block_spread(),
            confirmations: default_confirmations(),
        }
    }
}

fn default_network() -> String {
    "ethereum-sepolia (simulated)".to_string()
}

fn default_explorer_base_url() -> String {
    "https://sepolia.etherscan.io/tx/".to_string()
}

fn default_base_block() -> u64 {
    18_500_000
}

fn default_block_spread() -> u64 {
    100_000
}

fn default_confirmations() -> u32 {
    12
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Attach permissive CORS headers for browser demos.
    #[serde(default = "default_cors")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors: default_cors(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_cors() -> bool {
    true
}

/// Contact and early-access relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Recipient of admin notifications.
    #[serde(default = "default_admin_address")]
    pub admin_address: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_product_name")]
    pub product_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            admin_address: default_admin_address(),
            from_address: default_from_address(),
            product_name: default_product_name(),
        }
    }
}

fn default_admin_address() -> String {
    "team@insight.example".to_string()
}

fn default_from_address() -> String {
    "no-reply@insight.example".to_string()
}

fn default_product_name() -> String {
    "Insight".to_string()
}
