//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. Every option can also be supplied through the environment
//! (and therefore a `.env` file), which is how the gateway is usually deployed.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    ALERT_CEILING, CHAIN_INSPECTION_TIMEOUT_MS, DEFAULT_ALLOWED_HOSTS, DEFAULT_BIND_ADDR,
    DEFAULT_ENV_LABEL, DEFAULT_FALLBACK_PATH, DEFAULT_PROBLEMATIC_PATTERNS,
    DEFAULT_TELEGRAM_API_BASE, DEFAULT_USER_AGENT, GET_PROBE_TIMEOUT_MS, HEAD_PROBE_TIMEOUT_MS,
    MESSENGER_TIMEOUT_MS, STORE_TIMEOUT_MS, THROTTLE_TTL_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: One JSON object per line for log shippers
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which key-value store backs the alert throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Authenticated REST endpoint (Upstash / Vercel KV compatible)
    Rest,
    /// Process-local store; only meaningful for a single instance
    Memory,
    /// No store: alerts are never sent
    Disabled,
}

/// Gateway configuration.
///
/// Parsed from the command line and environment by the binary. The library
/// builds it programmatically through `Default` and struct update syntax.
///
/// # Examples
///
/// ```no_run
/// use affiliate_gateway::{Config, StoreBackend};
///
/// let config = Config {
///     allowed_hosts: vec!["admitad.com".to_string()],
///     store: StoreBackend::Memory,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "affiliate_gateway",
    version,
    about = "Affiliate-link redirect gateway with dead-link detection"
)]
pub struct Config {
    /// Address the HTTP listener binds to
    #[arg(long, env = "GATEWAY_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Log level
    #[arg(long, env = "GATEWAY_LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, env = "GATEWAY_LOG_FORMAT", value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Affiliate tracker hosts a destination may point at (comma separated)
    #[arg(
        long,
        env = "AFF_HOSTS",
        value_delimiter = ',',
        default_values_t = default_allowed_hosts()
    )]
    pub allowed_hosts: Vec<String>,

    /// Final-URL substrings that mark an affiliate click-through as broken
    #[arg(
        long,
        env = "PROBLEMATIC_REDIRECT_PATTERNS",
        value_delimiter = ',',
        default_values_t = default_problematic_patterns()
    )]
    pub problematic_patterns: Vec<String>,

    /// Do not follow the affiliate link before probing the landing page
    #[arg(long, env = "GATEWAY_SKIP_CHAIN_INSPECTION")]
    pub skip_chain_inspection: bool,

    /// Path visitors are diverted to when the destination is gone
    #[arg(long, env = "GATEWAY_FALLBACK_PATH", default_value = DEFAULT_FALLBACK_PATH)]
    pub fallback_path: String,

    /// Environment tag printed in alerts
    #[arg(long, env = "GATEWAY_ENV", default_value = DEFAULT_ENV_LABEL)]
    pub env_label: String,

    /// Key-value store backing the alert throttle
    #[arg(long = "store", env = "GATEWAY_STORE", value_enum, default_value = "rest")]
    pub store: StoreBackend,

    /// REST endpoint of the key-value store
    #[arg(long, env = "KV_REST_API_URL")]
    pub kv_rest_url: Option<String>,

    /// Bearer token of the key-value store
    #[arg(long, env = "KV_REST_API_TOKEN", hide_env_values = true)]
    pub kv_rest_token: Option<String>,

    /// Telegram bot token used for alerts
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat receiving alerts
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_TELEGRAM_API_BASE)]
    pub telegram_api_base: String,

    /// HEAD probe timeout in milliseconds
    #[arg(long, default_value_t = HEAD_PROBE_TIMEOUT_MS)]
    pub head_timeout_ms: u64,

    /// GET probe timeout in milliseconds
    #[arg(long, default_value_t = GET_PROBE_TIMEOUT_MS)]
    pub get_timeout_ms: u64,

    /// Redirect-chain inspection timeout in milliseconds
    #[arg(long, default_value_t = CHAIN_INSPECTION_TIMEOUT_MS)]
    pub chain_timeout_ms: u64,

    /// Key-value store command timeout in milliseconds
    #[arg(long, default_value_t = STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    /// Alert delivery timeout in milliseconds
    #[arg(long, default_value_t = MESSENGER_TIMEOUT_MS)]
    pub messenger_timeout_ms: u64,

    /// HTTP User-Agent header value for probes
    #[arg(long, env = "GATEWAY_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Alerts allowed per destination per throttle window
    #[arg(long, default_value_t = ALERT_CEILING)]
    pub alert_ceiling: i64,

    /// Throttle window and notification log lifetime in seconds
    #[arg(long, default_value_t = THROTTLE_TTL_SECS)]
    pub throttle_ttl_secs: u64,

    /// Probe destinations on private, loopback and link-local addresses
    #[arg(long, env = "GATEWAY_ALLOW_PRIVATE_TARGETS")]
    pub allow_private_targets: bool,

    /// Expose the /api/diag-telegram diagnostic endpoint
    #[arg(long = "enable-diag", env = "GATEWAY_ENABLE_DIAG")]
    pub enable_diag: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            allowed_hosts: default_allowed_hosts(),
            problematic_patterns: default_problematic_patterns(),
            skip_chain_inspection: false,
            fallback_path: DEFAULT_FALLBACK_PATH.to_string(),
            env_label: DEFAULT_ENV_LABEL.to_string(),
            store: StoreBackend::Rest,
            kv_rest_url: None,
            kv_rest_token: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            head_timeout_ms: HEAD_PROBE_TIMEOUT_MS,
            get_timeout_ms: GET_PROBE_TIMEOUT_MS,
            chain_timeout_ms: CHAIN_INSPECTION_TIMEOUT_MS,
            store_timeout_ms: STORE_TIMEOUT_MS,
            messenger_timeout_ms: MESSENGER_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            alert_ceiling: ALERT_CEILING,
            throttle_ttl_secs: THROTTLE_TTL_SECS,
            allow_private_targets: false,
            enable_diag: false,
        }
    }
}

impl Config {
    pub fn head_timeout(&self) -> Duration {
        Duration::from_millis(self.head_timeout_ms)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn chain_timeout(&self) -> Duration {
        Duration::from_millis(self.chain_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn messenger_timeout(&self) -> Duration {
        Duration::from_millis(self.messenger_timeout_ms)
    }

    pub fn throttle_ttl(&self) -> Duration {
        Duration::from_secs(self.throttle_ttl_secs)
    }
}

fn default_allowed_hosts() -> Vec<String> {
    DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_problematic_patterns() -> Vec<String> {
    DEFAULT_PROBLEMATIC_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}
