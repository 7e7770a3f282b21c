//! Application initialization and resource setup.
//!
//! This module builds every shared resource from `Config`:
//! - logger
//! - HTTP clients (probe, chain inspection, services)
//! - key-value store and messenger
//! - the assembled `Gateway`
//!
//! A missing store or messenger is not an error: the gateway runs with
//! notifications disabled and says so in the log.

mod client;
mod logger;

use std::sync::Arc;

use reqwest::Client;

use crate::config::{Config, StoreBackend, MAX_REDIRECT_HOPS};
use crate::error_handling::{GatewayStats, InitializationError};
use crate::gateway::{AllowedHosts, ChainInspector, Gateway, Prober};
use crate::notify::{Messenger, TelegramMessenger, ThrottledNotifier};
use crate::store::{KvStore, MemoryStore, RestStore};

// Re-export public API
pub use client::{init_chain_client, init_probe_client, init_service_client};
pub use logger::init_logger_with;

/// Builds the configured key-value store, or `None` when there is none.
pub fn init_store(config: &Config, client: Client) -> Option<Arc<dyn KvStore>> {
    match config.store {
        StoreBackend::Disabled => {
            log::info!("Key-value store disabled, alerts will not be sent");
            None
        }
        StoreBackend::Memory => {
            log::info!("Using in-memory key-value store (single instance only)");
            Some(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Rest => match (
            non_blank(config.kv_rest_url.as_deref()),
            non_blank(config.kv_rest_token.as_deref()),
        ) {
            (Some(url), Some(token)) => Some(Arc::new(RestStore::new(
                client,
                url,
                token,
                config.store_timeout(),
            ))),
            _ => {
                log::warn!(
                    "KV_REST_API_URL or KV_REST_API_TOKEN not set, alerts will not be sent"
                );
                None
            }
        },
    }
}

/// Builds the Telegram messenger, or `None` when credentials are missing.
pub fn init_messenger(config: &Config, client: Client) -> Option<Arc<dyn Messenger>> {
    match TelegramMessenger::from_config(client, config) {
        Ok(messenger) => Some(Arc::new(messenger)),
        Err(e) => {
            log::warn!("{e}, alerts will not be sent");
            None
        }
    }
}

/// Assembles the gateway from configuration.
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if an HTTP client cannot be
/// built, or `ConfigError` if the allow-list is empty.
pub fn init_gateway(
    config: &Config,
    stats: Arc<GatewayStats>,
) -> Result<Gateway, InitializationError> {
    let allowed_hosts = AllowedHosts::new(&config.allowed_hosts);
    if allowed_hosts.is_empty() {
        return Err(InitializationError::ConfigError(
            "affiliate host allow-list is empty".to_string(),
        ));
    }

    let service_client = init_service_client()?;
    let store = init_store(config, service_client.clone());
    let messenger = init_messenger(config, service_client);
    let notifier = ThrottledNotifier::new(
        store,
        messenger,
        config.env_label.clone(),
        config.alert_ceiling,
        config.throttle_ttl(),
    );

    let chain_inspector = if config.skip_chain_inspection {
        None
    } else {
        Some(ChainInspector::new(
            init_chain_client(config)?,
            &config.problematic_patterns,
            config.chain_timeout(),
            MAX_REDIRECT_HOPS,
            config.allow_private_targets,
        ))
    };

    let prober = Prober::new(
        init_probe_client(config)?,
        config.head_timeout(),
        config.get_timeout(),
        config.allow_private_targets,
    );

    log::info!(
        "Gateway ready: {} allowed hosts, chain inspection {}, alerts {}",
        allowed_hosts.len(),
        if chain_inspector.is_some() { "on" } else { "off" },
        if notifier.is_enabled() { "on" } else { "off" },
    );

    Ok(Gateway::new(
        allowed_hosts,
        chain_inspector,
        prober,
        notifier,
        config.fallback_path.clone(),
        stats,
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
