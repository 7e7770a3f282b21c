//! Configuration constants.
//!
//! This module defines the constants used throughout the gateway, including
//! probe timeouts, throttle limits, and store key prefixes. Most of them are
//! defaults for the matching `Config` option.

use std::time::Duration;

/// Default bind address of the HTTP listener.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Affiliate tracker hosts accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "bywiola.com",
    "uuwgc.com",
    "qwpeg.com",
    "xpuvo.com",
    "admitad.com",
    "actionpay.net",
    "cityads.com",
    "effiliation.com",
];

/// Final-URL substrings that mark a click-through as a dead end.
///
/// Admitad occasionally lands visitors on its generic offerwall instead of the
/// merchant page; that page answers 200 and can only be recognised by URL.
pub const DEFAULT_PROBLEMATIC_PATTERNS: &[&str] = &["offerwall.admitad.com"];

/// Static page visitors are diverted to when the destination is gone.
pub const DEFAULT_FALLBACK_PATH: &str = "/out-of-stock";

/// Environment tag printed in alert messages.
pub const DEFAULT_ENV_LABEL: &str = "production";

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Query parameter of the affiliate URL carrying the landing page.
pub const ULP_PARAM: &str = "ulp";

/// Query parameter carrying a plain destination URL.
pub const PLAIN_PARAM: &str = "to";

/// Query parameter carrying a base64url-encoded destination URL.
pub const BASE64_PARAM: &str = "t";

/// Query parameter of the fallback page naming the offending shop.
pub const FALLBACK_SHOP_PARAM: &str = "shop";

/// Maximum accepted length of a decoded destination URL (2048 characters).
/// Matches common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;

// Outbound timeouts (milliseconds)
/// Budget for the cheap HEAD probe of the landing page.
pub const HEAD_PROBE_TIMEOUT_MS: u64 = 2_500;
/// Budget for the fuller GET probe of the landing page.
pub const GET_PROBE_TIMEOUT_MS: u64 = 4_500;
/// Budget for following the affiliate link's own redirect chain.
pub const CHAIN_INSPECTION_TIMEOUT_MS: u64 = 3_500;
/// Budget for a single key-value store command.
pub const STORE_TIMEOUT_MS: u64 = 2_000;
/// Budget for delivering one alert message.
pub const MESSENGER_TIMEOUT_MS: u64 = 4_000;
/// TCP connection timeout shared by all outbound clients.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum number of redirect hops followed by probes and chain inspection.
pub const MAX_REDIRECT_HOPS: usize = 10;

// Throttle
/// Alerts permitted per fingerprint per throttle window.
pub const ALERT_CEILING: i64 = 2;
/// Lifetime of throttle counters and notification log entries (24 hours).
pub const THROTTLE_TTL_SECS: u64 = 86_400;

// Store key prefixes
/// Prefix of the per-fingerprint dead-link counter.
pub const COUNTER_KEY_PREFIX: &str = "dead:";
/// Prefix of the per-attempt notification log entry.
pub const NOTIFY_LOG_KEY_PREFIX: &str = "tglog:";
/// Prefix of the most recent notification log entry.
pub const NOTIFY_LOG_LAST_KEY_PREFIX: &str = "tglog:last:";

/// Default User-Agent string for probe requests.
///
/// Some merchants reject bare HTTP clients outright, which would turn a live
/// product page into a 403. A current desktop Chrome string avoids that.
/// Users can override this via the `--user-agent` flag.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Accept header sent with GET probes.
pub const PROBE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Accept-Language header sent with GET probes.
pub const PROBE_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Default text of the diagnostic messenger endpoint.
pub const DIAG_DEFAULT_TEXT: &str = "diag: hello from /api/diag-telegram";
