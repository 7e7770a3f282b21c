//! HTTP header constants for gateway responses.
//!
//! Forwarding redirects and fallback redirects carry different cache policies;
//! both hide the referring page and keep crawlers away.

/// Referrer-Policy header
pub const HEADER_REFERRER_POLICY: &str = "referrer-policy";
/// X-Robots-Tag header
pub const HEADER_X_ROBOTS_TAG: &str = "x-robots-tag";

/// Merchant must not see the catalog page the visitor came from.
pub const REFERRER_POLICY_VALUE: &str = "no-referrer";
/// Redirect endpoints must never be indexed.
pub const X_ROBOTS_TAG_VALUE: &str = "noindex, nofollow";

/// Cache-Control of a forwarding redirect.
pub const FORWARD_CACHE_CONTROL: &str = "no-store";

/// Cache-Control of a fallback redirect. A cached divert would keep hiding a
/// product after it comes back, so both browser and CDN caching are disabled.
pub const FALLBACK_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, max-age=0";
/// Pragma of a fallback redirect (HTTP/1.0 caches).
pub const FALLBACK_PRAGMA: &str = "no-cache";
/// Expires of a fallback redirect.
pub const FALLBACK_EXPIRES: &str = "0";

/// Content type of 400 responses.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
/// Content type of diagnostic JSON responses.
pub const APPLICATION_JSON_UTF8: &str = "application/json; charset=utf-8";
