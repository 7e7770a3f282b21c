//! Visitor response construction.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, LOCATION, PRAGMA};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;
use url::Url;

use crate::config::{
    DEFAULT_FALLBACK_PATH, FALLBACK_CACHE_CONTROL, FALLBACK_EXPIRES, FALLBACK_PRAGMA,
    FALLBACK_SHOP_PARAM, FORWARD_CACHE_CONTROL, HEADER_REFERRER_POLICY, HEADER_X_ROBOTS_TAG,
    REFERRER_POLICY_VALUE, TEXT_PLAIN_UTF8, X_ROBOTS_TAG_VALUE,
};
use crate::error_handling::RejectReason;

/// Location of the fallback page, with the offending shop when known.
///
/// # Examples
///
/// ```
/// use affiliate_gateway::gateway::fallback_location;
///
/// assert_eq!(fallback_location("/out-of-stock", Some("shop.example")), "/out-of-stock?shop=shop.example");
/// assert_eq!(fallback_location("/out-of-stock", None), "/out-of-stock");
/// ```
pub fn fallback_location(fallback_path: &str, shop: Option<&str>) -> String {
    match shop.filter(|s| !s.is_empty()) {
        Some(shop) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair(FALLBACK_SHOP_PARAM, shop)
                .finish();
            let separator = if fallback_path.contains('?') { '&' } else { '?' };
            format!("{fallback_path}{separator}{query}")
        }
        None => fallback_path.to_string(),
    }
}

/// 302 to the affiliate URL.
pub fn forward(target: &Url) -> Response {
    let Ok(location) = HeaderValue::from_str(target.as_str()) else {
        return reject(RejectReason::InvalidUrl);
    };

    let mut headers = privacy_headers();
    headers.insert(LOCATION, location);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(FORWARD_CACHE_CONTROL));
    (StatusCode::FOUND, headers).into_response()
}

/// 302 to the fallback page, never cacheable.
pub fn divert(fallback_path: &str, shop: Option<&str>) -> Response {
    let location = fallback_location(fallback_path, shop);
    let location = HeaderValue::from_str(&location)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_FALLBACK_PATH));

    let mut headers = privacy_headers();
    headers.insert(LOCATION, location);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(FALLBACK_CACHE_CONTROL));
    headers.insert(PRAGMA, HeaderValue::from_static(FALLBACK_PRAGMA));
    headers.insert(EXPIRES, HeaderValue::from_static(FALLBACK_EXPIRES));
    (StatusCode::FOUND, headers).into_response()
}

/// 400 with the plain-text reason.
pub fn reject(reason: RejectReason) -> Response {
    (
        StatusCode::BAD_REQUEST,
        [(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
        reason.to_string(),
    )
        .into_response()
}

fn privacy_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(HEADER_REFERRER_POLICY),
        HeaderValue::from_static(REFERRER_POLICY_VALUE),
    );
    headers.insert(
        HeaderName::from_static(HEADER_X_ROBOTS_TAG),
        HeaderValue::from_static(X_ROBOTS_TAG_VALUE),
    );
    headers
}
