//! Landing page extraction from affiliate links.
//!
//! Affiliate networks carry the merchant page in a `ulp` query parameter.
//! Links are often built by tools that percent-encode the value twice, so one
//! extra decoding pass is applied after the regular query decoding.

use url::Url;

use crate::config::ULP_PARAM;

/// The landing page named by an affiliate link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlpCandidate {
    /// Value after query-string decoding.
    pub raw: String,
    /// Value after the additional percent-decoding pass.
    pub decoded: String,
    /// Parsed landing page, present only for absolute http(s) URLs.
    pub url: Option<Url>,
}

impl UlpCandidate {
    /// Lower-cased host of the landing page, if it parsed.
    pub fn host(&self) -> Option<String> {
        self.url
            .as_ref()
            .and_then(Url::host_str)
            .map(str::to_ascii_lowercase)
    }
}

/// Extracts the landing page from an affiliate URL.
///
/// Returns `None` when the link has no (or an empty) `ulp` parameter. A
/// present but unusable value yields a candidate with `url: None`.
///
/// # Examples
///
/// ```
/// use affiliate_gateway::gateway::extract_ulp;
/// use url::Url;
///
/// let link = Url::parse("https://admitad.com/g/1?ulp=https%253A%252F%252Fshop.example%252Fitem").unwrap();
/// let ulp = extract_ulp(&link).unwrap();
/// assert_eq!(ulp.decoded, "https://shop.example/item");
/// assert_eq!(ulp.host().as_deref(), Some("shop.example"));
/// ```
pub fn extract_ulp(affiliate: &Url) -> Option<UlpCandidate> {
    let raw = affiliate
        .query_pairs()
        .find(|(key, _)| key == ULP_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())?;

    let decoded = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.clone(),
    };

    let url = Url::parse(decoded.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some());

    Some(UlpCandidate { raw, decoded, url })
}
