//! Destination decoding and allow-list validation.
//!
//! A visitor request carries the affiliate URL either verbatim under `to` or
//! base64url-encoded under `t`. Whatever the form, the decoded candidate must
//! be an absolute http(s) URL whose host is an approved affiliate tracker
//! before the gateway does anything else with it.

use std::collections::HashSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::config::MAX_URL_LENGTH;
use crate::error_handling::RejectReason;

/// How the destination was transported in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base64Url,
    Plain,
}

/// The destination parameter picked from a visitor request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRequest {
    pub raw_param: String,
    pub encoding: Encoding,
}

impl RedirectRequest {
    /// Picks the destination parameter: a non-empty `to` wins, otherwise `t`.
    ///
    /// Returns `None` when neither parameter is present.
    pub fn from_params(to: Option<&str>, t: Option<&str>) -> Option<Self> {
        match (to, t) {
            (Some(to), _) if !to.is_empty() => Some(Self {
                raw_param: to.to_string(),
                encoding: Encoding::Plain,
            }),
            (_, Some(t)) => Some(Self {
                raw_param: t.to_string(),
                encoding: Encoding::Base64Url,
            }),
            _ => None,
        }
    }

    /// The decoded destination text. Undecodable input yields an empty string.
    pub fn candidate(&self) -> String {
        match self.encoding {
            Encoding::Plain => self.raw_param.clone(),
            Encoding::Base64Url => decode_base64url(&self.raw_param),
        }
    }
}

/// Decodes URL-safe base64 with or without padding into UTF-8 text.
///
/// Any failure (bad alphabet, impossible length, invalid UTF-8) produces an
/// empty string, which validation then rejects as an invalid URL.
///
/// # Examples
///
/// ```
/// use affiliate_gateway::gateway::decode_base64url;
///
/// assert_eq!(decode_base64url("aHR0cHM6Ly9hZG1pdGFkLmNvbS9n"), "https://admitad.com/g");
/// assert_eq!(decode_base64url("!!!"), "");
/// ```
pub fn decode_base64url(input: &str) -> String {
    let mut standard: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    STANDARD
        .decode(standard.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Deploy-time set of affiliate tracker hosts, compared case-insensitively
/// and exactly (no subdomain matching).
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts(HashSet<String>);

impl AllowedHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, host: &str) -> bool {
        self.0.contains(&host.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A destination that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: Url,
    /// Lower-cased host, guaranteed to be in the allow-list.
    pub host: String,
}

impl ResolvedTarget {
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }
}

/// Decodes and validates the destination of a visitor request.
///
/// # Errors
///
/// - `InvalidUrl` when there is no candidate, it is empty, longer than
///   `MAX_URL_LENGTH`, or not an absolute URL
/// - `UnsupportedScheme` when the scheme is not http or https
/// - `DomainNotAllowed` when the host is not in `allowed`
pub fn resolve_target(
    request: Option<&RedirectRequest>,
    allowed: &AllowedHosts,
) -> Result<ResolvedTarget, RejectReason> {
    let candidate = request
        .map(RedirectRequest::candidate)
        .unwrap_or_default();
    if candidate.is_empty() || candidate.len() > MAX_URL_LENGTH {
        return Err(RejectReason::InvalidUrl);
    }

    let url = Url::parse(&candidate).map_err(|_| RejectReason::InvalidUrl)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(RejectReason::UnsupportedScheme);
    }

    let host = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .ok_or(RejectReason::InvalidUrl)?;
    if !allowed.contains(&host) {
        return Err(RejectReason::DomainNotAllowed);
    }

    Ok(ResolvedTarget { url, host })
}
