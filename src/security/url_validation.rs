//! Probe target validation (SSRF protection).
//!
//! The landing page URL arrives inside a visitor-controlled query string, so
//! the gateway would otherwise issue HEAD/GET requests to any address a visitor
//! names. Targets are refused when their host is:
//! - localhost or a `.localhost` name
//! - a private, loopback, link-local, multicast or reserved IPv4 address
//! - a loopback, unique-local, link-local or multicast IPv6 address
//!
//! Refusal is not an error for the visitor: the caller treats the target as
//! unprobeable and proceeds as if it were alive.

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::{Host, Url};

/// Why a URL must not be probed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafeTarget {
    #[error("scheme '{0}' is not probeable")]
    Scheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("localhost name '{0}'")]
    Localhost(String),
    #[error("non-public IPv4 address {0}")]
    PrivateIpv4(Ipv4Addr),
    #[error("non-public IPv6 address {0}")]
    PrivateIpv6(Ipv6Addr),
}

/// Checks that a parsed URL points at a public http(s) host.
///
/// # Examples
///
/// ```
/// use affiliate_gateway::security::check_probe_target;
/// use url::Url;
///
/// assert!(check_probe_target(&Url::parse("https://shop.example/item").unwrap()).is_ok());
/// assert!(check_probe_target(&Url::parse("http://127.0.0.1/admin").unwrap()).is_err());
/// assert!(check_probe_target(&Url::parse("http://192.168.1.1/").unwrap()).is_err());
/// ```
pub fn check_probe_target(url: &Url) -> Result<(), UnsafeTarget> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UnsafeTarget::Scheme(url.scheme().to_string()));
    }

    match url.host() {
        None => Err(UnsafeTarget::MissingHost),
        Some(Host::Domain(domain)) if is_localhost_domain(domain) => {
            Err(UnsafeTarget::Localhost(domain.to_string()))
        }
        Some(Host::Domain(_)) => Ok(()),
        Some(Host::Ipv4(ip)) if is_non_public_ipv4(ip) => Err(UnsafeTarget::PrivateIpv4(ip)),
        Some(Host::Ipv6(ip)) if is_non_public_ipv6(ip) => Err(UnsafeTarget::PrivateIpv6(ip)),
        Some(_) => Ok(()),
    }
}

/// 10/8, 172.16/12, 192.168/16, 127/8, 169.254/16, 0/8, 224/4 and 240/4.
fn is_non_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || a == 0
        || (224..=239).contains(&a)
        || a >= 240
        // 100.64/10 carrier-grade NAT
        || (a == 100 && (64..=127).contains(&b))
}

/// ::1, ::, fc00::/7, fe80::/10, ff00::/8 and IPv4-mapped non-public addresses.
fn is_non_public_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() {
        return true;
    }
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_non_public_ipv4(v4);
    }
    let first = ip.segments()[0];
    (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

fn is_localhost_domain(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    domain == "localhost" || domain == "localhost.localdomain" || domain.ends_with(".localhost")
}
