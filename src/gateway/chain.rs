//! Affiliate redirect chain inspection.
//!
//! Some affiliate links stop reaching the merchant and land visitors on the
//! network's generic offer page instead. That page answers 200, so the only
//! way to notice is to follow the link and look at where it ends up.
//!
//! Hops are followed manually so each one can be checked against the probe
//! target guard before it is contacted.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::security::check_probe_target;

/// Result of following an affiliate link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectChainVerdict {
    pub is_problematic: bool,
    pub matched_pattern: Option<String>,
    pub final_url: Option<String>,
    pub affiliate_host: Option<String>,
}

impl RedirectChainVerdict {
    fn clean(final_url: Option<String>) -> Self {
        Self {
            final_url,
            ..Default::default()
        }
    }
}

/// Follows affiliate links with HEAD requests and matches the final URL
/// against known dead-end patterns.
#[derive(Debug, Clone)]
pub struct ChainInspector {
    client: Client,
    patterns: Vec<String>,
    timeout: Duration,
    max_hops: usize,
    allow_private_targets: bool,
}

impl ChainInspector {
    /// `client` must not follow redirects itself.
    pub fn new(
        client: Client,
        patterns: &[String],
        timeout: Duration,
        max_hops: usize,
        allow_private_targets: bool,
    ) -> Self {
        Self {
            client,
            patterns: patterns
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            timeout,
            max_hops,
            allow_private_targets,
        }
    }

    /// Follows `affiliate` and reports whether it ends on a problematic page.
    ///
    /// Transport failures, timeouts and refused hops all produce a
    /// non-problematic verdict.
    pub async fn inspect(&self, affiliate: &Url) -> RedirectChainVerdict {
        if self.patterns.is_empty() {
            return RedirectChainVerdict::default();
        }

        let final_url = match tokio::time::timeout(self.timeout, self.resolve(affiliate)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                log::debug!("Chain inspection of {affiliate} failed: {e}");
                return RedirectChainVerdict::default();
            }
            Err(_) => {
                log::debug!("Chain inspection of {affiliate} timed out");
                return RedirectChainVerdict::default();
            }
        };

        match self
            .patterns
            .iter()
            .find(|pattern| final_url.as_str().contains(pattern.as_str()))
        {
            Some(pattern) => RedirectChainVerdict {
                is_problematic: true,
                matched_pattern: Some(pattern.clone()),
                final_url: Some(final_url.to_string()),
                affiliate_host: affiliate.host_str().map(str::to_ascii_lowercase),
            },
            None => RedirectChainVerdict::clean(Some(final_url.to_string())),
        }
    }

    /// Walks the redirect chain and returns the last URL reached.
    ///
    /// A chain still redirecting after `max_hops` requests is an error: its
    /// last `Location` was never fetched and is not a final URL.
    async fn resolve(&self, start: &Url) -> anyhow::Result<Url> {
        let mut current = start.clone();

        for _ in 0..self.max_hops {
            if !self.allow_private_targets {
                check_probe_target(&current)?;
            }

            let response = self.client.head(current.clone()).send().await?;
            let status = response.status();
            if !is_followable_redirect(status) {
                return Ok(current);
            }

            let Some(location) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
            else {
                log::warn!("Redirect status {status} for {current} but no Location header");
                return Ok(current);
            };
            current = current.join(location)?;
        }

        anyhow::bail!("redirect chain exceeds {} hops", self.max_hops)
    }
}

fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_REDIRECT_HOPS;
    use httptest::{matchers::*, responders::*, Expectation, ServerBuilder};

    fn no_redirect_client() -> Client {
        Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    fn inspector(patterns: &[&str], allow_private: bool) -> ChainInspector {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ChainInspector::new(
            no_redirect_client(),
            &patterns,
            Duration::from_millis(500),
            MAX_REDIRECT_HOPS,
            allow_private,
        )
    }

    #[tokio::test]
    async fn test_final_url_matching_pattern_is_problematic() {
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        let offerwall = server.url_str("/offerwall/landing");
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/1"))
                .respond_with(status_code(302).append_header("Location", "/hop")),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/hop"))
                .respond_with(status_code(301).append_header("Location", offerwall.clone())),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/offerwall/landing"))
                .respond_with(status_code(200)),
        );

        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = inspector(&["/offerwall/"], true).inspect(&affiliate).await;
        assert!(verdict.is_problematic);
        assert_eq!(verdict.matched_pattern.as_deref(), Some("/offerwall/"));
        assert_eq!(verdict.final_url.as_deref(), Some(offerwall.as_str()));
        assert_eq!(verdict.affiliate_host.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn test_merchant_destination_is_clean() {
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/1"))
                .respond_with(status_code(302).append_header("Location", "/shop/item")),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/shop/item"))
                .respond_with(status_code(200)),
        );

        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = inspector(&["offerwall.admitad.com"], true)
            .inspect(&affiliate)
            .await;
        assert!(!verdict.is_problematic);
        assert_eq!(verdict.matched_pattern, None);
        assert_eq!(verdict.final_url, Some(server.url_str("/shop/item")));
    }

    #[tokio::test]
    async fn test_failure_is_not_problematic() {
        let affiliate = Url::parse("http://127.0.0.1:1/g/1").unwrap();
        let verdict = inspector(&["127.0.0.1"], true).inspect(&affiliate).await;
        assert_eq!(verdict, RedirectChainVerdict::default());
    }

    #[tokio::test]
    async fn test_timeout_is_not_problematic() {
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/1"))
                .respond_with(delay_and_then(Duration::from_millis(800), status_code(200))),
        );

        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = inspector(&["127.0.0.1"], true).inspect(&affiliate).await;
        assert!(!verdict.is_problematic);
    }

    #[tokio::test]
    async fn test_private_hops_are_refused() {
        // No expectations: the guard must stop before contacting the server.
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = inspector(&["127.0.0.1"], false).inspect(&affiliate).await;
        assert!(!verdict.is_problematic);
    }

    #[tokio::test]
    async fn test_chain_longer_than_hop_limit_is_not_problematic() {
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/1"))
                .respond_with(status_code(302).append_header("Location", "/g/2")),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/2"))
                .respond_with(status_code(302).append_header("Location", "/g/3")),
        );
        server.expect(
            Expectation::matching(request::method_path("HEAD", "/g/3"))
                .respond_with(status_code(302).append_header("Location", "/offerwall/x")),
        );

        // Three requests are spent before /offerwall/x would be fetched.
        let patterns = vec!["/offerwall/".to_string()];
        let limited = ChainInspector::new(
            no_redirect_client(),
            &patterns,
            Duration::from_millis(500),
            3,
            true,
        );
        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = limited.inspect(&affiliate).await;
        assert_eq!(verdict, RedirectChainVerdict::default());
    }

    #[tokio::test]
    async fn test_no_patterns_skips_requests() {
        let server = ServerBuilder::new().bind_addr(([127, 0, 0, 1], 0).into()).run().unwrap();
        let affiliate = Url::parse(&server.url_str("/g/1")).unwrap();
        let verdict = inspector(&["", "  "], true).inspect(&affiliate).await;
        assert_eq!(verdict, RedirectChainVerdict::default());
    }

    #[test]
    fn test_followable_redirects() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_followable_redirect(StatusCode::from_u16(code).unwrap()));
        }
        for code in [200, 304, 404] {
            assert!(!is_followable_redirect(StatusCode::from_u16(code).unwrap()));
        }
    }
}
