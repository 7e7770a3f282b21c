//! Landing page liveness probing.
//!
//! The verdict policy is one-sided: only an explicit 404 or 410 marks a page
//! dead. Merchants routinely answer automated requests with 403,
//! 405, 429 or 5xx while the page works fine for visitors, so every other
//! status counts as alive and every failure as indeterminate.

use std::time::Duration;

use reqwest::{Client, Method};
use url::Url;

use crate::config::{PROBE_ACCEPT, PROBE_ACCEPT_LANGUAGE};
use crate::error_handling::{categorize_reqwest_error, ProbeFailure};
use crate::gateway::ulp::UlpCandidate;
use crate::security::check_probe_target;

/// Result of a single probe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A response arrived (after following redirects).
    Status(u16),
    /// No response within the budget.
    Failed(ProbeFailure),
}

/// Liveness of a landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    Alive,
    Dead { http_status: u16, host: Option<String> },
    Indeterminate { host: Option<String> },
}

impl ProbeVerdict {
    pub fn is_dead(&self) -> bool {
        matches!(self, ProbeVerdict::Dead { .. })
    }
}

/// True for the statuses that mean "this page is gone".
pub fn is_dead_status(status: u16) -> bool {
    status == 404 || status == 410
}

/// Sends one probe request and reports its status or failure category.
///
/// The whole exchange (connect, redirects, response headers) is bounded by
/// `timeout`. The response body is never read.
pub async fn probe(client: &Client, url: &Url, method: Method, timeout: Duration) -> ProbeOutcome {
    let mut request = client.request(method.clone(), url.clone());
    if method == Method::GET {
        request = request
            .header(reqwest::header::ACCEPT, PROBE_ACCEPT)
            .header(reqwest::header::ACCEPT_LANGUAGE, PROBE_ACCEPT_LANGUAGE);
    }

    match tokio::time::timeout(timeout, request.send()).await {
        Ok(Ok(response)) => ProbeOutcome::Status(response.status().as_u16()),
        Ok(Err(e)) => ProbeOutcome::Failed(categorize_reqwest_error(&e)),
        Err(_) => ProbeOutcome::Failed(ProbeFailure::Timeout),
    }
}

/// HEAD-then-GET landing page checker.
#[derive(Debug, Clone)]
pub struct Prober {
    client: Client,
    head_timeout: Duration,
    get_timeout: Duration,
    allow_private_targets: bool,
}

impl Prober {
    pub fn new(
        client: Client,
        head_timeout: Duration,
        get_timeout: Duration,
        allow_private_targets: bool,
    ) -> Self {
        Self {
            client,
            head_timeout,
            get_timeout,
            allow_private_targets,
        }
    }

    /// Decides whether the landing page is alive.
    ///
    /// - no landing page: `Alive` (nothing to check)
    /// - landing page that is not an absolute http(s) URL: `Indeterminate`
    /// - landing page on a non-public address: `Indeterminate`, not contacted
    /// - HEAD 404/410: `Dead`
    /// - otherwise GET: 404/410 `Dead`, failure `Indeterminate`, else `Alive`
    pub async fn check(&self, ulp: Option<&UlpCandidate>) -> ProbeVerdict {
        let Some(ulp) = ulp else {
            return ProbeVerdict::Alive;
        };
        let host = ulp.host();
        let Some(url) = ulp.url.as_ref() else {
            log::debug!("Landing page '{}' is not an absolute http(s) URL", ulp.decoded);
            return ProbeVerdict::Indeterminate { host };
        };

        if !self.allow_private_targets {
            if let Err(e) = check_probe_target(url) {
                log::warn!("Refusing to probe {url}: {e}");
                return ProbeVerdict::Indeterminate { host };
            }
        }

        match probe(&self.client, url, Method::HEAD, self.head_timeout).await {
            ProbeOutcome::Status(status) if is_dead_status(status) => {
                log::debug!("HEAD {url} -> {status}");
                return ProbeVerdict::Dead {
                    http_status: status,
                    host,
                };
            }
            ProbeOutcome::Status(status) => {
                log::debug!("HEAD {url} -> {status}, confirming with GET")
            }
            ProbeOutcome::Failed(failure) => {
                log::debug!("HEAD {url} failed ({failure}), trying GET")
            }
        }

        match probe(&self.client, url, Method::GET, self.get_timeout).await {
            ProbeOutcome::Status(status) if is_dead_status(status) => {
                log::debug!("GET {url} -> {status}");
                ProbeVerdict::Dead {
                    http_status: status,
                    host,
                }
            }
            ProbeOutcome::Status(status) => {
                log::debug!("GET {url} -> {status}");
                ProbeVerdict::Alive
            }
            ProbeOutcome::Failed(failure) => {
                log::debug!("GET {url} failed ({failure}), failing open");
                ProbeVerdict::Indeterminate { host }
            }
        }
    }
}
