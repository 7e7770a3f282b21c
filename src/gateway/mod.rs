//! The redirect pipeline.
//!
//! Decoder → validator → (optional) chain inspector → prober → notifier
//! (negative verdicts only) → response composer.
//!
//! Each request runs the stages in order and owns everything it touches. The
//! only state shared between requests is the notifier's counter in the
//! external store and the read-only statistics.

mod chain;
mod compose;
mod decode;
mod probe;
mod ulp;

use std::sync::Arc;

use axum::response::Response;

use crate::error_handling::{GatewayStats, OutcomeType, RejectReason};
use crate::notify::{Alert, AlertKind, NotifyOutcome, ThrottledNotifier};

pub use chain::{ChainInspector, RedirectChainVerdict};
pub use compose::{divert, fallback_location, forward, reject};
pub use decode::{
    decode_base64url, resolve_target, AllowedHosts, Encoding, RedirectRequest, ResolvedTarget,
};
pub use probe::{is_dead_status, probe, ProbeOutcome, ProbeVerdict, Prober};
pub use ulp::{extract_ulp, UlpCandidate};

/// Why a visitor was sent to the fallback page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DivertReason {
    DeadLink { http_status: u16 },
    ProblematicRedirect { pattern: String },
}

/// What the gateway decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayDecision {
    /// Send the visitor to the affiliate URL.
    Forward(ResolvedTarget),
    /// Send the visitor to the fallback page.
    Divert {
        shop: Option<String>,
        reason: DivertReason,
        notify: NotifyOutcome,
    },
    /// Malformed or disallowed destination.
    Reject(RejectReason),
}

/// Everything a request needs, built once at startup.
pub struct Gateway {
    allowed_hosts: AllowedHosts,
    chain_inspector: Option<ChainInspector>,
    prober: Prober,
    notifier: ThrottledNotifier,
    fallback_path: String,
    stats: Arc<GatewayStats>,
}

impl Gateway {
    /// `chain_inspector: None` disables redirect-chain inspection.
    pub fn new(
        allowed_hosts: AllowedHosts,
        chain_inspector: Option<ChainInspector>,
        prober: Prober,
        notifier: ThrottledNotifier,
        fallback_path: impl Into<String>,
        stats: Arc<GatewayStats>,
    ) -> Self {
        Self {
            allowed_hosts,
            chain_inspector,
            prober,
            notifier,
            fallback_path: fallback_path.into(),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<GatewayStats> {
        &self.stats
    }

    pub fn notifier(&self) -> &ThrottledNotifier {
        &self.notifier
    }

    /// Runs the pipeline and renders the visitor response.
    pub async fn handle(&self, request: Option<&RedirectRequest>) -> Response {
        match self.decide(request).await {
            GatewayDecision::Forward(target) => forward(&target.url),
            GatewayDecision::Divert { shop, .. } => divert(&self.fallback_path, shop.as_deref()),
            GatewayDecision::Reject(reason) => reject(reason),
        }
    }

    /// Runs the pipeline. Never fails: every outbound problem resolves to a
    /// forward.
    pub async fn decide(&self, request: Option<&RedirectRequest>) -> GatewayDecision {
        let target = match resolve_target(request, &self.allowed_hosts) {
            Ok(target) => target,
            Err(reason) => {
                log::debug!("Rejected redirect request: {reason}");
                self.stats.increment(OutcomeType::Rejected);
                return GatewayDecision::Reject(reason);
            }
        };

        let ulp = extract_ulp(&target.url);

        if let Some(inspector) = &self.chain_inspector {
            let chain = inspector.inspect(&target.url).await;
            if chain.is_problematic {
                return self.divert_problematic(&target, ulp.as_ref(), chain).await;
            }
        }

        match self.prober.check(ulp.as_ref()).await {
            ProbeVerdict::Dead { http_status, host } => {
                self.divert_dead(&target, ulp.as_ref(), http_status, host)
                    .await
            }
            verdict => {
                if matches!(verdict, ProbeVerdict::Indeterminate { .. }) {
                    self.stats.increment(OutcomeType::ProbeIndeterminate);
                }
                self.stats.increment(OutcomeType::Forwarded);
                log::debug!("Forwarding to {} ({verdict:?})", target.host);
                GatewayDecision::Forward(target)
            }
        }
    }

    async fn divert_problematic(
        &self,
        target: &ResolvedTarget,
        ulp: Option<&UlpCandidate>,
        chain: RedirectChainVerdict,
    ) -> GatewayDecision {
        let pattern = chain.matched_pattern.unwrap_or_default();
        log::info!(
            "Affiliate link via {} ends on '{pattern}', diverting",
            target.host
        );
        self.stats.increment(OutcomeType::DivertedProblematicRedirect);

        let alert = Alert {
            kind: AlertKind::ProblematicRedirect {
                pattern: pattern.clone(),
                final_url: chain.final_url,
            },
            host: chain.affiliate_host.or_else(|| Some(target.host.clone())),
            ulp_raw: ulp.map(|u| u.raw.clone()),
            ulp: ulp.map(|u| u.decoded.clone()),
            affiliate_url: target.url.to_string(),
        };
        let notify = self.notify(&alert).await;

        GatewayDecision::Divert {
            shop: ulp.and_then(UlpCandidate::host),
            reason: DivertReason::ProblematicRedirect { pattern },
            notify,
        }
    }

    async fn divert_dead(
        &self,
        target: &ResolvedTarget,
        ulp: Option<&UlpCandidate>,
        http_status: u16,
        host: Option<String>,
    ) -> GatewayDecision {
        log::info!(
            "Landing page on {} answered {http_status}, diverting",
            host.as_deref().unwrap_or("unknown host")
        );
        self.stats.increment(OutcomeType::DivertedDeadLink);

        let alert = Alert {
            kind: AlertKind::DeadLink { http_status },
            host: host.clone(),
            ulp_raw: ulp.map(|u| u.raw.clone()),
            ulp: ulp.map(|u| u.decoded.clone()),
            affiliate_url: target.url.to_string(),
        };
        let notify = self.notify(&alert).await;

        GatewayDecision::Divert {
            shop: host,
            reason: DivertReason::DeadLink { http_status },
            notify,
        }
    }

    async fn notify(&self, alert: &Alert) -> NotifyOutcome {
        let outcome = self.notifier.notify(alert).await;
        match &outcome {
            NotifyOutcome::Sent { .. } => self.stats.increment(OutcomeType::AlertSent),
            NotifyOutcome::Throttled { .. } => self.stats.increment(OutcomeType::AlertThrottled),
            NotifyOutcome::DeliveryFailed { .. } => {
                self.stats.increment(OutcomeType::AlertDeliveryFailed)
            }
            NotifyOutcome::StoreUnavailable => {
                self.stats.increment(OutcomeType::StoreUnavailable)
            }
            NotifyOutcome::Disabled => {}
        }
        outcome
    }
}
