//! Alert content and HTML formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// What went wrong with a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertKind {
    /// The landing page answered 404 or 410.
    DeadLink { http_status: u16 },
    /// The affiliate link resolved to a known dead-end page.
    ProblematicRedirect {
        pattern: String,
        final_url: Option<String>,
    },
}

impl AlertKind {
    /// Value of the `type` field in notification log entries.
    pub fn log_type(&self) -> &'static str {
        match self {
            AlertKind::DeadLink { .. } => "dead_link",
            AlertKind::ProblematicRedirect { .. } => "problematic_redirect",
        }
    }
}

/// One negative verdict to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    /// Shop host (dead link) or affiliate host (problematic redirect).
    pub host: Option<String>,
    /// Landing page as carried by the link's `ulp` parameter, shown in the
    /// alert text.
    pub ulp_raw: Option<String>,
    /// Landing page after the extra decoding pass. Links that encode the same
    /// page differently share one fingerprint.
    pub ulp: Option<String>,
    /// The validated affiliate URL the visitor asked for.
    pub affiliate_url: String,
}

impl Alert {
    /// Text the throttle fingerprint is computed from: the landing page when
    /// known, otherwise the affiliate URL.
    pub fn fingerprint_source(&self) -> &str {
        self.ulp.as_deref().unwrap_or(&self.affiliate_url)
    }
}

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the operator alert. Every interpolated value is escaped.
pub fn format_alert(alert: &Alert, env_label: &str, now: DateTime<Utc>) -> String {
    let host = alert.host.as_deref().unwrap_or("unknown");
    let time = now.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut lines = Vec::with_capacity(6);
    match &alert.kind {
        AlertKind::DeadLink { http_status } => {
            lines.push(format!(
                "⚠️ <b>Dead affiliate link</b> [{}]",
                escape_html(env_label)
            ));
            lines.push(format!("Time: {time}"));
            lines.push(format!("Shop: {}", escape_html(host)));
            lines.push(format!("HTTP status: {http_status}"));
        }
        AlertKind::ProblematicRedirect { pattern, final_url } => {
            lines.push(format!(
                "🔁 <b>Problematic affiliate redirect</b> [{}]",
                escape_html(env_label)
            ));
            lines.push(format!("Time: {time}"));
            lines.push(format!("Affiliate host: {}", escape_html(host)));
            lines.push(format!("Pattern: {}", escape_html(pattern)));
            if let Some(final_url) = final_url {
                lines.push(format!("Final URL: {}", escape_html(final_url)));
            }
        }
    }

    match alert.ulp_raw.as_ref().or(alert.ulp.as_ref()) {
        Some(ulp) => lines.push(format!("ULP: <code>{}</code>", escape_html(ulp))),
        None => lines.push(format!(
            "Link: <code>{}</code>",
            escape_html(&alert.affiliate_url)
        )),
    }

    lines.join("\n")
}
