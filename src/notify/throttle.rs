//! Throttled alert delivery.
//!
//! Every negative verdict increments a per-destination counter in the shared
//! store. Alerts go out only while that counter is within the ceiling, so a
//! dead link that keeps receiving traffic produces at most `ceiling` messages
//! per window no matter how many gateway instances see it. The counter's
//! expiry is set by whichever request observes the value 1.
//!
//! Nothing here ever fails the visitor's request: an unreachable store means
//! no alert, and a failed delivery is only logged.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::config::{COUNTER_KEY_PREFIX, NOTIFY_LOG_KEY_PREFIX, NOTIFY_LOG_LAST_KEY_PREFIX};
use crate::notify::message::{format_alert, Alert};
use crate::notify::messenger::{DeliveryReport, Messenger};
use crate::store::KvStore;

/// Lower-case hex SHA-1 of `input`.
pub fn fingerprint(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Diagnostic record of one delivery attempt, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationLogEntry {
    pub time: String,
    pub status: Option<u16>,
    pub ok: bool,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// What the notifier did for one negative verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Alert delivered; `count` is the counter value that allowed it.
    Sent { count: i64 },
    /// Within the ceiling, but the messaging endpoint failed or refused.
    DeliveryFailed { count: i64, reason: String },
    /// Counter is past the ceiling.
    Throttled { count: i64 },
    /// The counter could not be incremented.
    StoreUnavailable,
    /// Store or messenger not configured.
    Disabled,
}

/// Counts negative verdicts and sends rate-limited alerts.
pub struct ThrottledNotifier {
    store: Option<Arc<dyn KvStore>>,
    messenger: Option<Arc<dyn Messenger>>,
    env_label: String,
    ceiling: i64,
    ttl: Duration,
}

impl ThrottledNotifier {
    pub fn new(
        store: Option<Arc<dyn KvStore>>,
        messenger: Option<Arc<dyn Messenger>>,
        env_label: impl Into<String>,
        ceiling: i64,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            messenger,
            env_label: env_label.into(),
            ceiling,
            ttl,
        }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Self::new(None, None, "", 0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some() && self.messenger.is_some()
    }

    /// The messenger, shared with the diagnostic endpoint.
    pub fn messenger(&self) -> Option<&Arc<dyn Messenger>> {
        self.messenger.as_ref()
    }

    /// Records one negative verdict and sends an alert when allowed.
    pub async fn notify(&self, alert: &Alert) -> NotifyOutcome {
        let (Some(store), Some(messenger)) = (&self.store, &self.messenger) else {
            log::debug!("Notifier disabled, skipping alert for {:?}", alert.host);
            return NotifyOutcome::Disabled;
        };

        let fp = fingerprint(alert.fingerprint_source());
        let counter_key = format!("{COUNTER_KEY_PREFIX}{fp}");

        let count = match store.incr(&counter_key).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Alert counter {counter_key} not incremented: {e}");
                return NotifyOutcome::StoreUnavailable;
            }
        };

        if count == 1 {
            if let Err(e) = store.expire(&counter_key, self.ttl).await {
                log::warn!("Failed to set expiry on {counter_key}: {e}");
            }
        }

        if count > self.ceiling {
            log::debug!(
                "Alert for {fp} throttled (count {count} > {})",
                self.ceiling
            );
            return NotifyOutcome::Throttled { count };
        }

        let text = format_alert(alert, &self.env_label, Utc::now());
        let (entry, outcome) = match messenger.send(&text).await {
            Ok(report) => {
                let outcome = delivery_outcome(&report, count);
                (log_entry(alert, Some(report.status), report.ok, report.body), outcome)
            }
            Err(e) => {
                let reason = e.to_string();
                (
                    log_entry(alert, None, false, reason.clone()),
                    NotifyOutcome::DeliveryFailed { count, reason },
                )
            }
        };

        match &outcome {
            NotifyOutcome::Sent { .. } => {
                log::info!("Alert sent for {fp} ({}, count {count})", entry.kind)
            }
            _ => log::warn!("Alert delivery failed for {fp}: {:?}", outcome),
        }

        self.write_log(&**store, &fp, count, &entry).await;
        outcome
    }

    async fn write_log(
        &self,
        store: &dyn KvStore,
        fp: &str,
        count: i64,
        entry: &NotificationLogEntry,
    ) {
        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to serialize notification log entry: {e}");
                return;
            }
        };

        let keys = [
            format!("{NOTIFY_LOG_KEY_PREFIX}{fp}:{count}"),
            format!("{NOTIFY_LOG_LAST_KEY_PREFIX}{fp}"),
        ];
        for key in keys {
            if let Err(e) = store.set(&key, &value, Some(self.ttl)).await {
                log::warn!("Failed to write notification log {key}: {e}");
            }
        }
    }
}

fn delivery_outcome(report: &DeliveryReport, count: i64) -> NotifyOutcome {
    if report.ok {
        NotifyOutcome::Sent { count }
    } else {
        NotifyOutcome::DeliveryFailed {
            count,
            reason: format!("HTTP {}", report.status),
        }
    }
}

fn log_entry(alert: &Alert, status: Option<u16>, ok: bool, body: String) -> NotificationLogEntry {
    NotificationLogEntry {
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        status,
        ok,
        body,
        kind: alert.kind.log_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::{MessengerError, StoreError, StoreResult};
    use crate::notify::message::AlertKind;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records messages instead of sending them.
    struct RecordingMessenger {
        sent: Mutex<Vec<String>>,
        status: u16,
    }

    impl RecordingMessenger {
        fn answering(status: u16) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                status,
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, text: &str) -> Result<DeliveryReport, MessengerError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(DeliveryReport {
                status: self.status,
                ok: (200..300).contains(&self.status),
                body: format!("{{\"status\":{}}}", self.status),
            })
        }

        fn recipient(&self) -> &str {
            "test-chat"
        }
    }

    struct FailingMessenger;

    #[async_trait]
    impl Messenger for FailingMessenger {
        async fn send(&self, _text: &str) -> Result<DeliveryReport, MessengerError> {
            Err(MessengerError::Timeout(4000))
        }

        fn recipient(&self) -> &str {
            "test-chat"
        }
    }

    struct DownStore;

    #[async_trait]
    impl KvStore for DownStore {
        async fn incr(&self, _key: &str) -> StoreResult<i64> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        fn name(&self) -> &'static str {
            "down"
        }
    }

    fn dead_alert(ulp: &str) -> Alert {
        Alert {
            kind: AlertKind::DeadLink { http_status: 404 },
            host: Some("shop.example".to_string()),
            ulp_raw: Some(ulp.to_string()),
            ulp: Some(ulp.to_string()),
            affiliate_url: "https://admitad.com/g/1".to_string(),
        }
    }

    fn notifier(
        store: Arc<dyn KvStore>,
        messenger: Arc<dyn Messenger>,
    ) -> ThrottledNotifier {
        ThrottledNotifier::new(
            Some(store),
            Some(messenger),
            "test",
            2,
            Duration::from_secs(86_400),
        )
    }

    #[test]
    fn test_fingerprint_is_sha1_hex() {
        assert_eq!(fingerprint("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(fingerprint("").len(), 40);
    }

    #[tokio::test]
    async fn test_ceiling_limits_alerts() {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::answering(200));
        let notifier = notifier(store.clone(), messenger.clone());
        let alert = dead_alert("https://shop.example/item");

        assert_eq!(notifier.notify(&alert).await, NotifyOutcome::Sent { count: 1 });
        assert_eq!(notifier.notify(&alert).await, NotifyOutcome::Sent { count: 2 });
        assert_eq!(
            notifier.notify(&alert).await,
            NotifyOutcome::Throttled { count: 3 }
        );
        assert_eq!(
            notifier.notify(&alert).await,
            NotifyOutcome::Throttled { count: 4 }
        );
        assert_eq!(messenger.sent().len(), 2);

        // Another destination has its own counter.
        let other = dead_alert("https://shop.example/other");
        assert_eq!(notifier.notify(&other).await, NotifyOutcome::Sent { count: 1 });
        assert_eq!(messenger.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_counter_gets_ttl_and_log_entries_written() {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::answering(200));
        let notifier = notifier(store.clone(), messenger.clone());
        let alert = dead_alert("https://shop.example/item");
        let fp = fingerprint("https://shop.example/item");

        notifier.notify(&alert).await;

        let ttl = store.ttl(&format!("dead:{fp}")).await.unwrap();
        assert!(ttl > Duration::from_secs(86_000));

        let last = store
            .get(&format!("tglog:last:{fp}"))
            .await
            .unwrap()
            .unwrap();
        let entry: serde_json::Value = serde_json::from_str(&last).unwrap();
        assert_eq!(entry["status"], 200);
        assert_eq!(entry["ok"], true);
        assert_eq!(entry["type"], "dead_link");
        assert!(entry["time"].as_str().unwrap().ends_with('Z'));

        assert!(store
            .get(&format!("tglog:{fp}:1"))
            .await
            .unwrap()
            .is_some());
        assert!(store.ttl(&format!("tglog:{fp}:1")).await.is_some());
    }

    #[tokio::test]
    async fn test_alert_text_reaches_messenger() {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::answering(200));
        let notifier = notifier(store, messenger.clone());

        notifier
            .notify(&dead_alert("https://shop.example/item"))
            .await;

        let sent = messenger.sent();
        assert!(sent[0].contains("[test]"));
        assert!(sent[0].contains("HTTP status: 404"));
        assert!(sent[0].contains("https://shop.example/item"));
    }

    #[tokio::test]
    async fn test_store_down_means_no_alert() {
        let messenger = Arc::new(RecordingMessenger::answering(200));
        let notifier = notifier(Arc::new(DownStore), messenger.clone());

        let outcome = notifier
            .notify(&dead_alert("https://shop.example/item"))
            .await;
        assert_eq!(outcome, NotifyOutcome::StoreUnavailable);
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_logged_to_store() {
        let store = Arc::new(MemoryStore::new());
        let notifier = notifier(store.clone(), Arc::new(FailingMessenger));
        let fp = fingerprint("https://shop.example/item");

        let outcome = notifier
            .notify(&dead_alert("https://shop.example/item"))
            .await;
        assert!(matches!(outcome, NotifyOutcome::DeliveryFailed { count: 1, .. }));

        let last = store
            .get(&format!("tglog:last:{fp}"))
            .await
            .unwrap()
            .unwrap();
        let entry: serde_json::Value = serde_json::from_str(&last).unwrap();
        assert_eq!(entry["ok"], false);
        assert!(entry["status"].is_null());
        assert!(entry["body"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_rejected_delivery_counts_against_ceiling() {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::answering(403));
        let notifier = notifier(store, messenger.clone());
        let alert = dead_alert("https://shop.example/item");

        assert!(matches!(
            notifier.notify(&alert).await,
            NotifyOutcome::DeliveryFailed { count: 1, .. }
        ));
        assert!(matches!(
            notifier.notify(&alert).await,
            NotifyOutcome::DeliveryFailed { count: 2, .. }
        ));
        assert_eq!(
            notifier.notify(&alert).await,
            NotifyOutcome::Throttled { count: 3 }
        );
        assert_eq!(messenger.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_notifier() {
        let notifier = ThrottledNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert_eq!(
            notifier.notify(&dead_alert("https://shop.example/item")).await,
            NotifyOutcome::Disabled
        );

        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let notifier = ThrottledNotifier::new(Some(store), None, "test", 2, Duration::from_secs(60));
        assert_eq!(
            notifier.notify(&dead_alert("https://shop.example/item")).await,
            NotifyOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn test_concurrent_notifications_respect_ceiling() {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::answering(200));
        let notifier = Arc::new(notifier(store, messenger.clone()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let notifier = Arc::clone(&notifier);
            handles.push(tokio::spawn(async move {
                notifier
                    .notify(&dead_alert("https://shop.example/item"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(messenger.sent().len(), 2);
    }
}
