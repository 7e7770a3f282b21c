//! Operator alerts for dead and misrouted destinations.
//!
//! - `message`: alert content and HTML rendering
//! - `messenger`: delivery to the messaging endpoint (Telegram)
//! - `throttle`: per-destination counting and the alert ceiling

mod message;
mod messenger;
mod throttle;

pub use message::{escape_html, format_alert, Alert, AlertKind};
pub use messenger::{DeliveryReport, Messenger, TelegramMessenger};
pub use throttle::{fingerprint, NotificationLogEntry, NotifyOutcome, ThrottledNotifier};
