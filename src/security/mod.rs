//! Outbound request safety.
//!
//! Landing pages and affiliate links are supplied by visitors; this module
//! decides which of them the gateway is willing to contact.

mod url_validation;

pub use url_validation::{check_probe_target, UnsafeTarget};
