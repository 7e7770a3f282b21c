//! HTTP handlers.

mod diag;
mod go;
mod metrics;
mod status;

pub use diag::diag_telegram_handler;
pub use go::go_handler;
pub use metrics::{metrics_handler, render_metrics};
pub use status::{health_handler, status_handler};
