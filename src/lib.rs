//! affiliate_gateway library: the redirect pipeline behind `/go`
//!
//! Visitors are sent through `/go?to=<affiliate link>` (or `t=` with a
//! base64url-encoded link). The gateway validates the link against an
//! allow-list of affiliate hosts, optionally follows the affiliate click-through
//! to catch known-bad destinations, probes the landing page named in the
//! link's `ulp` parameter, and either forwards the visitor or diverts them to
//! a fallback page. Dead destinations raise a throttled operator alert.
//!
//! # Example
//!
//! ```no_run
//! use affiliate_gateway::{run_server, Config, StoreBackend};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     bind: "127.0.0.1:3000".to_string(),
//!     store: StoreBackend::Memory,
//!     ..Default::default()
//! };
//!
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
pub mod error_handling;
pub mod gateway;
pub mod initialization;
pub mod notify;
pub mod security;
pub mod server;
pub mod store;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, StoreBackend};
pub use error_handling::{GatewayStats, OutcomeType, RejectReason};
pub use gateway::{Gateway, GatewayDecision, RedirectRequest};
pub use server::{build_router, run_server, serve, AppState};
