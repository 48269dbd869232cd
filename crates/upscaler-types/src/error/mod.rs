//! Typed error definitions.
//!
//! All errors are serializable so they can be reported over the HTTP API and
//! matched on by clients.

mod config;
mod proxy;

pub use config::ConfigError;
pub use proxy::ProxyError;
