//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`tracing_layer`]: request/response tracing with `TraceLayer`.
//! - [`metrics`]: Prometheus request and ledger metrics.
//! - [`rate_limit`]: per-client fixed-window limit on login attempts.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
