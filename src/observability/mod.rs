//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces:
//!     → correlation.rs (trace id adopted or generated, forwarded downstream)
//!     → logging.rs (structured JSON records carrying service + trace_id)
//!     → metrics.rs (one count and one latency observation, errors by type)
//!
//! Consumers:
//!     → Log shipper (stdout, optional rotated file)
//!     → Metrics endpoint (Prometheus scrape of /metrics)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace id flows through logs, response headers and downstream calls,
//!   never into metric labels
//! - Metrics are cheap (atomic increments)

pub mod correlation;
pub mod logging;
pub mod metrics;

pub use correlation::{CorrelationContext, CorrelationPropagator};
pub use logging::{init_logging, LoggingError, LoggingGuard};
pub use metrics::{CallOutcome, Telemetry};
