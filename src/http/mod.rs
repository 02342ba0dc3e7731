//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware/instrument.rs (correlation, span, metrics, logs)
//!     → handler (domain, health, fault)
//!         → client.rs (outbound calls, correlation header forwarded)
//!     → error.rs (ApiError → status + body + ErrorReport)
//!     → Send to client
//! ```

pub mod client;
pub mod error;
pub mod middleware;
pub mod server;

pub use client::{DownstreamClient, DownstreamError};
pub use error::{ApiError, ErrorKind, ErrorReport};
pub use server::{AppState, ServerError, ServiceServer};
