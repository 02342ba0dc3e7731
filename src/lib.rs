//! Correlated, instrumented service chain.
//!
//! One library, three roles (users, products, orders). Every role runs the
//! same stack: correlation id propagation, request instrumentation
//! (structured logs + Prometheus metrics), fault injection routes and an
//! instrumented client for calls along the chain.

pub mod config;
pub mod domain;
pub mod fault;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::{Role, ServiceConfig};
pub use http::ServiceServer;
pub use lifecycle::{RunningService, Shutdown};
