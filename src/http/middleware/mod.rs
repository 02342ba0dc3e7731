//! HTTP middleware.
//!
//! `instrument` wraps every resource route; it is the single place where
//! correlation ids are resolved and request telemetry is recorded.

pub mod instrument;

pub use instrument::{instrument, Instrumentation, UNMATCHED_ROUTE};
