//! Liveness endpoint.
//!
//! `/health` answers from process state only; it never calls downstream
//! services, so a failing dependency cannot make this service look dead.
//! The route is instrumented like any other.

use axum::Json;
use serde::Serialize;

use crate::observability::correlation::CorrelationContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
}

pub async fn health(ctx: CorrelationContext) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: ctx.service_name().to_string(),
    })
}
