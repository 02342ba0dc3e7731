//! Orders resource (`/orders`).
//!
//! Creating an order checks the referenced user and product against their
//! owning services through the instrumented client, so the trace id travels
//! with the validation calls.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::config::Role;
use crate::domain::store::{Record, Store};
use crate::http::client::{DownstreamClient, DownstreamError};
use crate::http::error::ApiError;
use crate::observability::correlation::CorrelationContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    pub product_id: u64,
    pub quantity: u32,
}

impl Record for Order {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderCreate {
    pub user_id: u64,
    pub product_id: u64,
    pub quantity: i64,
}

impl OrderCreate {
    fn quantity(&self) -> Result<u32, ApiError> {
        if self.quantity < 1 {
            return Err(ApiError::validation("Quantity must be at least 1"));
        }
        u32::try_from(self.quantity).map_err(|_| ApiError::validation("Quantity is too large"))
    }
}

pub fn seed() -> Vec<Order> {
    vec![
        Order {
            id: 1,
            user_id: 1,
            product_id: 1,
            quantity: 2,
        },
        Order {
            id: 2,
            user_id: 2,
            product_id: 2,
            quantity: 1,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct OrdersState {
    store: Arc<Store<Order>>,
    client: DownstreamClient,
}

pub fn routes<S>(store: Arc<Store<Order>>, client: DownstreamClient) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/create", post(create_order))
        .with_state(OrdersState { store, client })
}

async fn list_orders(
    State(state): State<OrdersState>,
    ctx: CorrelationContext,
) -> Json<Vec<Order>> {
    tracing::info!(trace_id = %ctx.trace_id(), "Fetching all orders");
    Json(state.store.list())
}

async fn get_order(
    State(state): State<OrdersState>,
    ctx: CorrelationContext,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
    let Path(id) = path?;
    tracing::info!(trace_id = %ctx.trace_id(), order_id = id, "Fetching order");
    state
        .store
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order not found").with_detail(format!("order {id}")))
}

async fn create_order(
    State(state): State<OrdersState>,
    ctx: CorrelationContext,
    payload: Result<Json<OrderCreate>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(payload) = payload?;
    let quantity = payload.quantity()?;
    tracing::info!(
        trace_id = %ctx.trace_id(),
        user_id = payload.user_id,
        product_id = payload.product_id,
        "Creating order"
    );

    let client = &state.client;
    ensure_exists(client, &ctx, Role::Users, payload.user_id, "User not found").await?;
    ensure_exists(client, &ctx, Role::Products, payload.product_id, "Product not found").await?;

    let order = state.store.insert_with(|id, _| {
        Ok::<_, ApiError>(Order {
            id,
            user_id: payload.user_id,
            product_id: payload.product_id,
            quantity,
        })
    })?;

    tracing::info!(trace_id = %ctx.trace_id(), order_id = order.id, "Order created");
    Ok(Json(order))
}

/// Confirm `/{resource}/{id}` exists on `owner`. A 404 becomes `not_found`;
/// other failures surface as the client error. Skipped when `owner` has no
/// configured URL.
async fn ensure_exists(
    client: &DownstreamClient,
    ctx: &CorrelationContext,
    owner: Role,
    id: u64,
    missing: &'static str,
) -> Result<(), ApiError> {
    if !client.is_configured(owner) {
        tracing::warn!(
            trace_id = %ctx.trace_id(),
            callee = owner.service_name(),
            "Downstream not configured, skipping validation"
        );
        return Ok(());
    }

    let path = format!("/{}/{}", owner.resource(), id);
    match client.get_json::<IgnoredAny>(ctx, owner, &path).await {
        Ok(_) => {
            tracing::info!(
                trace_id = %ctx.trace_id(),
                callee = owner.service_name(),
                id,
                "Reference validated"
            );
            Ok(())
        }
        Err(DownstreamError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
            let detail = format!("{} has no {} {id}", owner.service_name(), owner.resource());
            Err(ApiError::not_found(missing).with_detail(detail))
        }
        Err(err) => Err(err.into()),
    }
}
