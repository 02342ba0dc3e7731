//! Products resource (`/products`).

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::store::{Record, Store};
use crate::http::error::ApiError;
use crate::observability::correlation::CorrelationContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
}

impl Record for Product {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: f64,
}

impl ProductCreate {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Name must not be empty"));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(ApiError::validation("Price must be greater than zero"));
        }
        Ok(())
    }
}

pub fn seed() -> Vec<Product> {
    vec![
        Product {
            id: 1,
            name: "Laptop".into(),
            price: 999.99,
        },
        Product {
            id: 2,
            name: "Mouse".into(),
            price: 29.99,
        },
    ]
}

pub fn routes<S>(store: Arc<Store<Product>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/create", post(create_product))
        .with_state(store)
}

async fn list_products(
    State(store): State<Arc<Store<Product>>>,
    ctx: CorrelationContext,
) -> Json<Vec<Product>> {
    tracing::info!(trace_id = %ctx.trace_id(), "Fetching all products");
    Json(store.list())
}

async fn get_product(
    State(store): State<Arc<Store<Product>>>,
    ctx: CorrelationContext,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Product>, ApiError> {
    let Path(id) = path?;
    tracing::info!(trace_id = %ctx.trace_id(), product_id = id, "Fetching product");
    store
        .get(id)
        .map(Json)
        .ok_or_else(|| {
            ApiError::not_found("Product not found").with_detail(format!("product {id}"))
        })
}

async fn create_product(
    State(store): State<Arc<Store<Product>>>,
    ctx: CorrelationContext,
    payload: Result<Json<ProductCreate>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    tracing::info!(trace_id = %ctx.trace_id(), name = %payload.name, "Creating product");

    let name = payload.name.trim();
    let product = store.insert_with(|id, existing| {
        if existing.iter().any(|p| p.name.to_lowercase() == name.to_lowercase()) {
            return Err(ApiError::conflict("Product name already exists")
                .with_detail(format!("duplicate product name {name}")));
        }
        Ok(Product {
            id,
            name: name.to_string(),
            price: payload.price,
        })
    })?;

    tracing::info!(trace_id = %ctx.trace_id(), product_id = product.id, "Product created");
    Ok(Json(product))
}
