//! Users resource (`/users`).

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
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

impl Record for User {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
}

impl UserCreate {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Name must not be empty"));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::validation("Invalid email address"));
        }
        Ok(())
    }
}

/// `local@domain.tld` with no whitespace and a dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn seed() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "Alice".into(),
            email: "alice@example.com".into(),
        },
        User {
            id: 2,
            name: "Bob".into(),
            email: "bob@example.com".into(),
        },
    ]
}

pub fn routes<S>(store: Arc<Store<User>>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/create", post(create_user))
        .with_state(store)
}

async fn list_users(
    State(store): State<Arc<Store<User>>>,
    ctx: CorrelationContext,
) -> Json<Vec<User>> {
    tracing::info!(trace_id = %ctx.trace_id(), "Fetching all users");
    Json(store.list())
}

async fn get_user(
    State(store): State<Arc<Store<User>>>,
    ctx: CorrelationContext,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let Path(id) = path?;
    tracing::info!(trace_id = %ctx.trace_id(), user_id = id, "Fetching user");
    store
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found").with_detail(format!("user {id}")))
}

async fn create_user(
    State(store): State<Arc<Store<User>>>,
    ctx: CorrelationContext,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    tracing::info!(trace_id = %ctx.trace_id(), name = %payload.name, "Creating user");

    let user = store.insert_with(|id, existing| {
        if existing.iter().any(|u| u.email.eq_ignore_ascii_case(&payload.email)) {
            return Err(ApiError::conflict("Email already registered")
                .with_detail(format!("duplicate email {}", payload.email)));
        }
        Ok(User {
            id,
            name: payload.name.clone(),
            email: payload.email.clone(),
        })
    })?;

    tracing::info!(trace_id = %ctx.trace_id(), user_id = user.id, "User created");
    Ok(Json(user))
}
