//! Resource handlers for the three services.
//!
//! Each role owns one in-memory collection and exposes list, get-by-id and
//! create routes under `/{resource}`. Stores live for the process lifetime;
//! nothing is persisted.

pub mod orders;
pub mod products;
pub mod store;
pub mod users;

use std::sync::Arc;

use axum::Router;

use crate::config::Role;
use crate::http::client::DownstreamClient;

pub use store::{Record, Store};

/// Resource routes for `role`, seeded when `seed` is set.
pub fn resource_routes<S>(role: Role, seed: bool, client: DownstreamClient) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn initial<T>(seed: bool, records: impl FnOnce() -> Vec<T>) -> Vec<T> {
        if seed {
            records()
        } else {
            Vec::new()
        }
    }

    match role {
        Role::Users => users::routes(Arc::new(Store::new(initial(seed, users::seed)))),
        Role::Products => products::routes(Arc::new(Store::new(initial(seed, products::seed)))),
        Role::Orders => orders::routes(Arc::new(Store::new(initial(seed, orders::seed))), client),
    }
}
