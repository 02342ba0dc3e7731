//! In-memory record store.

use std::sync::{PoisonError, RwLock};

/// A stored record with a numeric id.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> u64;
}

/// Vec-backed store. Locks are never held across `.await`.
#[derive(Debug, Default)]
pub struct Store<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Record> Store<T> {
    pub fn new(seed: Vec<T>) -> Self {
        Self {
            items: RwLock::new(seed),
        }
    }

    pub fn list(&self) -> Vec<T> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: u64) -> Option<T> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Build and append a record under the write lock.
    ///
    /// `build` receives the next id (`max + 1`, or 1 when empty) and the
    /// current records, so uniqueness checks and id allocation are atomic.
    pub fn insert_with<E>(&self, build: impl FnOnce(u64, &[T]) -> Result<T, E>) -> Result<T, E> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let next_id = items.iter().map(Record::id).max().map_or(1, |max| max + 1);
        let record = build(next_id, &items)?;
        items.push(record.clone());
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
