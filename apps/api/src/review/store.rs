use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::review::session::{KeywordSession, ReviewSession};

/// In-memory sessions keyed by id. Each session is only ever touched under
/// the map lock, so a handler sees a whole mutation or none of it.
pub struct SessionMap<T> {
    label: &'static str,
    inner: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for SessionMap<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SessionMap<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn not_found(&self, id: Uuid) -> AppError {
        AppError::NotFound(format!("{} {id} not found", self.label))
    }

    pub async fn insert(&self, id: Uuid, value: T) {
        self.inner.write().await.insert(id, value);
    }

    pub async fn read<R>(&self, id: Uuid, f: impl FnOnce(&T) -> R) -> Result<R, AppError> {
        let guard = self.inner.read().await;
        guard.get(&id).map(f).ok_or_else(|| self.not_found(id))
    }

    pub async fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut T) -> R) -> Result<R, AppError> {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&id) {
            Some(value) => Ok(f(value)),
            None => Err(self.not_found(id)),
        }
    }

    pub async fn remove(&self, id: Uuid) -> Result<T, AppError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    pub reviews: SessionMap<ReviewSession>,
    pub keywords: SessionMap<KeywordSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            reviews: SessionMap::new("Review session"),
            keywords: SessionMap::new("Keyword session"),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
