//! API key pool and least-spent-first selection.
//!
//! Key storage is an outside concern: the session only talks to a
//! [`KeyStore`]. [`InMemoryKeyStore`] is enough for a single process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::AiError;

/// A key and what has been spent on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub queries: u64,
    pub tokens: u64,
    /// Accumulated cost of `tokens`.
    pub balance: f64,
}

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            queries: 0,
            tokens: 0,
            balance: 0.0,
        }
    }
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Snapshot of every candidate key.
    async fn keys(&self) -> Vec<ApiKey>;

    /// Charge one completed exchange to `key`.
    async fn record_usage(&self, key: &str, tokens: u64, cost: f64);
}

/// Pick the key with the lowest balance. Ties go to the earlier key.
pub fn select_key(keys: &[ApiKey]) -> Result<&ApiKey, AiError> {
    keys.iter()
        .min_by(|a, b| a.balance.total_cmp(&b.balance))
        .ok_or(AiError::NoKeysAvailable)
}

/// Process-local key store.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<Vec<ApiKey>>,
}

impl InMemoryKeyStore {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: RwLock::new(keys.into_iter().map(ApiKey::new).collect()),
        }
    }

    /// Add a key. Returns false if it is already present.
    pub async fn add_key(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        let mut keys = self.keys.write().await;
        if keys.iter().any(|k| k.key == key) {
            return false;
        }
        keys.push(ApiKey::new(key));
        true
    }

    /// Remove a key. Returns true if it was present.
    pub async fn remove_key(&self, key: &str) -> bool {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k| k.key != key);
        keys.len() != before
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn keys(&self) -> Vec<ApiKey> {
        self.keys.read().await.clone()
    }

    async fn record_usage(&self, key: &str, tokens: u64, cost: f64) {
        let mut keys = self.keys.write().await;
        match keys.iter_mut().find(|k| k.key == key) {
            Some(entry) => {
                entry.queries += 1;
                entry.tokens += tokens;
                entry.balance += cost;
            }
            None => tracing::warn!("usage recorded against unknown key"),
        }
    }
}
