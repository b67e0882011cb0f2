pub mod memory;

use async_trait::async_trait;
use std::error::Error;
use std::time::Duration;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Backend for the bounded-TTL lookup caches (IP geolocation results,
/// release list bodies). Entries older than the backend's TTL are treated
/// as absent.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), BoxError>;
    async fn remove(&self, key: &str) -> Result<(), BoxError>;
    async fn clear(&self) -> Result<(), BoxError>;
}

pub struct CacheManager {
    backend: Box<dyn CacheBackend>,
}

impl CacheManager {
    pub fn new(backend: Box<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// In-memory cache with the given entry lifetime.
    pub fn new_memory(ttl: Duration) -> Self {
        Self::new(Box::new(memory::MemoryCache::new(ttl)))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
        self.backend.set(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), BoxError> {
        self.backend.remove(key).await
    }

    pub async fn clear(&self) -> Result<(), BoxError> {
        self.backend.clear().await
    }
}
