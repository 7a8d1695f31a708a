use std::sync::Arc;

use crate::db::Cache;
use crate::services::RecommendationEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    /// Response cache; `None` when Redis is not configured
    pub cache: Option<Cache>,
    pub cache_ttl_secs: u64,
}

impl AppState {
    /// Creates state without a response cache
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self {
            engine,
            cache: None,
            cache_ttl_secs: 0,
        }
    }

    pub fn with_cache(mut self, cache: Cache, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl_secs = ttl_secs;
        self
    }
}
