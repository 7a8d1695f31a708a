use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::{
    error::{AppError, AppResult},
    services::{
        providers::{with_timeout, CatalogProvider},
        vectorizer::VectorModel,
    },
};

struct BuiltModel {
    model: Arc<VectorModel>,
    /// Last fit, or last failed refresh attempt; the max age counts from here
    checked_at: Instant,
}

/// Process-wide holder of the fitted [`VectorModel`]
///
/// The first caller that finds no model builds it while holding `build_lock`;
/// callers queued behind it re-check the slot and reuse the fresh model. A failed
/// refresh keeps the previous model and restarts its age, so queued callers do not
/// retry the fetch one after another. Readers only clone the inner `Arc`.
pub struct ModelCache {
    provider: Arc<dyn CatalogProvider>,
    slot: RwLock<Option<BuiltModel>>,
    build_lock: Mutex<()>,
    provider_timeout: Duration,
    max_age: Option<Duration>,
    builds: AtomicUsize,
}

impl ModelCache {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        provider_timeout: Duration,
        max_age: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
            build_lock: Mutex::new(()),
            provider_timeout,
            max_age,
            builds: AtomicUsize::new(0),
        }
    }

    /// Returns the model, building it first if it is missing or older than the max age
    pub async fn ensure_built(&self) -> AppResult<Arc<VectorModel>> {
        if let Some(model) = self.fresh().await {
            return Ok(model);
        }

        let _guard = self.build_lock.lock().await;
        if let Some(model) = self.fresh().await {
            return Ok(model);
        }

        match self.build().await {
            Ok(model) => Ok(model),
            Err(e) => {
                let mut slot = self.slot.write().await;
                match slot.as_mut() {
                    Some(built) => {
                        built.checked_at = Instant::now();
                        tracing::warn!(error = %e, "Model refresh failed, serving previous model");
                        Ok(built.model.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Refits the model from the current catalog, replacing the cached one on success
    pub async fn rebuild(&self) -> AppResult<Arc<VectorModel>> {
        let _guard = self.build_lock.lock().await;
        self.build().await
    }

    /// Cached model regardless of age
    pub async fn current(&self) -> Option<Arc<VectorModel>> {
        self.slot.read().await.as_ref().map(|built| built.model.clone())
    }

    /// Number of successful fits since startup
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    async fn fresh(&self) -> Option<Arc<VectorModel>> {
        let slot = self.slot.read().await;
        let built = slot.as_ref()?;
        match self.max_age {
            Some(max_age) if built.checked_at.elapsed() >= max_age => None,
            _ => Some(built.model.clone()),
        }
    }

    async fn build(&self) -> AppResult<Arc<VectorModel>> {
        let started = Instant::now();
        let catalog = with_timeout(
            self.provider_timeout,
            "all_catalog_items",
            self.provider.all_catalog_items(),
        )
        .await?;

        let fitted = tokio::task::spawn_blocking(move || VectorModel::fit(catalog))
            .await
            .map_err(|e| AppError::Internal(format!("Model fit task failed: {}", e)))?;

        let Some(model) = fitted else {
            tracing::warn!(provider = self.provider.name(), "Catalog is empty, vector model not built");
            return Err(AppError::ModelUnavailable(
                "catalog is empty, no vector model could be built".to_string(),
            ));
        };

        let model = Arc::new(model);
        *self.slot.write().await = Some(BuiltModel {
            model: model.clone(),
            checked_at: Instant::now(),
        });
        self.builds.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            documents = model.document_count(),
            vocabulary = model.vocabulary_size(),
            stop_words = model.stop_words_enabled(),
            elapsed_ms = started.elapsed().as_millis(),
            "Vector model built"
        );

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilmRecord;
    use crate::services::providers::{InMemoryCatalog, MockCatalogProvider};

    fn film(film_id: i32, title: &str, description: &str) -> FilmRecord {
        FilmRecord {
            film_id,
            title: title.to_string(),
            description: Some(description.to_string()),
            category: Some("Action".to_string()),
            language: Some("English".to_string()),
            rating: Some("PG".to_string()),
            actors: Vec::new(),
            fulltext: None,
        }
    }

    fn cache_over(films: Vec<FilmRecord>, max_age: Option<Duration>) -> ModelCache {
        ModelCache::new(
            Arc::new(InMemoryCatalog::new(films, Vec::new())),
            Duration::from_secs(5),
            max_age,
        )
    }

    #[tokio::test]
    async fn test_ensure_built_is_idempotent() {
        let cache = cache_over(
            vec![film(1, "ROBOT", "robot dog"), film(2, "SHARK", "shark boat")],
            None,
        );

        let first = cache.ensure_built().await.unwrap();
        let second = cache.ensure_built().await.unwrap();

        assert_eq!(cache.build_count(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.vocabulary(), second.vocabulary());
        assert_eq!(first.document_count(), second.document_count());
    }

    #[tokio::test]
    async fn test_concurrent_callers_build_once() {
        let cache = Arc::new(cache_over(
            vec![film(1, "ROBOT", "robot dog"), film(2, "SHARK", "shark boat")],
            None,
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_built().await.map(|m| m.document_count()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 2);
        }

        assert_eq!(cache.build_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog_leaves_model_unset() {
        let cache = cache_over(Vec::new(), None);
        let err = cache.ensure_built().await.unwrap_err();
        assert!(matches!(err, AppError::ModelUnavailable(_)));
        assert!(cache.current().await.is_none());
        assert_eq!(cache.build_count(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_model() {
        let cache = cache_over(vec![film(1, "ROBOT", "robot dog")], None);
        let first = cache.ensure_built().await.unwrap();
        let second = cache.rebuild().await.unwrap();
        assert_eq!(cache.build_count(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&cache.current().await.unwrap(), &second));
    }

    #[tokio::test]
    async fn test_expired_model_is_rebuilt() {
        let cache = cache_over(vec![film(1, "ROBOT", "robot dog")], Some(Duration::ZERO));
        cache.ensure_built().await.unwrap();
        cache.ensure_built().await.unwrap();
        assert_eq!(cache.build_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_previous_model() {
        let mut provider = MockCatalogProvider::new();
        let mut calls = 0;
        provider.expect_all_catalog_items().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![film(1, "ROBOT", "robot dog")])
            } else {
                Err(AppError::ProviderUnavailable("connection refused".to_string()))
            }
        });
        provider.expect_name().return_const("mock");

        let cache = ModelCache::new(Arc::new(provider), Duration::from_secs(5), Some(Duration::ZERO));
        let first = cache.ensure_built().await.unwrap();
        let second = cache.ensure_built().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.build_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_attempted_once_by_queued_callers() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut provider = MockCatalogProvider::new();
        let counter = fetches.clone();
        provider.expect_all_catalog_items().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![film(1, "ROBOT", "robot dog")])
            } else {
                Err(AppError::ProviderUnavailable("connection refused".to_string()))
            }
        });
        provider.expect_name().return_const("mock");

        let cache = Arc::new(ModelCache::new(
            Arc::new(provider),
            Duration::from_secs(5),
            Some(Duration::from_millis(200)),
        ));
        let first = cache.ensure_built().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_built().await })
            })
            .collect();
        for task in tasks {
            let model = task.await.unwrap().unwrap();
            assert!(Arc::ptr_eq(&model, &first));
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.build_count(), 1);
    }
}
