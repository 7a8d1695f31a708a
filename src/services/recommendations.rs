use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{
        AttributeKind, AttributeValue, Focus, Outcome, RecommendationCandidate, Recommendations, WatchedFilmDetail,
    },
    services::{
        diversify::{self, CANDIDATE_EXPANSION, PER_KEYWORD_LIMIT, TOTAL_LIMIT},
        fallback,
        model_cache::ModelCache,
        providers::{with_timeout, CatalogProvider},
        similarity,
        text::TermWeights,
        vectorizer::VectorModel,
    },
};

const SEMANTIC_EXPLANATION: &str = "Recommended for semantic similarity with the films you have watched";

/// Tunables of the engine
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Maximum number of candidates per ranked list
    pub limit: usize,
    pub provider_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            limit: 10,
            provider_timeout: Duration::from_secs(5),
        }
    }
}

/// Snapshot of the vector model for status and admin responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub built: bool,
    pub documents: usize,
    pub vocabulary: usize,
    pub stop_words: bool,
    pub builds: usize,
}

/// Single entry point of the ranking engine
///
/// Every arm maps provider and model errors to an explainable [`Outcome`], so
/// [`RecommendationEngine::recommend`] has no error path.
pub struct RecommendationEngine {
    provider: Arc<dyn CatalogProvider>,
    models: Arc<ModelCache>,
    settings: EngineSettings,
}

impl RecommendationEngine {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        models: Arc<ModelCache>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            models,
            settings,
        }
    }

    /// Engine with its own model cache over `provider`
    pub fn with_provider(provider: Arc<dyn CatalogProvider>, settings: EngineSettings) -> Self {
        let models = Arc::new(ModelCache::new(
            provider.clone(),
            settings.provider_timeout,
            None,
        ));
        Self::new(provider, models, settings)
    }

    /// Parses a raw selector; unknown selectors yield the `invalid_focus` placeholder
    pub async fn recommend_raw(&self, user_id: i32, selector: &str) -> Recommendations {
        match selector.parse::<Focus>() {
            Ok(focus) => self.recommend(user_id, focus).await,
            Err(e) => {
                tracing::info!(user_id, error = %e, "Rejected recommendation focus");
                Recommendations::invalid_focus(selector)
            }
        }
    }

    pub async fn recommend(&self, user_id: i32, focus: Focus) -> Recommendations {
        let outcome = match focus.attribute() {
            Some(kind) => self.categorical(user_id, kind).await,
            None => match focus {
                Focus::Popularity => self.popularity(user_id).await,
                Focus::Fulltext => self.fulltext(user_id).await,
                _ => self.semantic(user_id).await,
            },
        };

        let result = Recommendations::from_outcome(focus, outcome);
        tracing::info!(
            user_id,
            focus = %focus,
            outcome = ?result.outcome,
            candidates = result.candidates.len(),
            "Recommendations generated"
        );
        result
    }

    /// The user's watched films, as echoed next to a recommendation list
    pub async fn watched_details(&self, user_id: i32) -> AppResult<Vec<WatchedFilmDetail>> {
        let watched = self
            .call("watched_items", self.provider.watched_items(user_id))
            .await?;
        Ok(watched.iter().map(WatchedFilmDetail::from).collect())
    }

    /// Refits the vector model from the current catalog
    pub async fn rebuild_model(&self) -> AppResult<ModelStatus> {
        let model = self.models.rebuild().await?;
        Ok(self.status_of(Some(model.as_ref())))
    }

    pub async fn model_status(&self) -> ModelStatus {
        let model = self.models.current().await;
        self.status_of(model.as_deref())
    }

    fn status_of(&self, model: Option<&VectorModel>) -> ModelStatus {
        ModelStatus {
            built: model.is_some(),
            documents: model.map_or(0, VectorModel::document_count),
            vocabulary: model.map_or(0, VectorModel::vocabulary_size),
            stop_words: model.is_some_and(VectorModel::stop_words_enabled),
            builds: self.models.build_count(),
        }
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        with_timeout(self.settings.provider_timeout, operation, future).await
    }

    async fn categorical(&self, user_id: i32, kind: AttributeKind) -> Outcome {
        match self.rank_by_attribute(user_id, kind).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(user_id, kind = %kind, error = %e, "Categorical ranking degraded");
                Outcome::Degraded(fallback::degraded(&e, &kind.to_string()))
            }
        }
    }

    async fn rank_by_attribute(&self, user_id: i32, kind: AttributeKind) -> AppResult<Outcome> {
        let limit = self.settings.limit;
        let exclude = self
            .call("watched_titles", self.provider.watched_titles(user_id))
            .await?;
        let values = self
            .call(
                "watched_attribute",
                self.provider.watched_attribute(user_id, kind),
            )
            .await?;

        if values.is_empty() {
            return Ok(Outcome::InsufficientSignal(vec![
                RecommendationCandidate::placeholder(format!(
                    "Not enough {} data to generate recommendations",
                    kind
                )),
            ]));
        }

        let titles = self
            .call(
                "popular_within",
                self.provider.popular_within(kind, &values, &exclude, limit),
            )
            .await?;

        let explanation = attribute_explanation(kind, &values);
        let candidates = titles
            .into_iter()
            .map(|title| RecommendationCandidate::new(title, explanation.clone()))
            .collect();
        Ok(Outcome::Ranked(fallback::finalize(candidates, &exclude, limit)))
    }

    async fn popularity(&self, user_id: i32) -> Outcome {
        let limit = self.settings.limit;
        let ranked = async {
            let exclude = self
                .call("watched_titles", self.provider.watched_titles(user_id))
                .await?;
            let titles = self
                .call("popular_overall", self.provider.popular_overall(&exclude, limit))
                .await?;
            let candidates = titles
                .into_iter()
                .map(|title| RecommendationCandidate::new(title, "Popular overall"))
                .collect();
            Ok::<_, AppError>(fallback::finalize(candidates, &exclude, limit))
        };

        match ranked.await {
            Ok(candidates) => Outcome::Ranked(candidates),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Popularity ranking degraded");
                Outcome::Degraded(fallback::degraded(&e, "popularity"))
            }
        }
    }

    async fn fulltext(&self, user_id: i32) -> Outcome {
        match self.rank_by_keywords(user_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Full-text ranking degraded");
                Outcome::Degraded(fallback::degraded(&e, "full-text"))
            }
        }
    }

    async fn rank_by_keywords(&self, user_id: i32) -> AppResult<Outcome> {
        let exclude = self
            .call("watched_titles", self.provider.watched_titles(user_id))
            .await?;
        if exclude.is_empty() {
            return Ok(insufficient("User not found or has no watch history"));
        }

        let fulltexts = self
            .call("fulltext_of_watched", self.provider.fulltext_of_watched(user_id))
            .await?;
        let preferences = TermWeights::aggregate(fulltexts.iter().map(String::as_str));
        if preferences.is_empty() {
            return Ok(insufficient(
                "Not enough full-text data to generate recommendations",
            ));
        }

        let pool = self
            .call(
                "candidates_by_keyword_affinity",
                self.provider.candidates_by_keyword_affinity(
                    &preferences,
                    &exclude,
                    TOTAL_LIMIT * CANDIDATE_EXPANSION,
                ),
            )
            .await?;
        if pool.is_empty() {
            return Ok(insufficient("No similar films found in the catalog"));
        }

        tracing::debug!(
            user_id,
            keywords = preferences.len(),
            pool = pool.len(),
            "Diversifying full-text candidates"
        );
        let selected = diversify::diversify(&pool, &preferences, TOTAL_LIMIT, PER_KEYWORD_LIMIT);
        Ok(Outcome::Ranked(fallback::finalize(
            selected,
            &exclude,
            TOTAL_LIMIT,
        )))
    }

    async fn semantic(&self, user_id: i32) -> Outcome {
        match self.rank_by_similarity(user_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Semantic ranking failed");
                Outcome::Degraded(fallback::engine_error(user_id, &e))
            }
        }
    }

    async fn rank_by_similarity(&self, user_id: i32) -> AppResult<Outcome> {
        let limit = self.settings.limit;
        let watched = self
            .call("watched_items", self.provider.watched_items(user_id))
            .await?;

        if !fallback::has_enough_signal(watched.len()) {
            let exclude: Vec<String> = watched.iter().map(|film| film.title.clone()).collect();
            let titles = self
                .call("popular_overall", self.provider.popular_overall(&exclude, limit))
                .await?;
            let candidates =
                fallback::finalize(fallback::popularity_fallback(titles), &exclude, limit);
            tracing::debug!(user_id, watched = watched.len(), "Semantic path fell back to popularity");
            return Ok(Outcome::InsufficientSignal(self.or_no_results(user_id, candidates)));
        }

        let model = self.models.ensure_built().await?;
        let scored = tokio::task::spawn_blocking(move || similarity::score(&model, &watched, limit))
            .await
            .map_err(|e| AppError::Internal(format!("Similarity task failed: {}", e)))?;

        if scored.is_empty() {
            return Ok(Outcome::InsufficientSignal(self.or_no_results(user_id, Vec::new())));
        }

        Ok(Outcome::Ranked(
            scored
                .into_iter()
                .map(|film| {
                    RecommendationCandidate::new(
                        film.title,
                        fallback::annotate(SEMANTIC_EXPLANATION, film.score),
                    )
                    .with_film_id(Some(film.film_id))
                    .with_score(film.score)
                })
                .collect(),
        ))
    }

    fn or_no_results(
        &self,
        user_id: i32,
        candidates: Vec<RecommendationCandidate>,
    ) -> Vec<RecommendationCandidate> {
        if candidates.is_empty() {
            vec![fallback::no_semantic_results(user_id)]
        } else {
            candidates
        }
    }
}

fn insufficient(explanation: &str) -> Outcome {
    Outcome::InsufficientSignal(vec![RecommendationCandidate::placeholder(explanation)])
}

fn attribute_explanation(kind: AttributeKind, values: &[AttributeValue]) -> String {
    let labels: Vec<&str> = values.iter().map(|v| v.label.as_str()).collect();
    match kind {
        AttributeKind::Genre => format!(
            "Popular in genres you have watched: {}",
            labels.iter().take(3).copied().collect::<Vec<_>>().join(", ")
        ),
        AttributeKind::Actor => format!(
            "Shares actors with films you have watched: {}",
            labels.iter().take(3).copied().collect::<Vec<_>>().join(", ")
        ),
        AttributeKind::Language => {
            format!("Popular in languages you prefer: {}", labels.join(", "))
        }
        AttributeKind::Rating => {
            format!("Popular with ratings you have watched: {}", labels.join(", "))
        }
    }
}
