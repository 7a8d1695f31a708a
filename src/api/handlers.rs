use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    models::{
        Focus, OutcomeKind, RecommendationCandidate, Recommendations, WatchedFilmDetail,
    },
    services::ModelStatus,
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: i32,
    pub focus: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub date: String,
    pub model_built: bool,
    pub catalog_size: usize,
}

/// Recommendation list together with the user's watch history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: i32,
    pub focus: String,
    pub outcome: OutcomeKind,
    pub summary: String,
    pub watched_films: Vec<WatchedFilmDetail>,
    pub recommendations: Vec<RecommendationCandidate>,
}

impl RecommendationResponse {
    fn new(user_id: i32, result: Recommendations, watched_films: Vec<WatchedFilmDetail>) -> Self {
        let summary = match result.outcome {
            OutcomeKind::InvalidFocus => {
                format!("Could not generate recommendations for focus '{}'", result.focus)
            }
            _ => format!(
                "Recommendations for user {} with focus {}",
                user_id, result.focus
            ),
        };

        Self {
            user_id,
            focus: result.focus,
            outcome: result.outcome,
            summary,
            watched_films,
            recommendations: result.candidates,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Service status with the state of the vector model
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let model = state.engine.model_status().await;
    Json(StatusResponse {
        status: "ok",
        date: chrono::Utc::now().to_rfc3339(),
        model_built: model.built,
        catalog_size: model.documents,
    })
}

/// Recommendations for any focus selector
pub async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = recommend_cached(&state, params.user_id, &params.focus).await?;
    Ok(Json(response))
}

/// Full-text keyword affinity recommendations
pub async fn fulltext_recommendations(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = recommend_cached(&state, params.user_id, Focus::Fulltext.as_str()).await?;
    Ok(Json(response))
}

/// Semantic similarity recommendations; every candidate carries a score
pub async fn ml_recommendations(
    State(state): State<AppState>,
    Path(customer_id): Path<i32>,
) -> AppResult<Json<Vec<RecommendationCandidate>>> {
    let response = recommend_cached(&state, customer_id, Focus::Semantic.as_str()).await?;
    Ok(Json(response.recommendations))
}

/// Refits the vector model from the current catalog and drops cached semantic responses
pub async fn rebuild_model(State(state): State<AppState>) -> AppResult<Json<ModelStatus>> {
    let status = state.engine.rebuild_model().await?;
    tracing::info!(
        documents = status.documents,
        vocabulary = status.vocabulary,
        "Vector model rebuilt on request"
    );

    if let Some(cache) = &state.cache {
        match cache.invalidate_focus(Focus::Semantic).await {
            Ok(removed) => tracing::info!(removed, "Dropped cached semantic responses"),
            Err(e) => tracing::warn!(error = %e, "Could not drop cached semantic responses"),
        }
    }

    Ok(Json(status))
}

fn validate_user_id(user_id: i32) -> AppResult<()> {
    if user_id < 1 {
        return Err(AppError::InvalidInput(format!(
            "user_id must be a positive integer, got {}",
            user_id
        )));
    }
    Ok(())
}

/// Cache slot of a request; selectors that name no focus are never cached
fn cache_key(user_id: i32, selector: &str) -> Option<CacheKey> {
    let focus = selector.parse::<Focus>().ok()?;
    Some(CacheKey::Recommendations { user_id, focus })
}

/// Serves from the response cache when possible. Cache failures are logged, never returned.
async fn recommend_cached(
    state: &AppState,
    user_id: i32,
    selector: &str,
) -> AppResult<RecommendationResponse> {
    validate_user_id(user_id)?;

    let key = cache_key(user_id, selector);

    if let (Some(cache), Some(key)) = (&state.cache, &key) {
        match cache.get_from_cache::<RecommendationResponse>(key).await {
            Ok(Some(cached)) => {
                tracing::debug!(cache_key = %key, "Cache hit");
                return Ok(cached);
            }
            Ok(None) => tracing::debug!(cache_key = %key, "Cache miss"),
            Err(e) => tracing::warn!(cache_key = %key, error = %e, "Cache read failed"),
        }
    }

    let result = state.engine.recommend_raw(user_id, selector).await;
    let watched_films = match state.engine.watched_details(user_id).await {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Could not load watch history details");
            Vec::new()
        }
    };
    let response = RecommendationResponse::new(user_id, result, watched_films);

    if let (Some(cache), Some(key)) = (&state.cache, &key) {
        if response.outcome != OutcomeKind::Degraded {
            cache.set_in_background(key, &response, state.cache_ttl_secs);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id(1).is_ok());
        assert!(matches!(validate_user_id(0), Err(AppError::InvalidInput(_))));
        assert!(matches!(validate_user_id(-3), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_cache_key_follows_parsed_focus() {
        assert_eq!(
            cache_key(3, "Categories").map(|k| k.to_string()),
            Some("recs:3:category".to_string())
        );
        assert_eq!(cache_key(3, "ML"), cache_key(3, "ml"));
        assert_eq!(cache_key(3, "Mood"), None);
    }

    #[test]
    fn test_summary_for_invalid_focus() {
        let response =
            RecommendationResponse::new(5, Recommendations::invalid_focus("mood"), Vec::new());
        assert_eq!(response.outcome, OutcomeKind::InvalidFocus);
        assert_eq!(response.summary, "Could not generate recommendations for focus 'mood'");
        assert_eq!(response.recommendations.len(), 1);
    }
}
