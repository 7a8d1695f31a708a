//! Signal gating, confidence labels and degraded placeholders.

use std::collections::HashSet;

use crate::{error::AppError, models::RecommendationCandidate};

/// Fewer watched films than this switches the semantic path to popularity
pub const MIN_WATCHED_FOR_SIMILARITY: usize = 3;

pub const POPULARITY_FALLBACK_TAG: &str = "Popularity fallback: insufficient watch history";

pub const ENGINE_ERROR_TITLE: &str = "Recommendation engine error";

pub const NO_SEMANTIC_RESULTS: &str = "No semantic recommendations available";

/// Whether the watched set is large enough for similarity scoring
pub fn has_enough_signal(watched_count: usize) -> bool {
    watched_count >= MIN_WATCHED_FOR_SIMILARITY
}

/// Human readable confidence band for a similarity score
pub fn confidence_label(score: f64) -> &'static str {
    if score > 0.8 {
        "very high"
    } else if score > 0.6 {
        "high"
    } else if score > 0.4 {
        "medium"
    } else if score > 0.2 {
        "low"
    } else {
        "minimal"
    }
}

/// Appends the confidence band and the three-decimal score to an explanation
pub fn annotate(explanation: &str, score: f64) -> String {
    format!(
        "{} (confidence: {}, score: {:.3})",
        explanation,
        confidence_label(score),
        score
    )
}

/// Candidates for the popularity fallback of the semantic path
pub fn popularity_fallback(titles: Vec<String>) -> Vec<RecommendationCandidate> {
    titles
        .into_iter()
        .map(|title| RecommendationCandidate::new(title, POPULARITY_FALLBACK_TAG).with_score(0.0))
        .collect()
}

/// Single candidate describing a failure on the semantic path
pub fn engine_error(user_id: i32, error: &AppError) -> RecommendationCandidate {
    RecommendationCandidate::new(
        ENGINE_ERROR_TITLE,
        format!(
            "Temporary failure for customer {}. Please try again later. Error: {}",
            user_id,
            error.truncated()
        ),
    )
    .with_score(0.0)
}

/// Single candidate returned when the semantic path produced nothing
pub fn no_semantic_results(user_id: i32) -> RecommendationCandidate {
    RecommendationCandidate::new(
        NO_SEMANTIC_RESULTS,
        format!(
            "Not enough data to generate semantic recommendations for customer {}. Watch more films to get personalized suggestions.",
            user_id
        ),
    )
    .with_score(0.0)
}

/// Placeholder describing a failure on a categorical or full-text path
pub fn degraded(error: &AppError, context: &str) -> RecommendationCandidate {
    RecommendationCandidate::placeholder(format!(
        "Could not generate {} recommendations: {}",
        context,
        error.truncated()
    ))
}

/// Drops excluded and repeated titles, then truncates to `limit`
pub fn finalize(
    candidates: Vec<RecommendationCandidate>,
    exclude_titles: &[String],
    limit: usize,
) -> Vec<RecommendationCandidate> {
    let excluded: HashSet<&str> = exclude_titles.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::new();

    candidates
        .into_iter()
        .filter(|candidate| !excluded.contains(candidate.title.as_str()))
        .filter(|candidate| seen.insert(candidate.title.clone()))
        .take(limit)
        .collect()
}
