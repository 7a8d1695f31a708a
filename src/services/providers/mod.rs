/// Catalog & history data providers
///
/// The ranking engine reads films, watch history and popularity counts only
/// through [`CatalogProvider`]. `postgres` serves the Sakila schema, `memory`
/// serves a JSON fixture loaded at startup.
use crate::{
    error::{AppError, AppResult},
    models::{AttributeKind, AttributeValue, FilmRecord, KeywordCandidate},
    services::text::TermWeights,
};
use std::future::Future;
use std::time::Duration;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalog;
pub use postgres::PgCatalogProvider;

/// Trait for catalog and watch-history sources
///
/// All "exclude" arguments are title sets; implementations must never return a
/// title from them. Popularity is the number of rentals of a film.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Every film, ordered by film id
    async fn all_catalog_items(&self) -> AppResult<Vec<FilmRecord>>;

    /// Distinct films rented by the user, with all fields
    async fn watched_items(&self, user_id: i32) -> AppResult<Vec<FilmRecord>>;

    /// Distinct titles rented by the user
    async fn watched_titles(&self, user_id: i32) -> AppResult<Vec<String>>;

    /// Distinct values of one attribute across the user's rented films
    async fn watched_attribute(
        &self,
        user_id: i32,
        kind: AttributeKind,
    ) -> AppResult<Vec<AttributeValue>>;

    /// Titles matching the key of any of `values` for `kind`, most rented first.
    ///
    /// For actors the number of shared actors ranks first and rentals break ties.
    async fn popular_within(
        &self,
        kind: AttributeKind,
        values: &[AttributeValue],
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>>;

    /// Most rented titles overall
    async fn popular_overall(&self, exclude_titles: &[String], limit: usize)
        -> AppResult<Vec<String>>;

    /// Raw weighted-term strings of the user's rented films
    async fn fulltext_of_watched(&self, user_id: i32) -> AppResult<Vec<String>>;

    /// Films whose full-text matches any preferred keyword, most relevant first
    async fn candidates_by_keyword_affinity(
        &self,
        preferences: &TermWeights,
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<KeywordCandidate>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Awaits a provider call for at most `limit`; an elapsed timer becomes
/// `ProviderUnavailable`.
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &'static str,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis(), "Provider call timed out");
            Err(AppError::ProviderUnavailable(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}
