/// In-memory catalog provider
///
/// Holds films and rentals loaded from a JSON fixture:
///
/// ```json
/// { "films": [{ "film_id": 1, "title": "ACADEMY DINOSAUR", ... }],
///   "rentals": [{ "customer_id": 1, "film_id": 1 }] }
/// ```
///
/// Rankings mirror the PostgreSQL provider: popularity counts rentals, ties are
/// broken by title.
use crate::{
    error::{AppError, AppResult},
    models::{AttributeKind, AttributeValue, FilmRecord, KeywordCandidate},
    services::{providers::CatalogProvider, text::TermWeights},
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::instrument;

/// One rental of a film by a customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rental {
    pub customer_id: i32,
    pub film_id: i32,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    films: Vec<FilmRecord>,
    #[serde(default)]
    rentals: Vec<Rental>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    films: Vec<FilmRecord>,
    rentals: Vec<Rental>,
}

impl InMemoryCatalog {
    pub fn new(mut films: Vec<FilmRecord>, rentals: Vec<Rental>) -> Self {
        films.sort_by_key(|film| film.film_id);
        Self { films, rentals }
    }

    /// Loads a catalog fixture from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read fixture {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        let fixture: Fixture = serde_json::from_str(raw)
            .map_err(|e| AppError::Internal(format!("Invalid catalog fixture: {}", e)))?;
        Ok(Self::new(fixture.films, fixture.rentals))
    }

    fn rental_counts(&self) -> HashMap<i32, usize> {
        let mut counts = HashMap::new();
        for rental in &self.rentals {
            *counts.entry(rental.film_id).or_insert(0) += 1;
        }
        counts
    }

    fn watched(&self, user_id: i32) -> Vec<&FilmRecord> {
        let ids: HashSet<i32> = self
            .rentals
            .iter()
            .filter(|r| r.customer_id == user_id)
            .map(|r| r.film_id)
            .collect();
        self.films.iter().filter(|f| ids.contains(&f.film_id)).collect()
    }

    /// Sorts (score, rentals, title) descending on the numbers, ascending on title
    fn rank(mut scored: Vec<(usize, usize, String)>, limit: usize) -> Vec<String> {
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
        let mut seen = HashSet::new();
        scored
            .into_iter()
            .map(|(_, _, title)| title)
            .filter(|title| seen.insert(title.clone()))
            .take(limit)
            .collect()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl CatalogProvider for InMemoryCatalog {
    #[instrument(skip(self), fields(provider = "memory"))]
    async fn all_catalog_items(&self) -> AppResult<Vec<FilmRecord>> {
        Ok(self.films.clone())
    }

    #[instrument(skip(self), fields(provider = "memory"))]
    async fn watched_items(&self, user_id: i32) -> AppResult<Vec<FilmRecord>> {
        Ok(self.watched(user_id).into_iter().cloned().collect())
    }

    #[instrument(skip(self), fields(provider = "memory"))]
    async fn watched_titles(&self, user_id: i32) -> AppResult<Vec<String>> {
        let mut titles = distinct(self.watched(user_id).into_iter().map(|f| f.title.as_str()));
        titles.sort();
        Ok(titles)
    }

    #[instrument(skip(self), fields(provider = "memory"))]
    async fn watched_attribute(
        &self,
        user_id: i32,
        kind: AttributeKind,
    ) -> AppResult<Vec<AttributeValue>> {
        let names = distinct(
            self.watched(user_id)
                .into_iter()
                .flat_map(|film| film.attribute(kind)),
        );
        Ok(names.into_iter().map(AttributeValue::named).collect())
    }

    #[instrument(skip(self, values, exclude_titles), fields(provider = "memory"))]
    async fn popular_within(
        &self,
        kind: AttributeKind,
        values: &[AttributeValue],
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let counts = self.rental_counts();
        let scored = self
            .films
            .iter()
            .filter(|film| !exclude_titles.contains(&film.title))
            .filter_map(|film| {
                let matches = film
                    .attribute(kind)
                    .into_iter()
                    .filter(|v| values.iter().any(|wanted| wanted.key == *v))
                    .count();
                let rentals = counts.get(&film.film_id).copied().unwrap_or(0);
                match kind {
                    AttributeKind::Actor if matches > 0 => {
                        Some((matches, rentals, film.title.clone()))
                    }
                    AttributeKind::Actor => None,
                    _ if matches > 0 && rentals > 0 => Some((0, rentals, film.title.clone())),
                    _ => None,
                }
            })
            .collect();
        Ok(Self::rank(scored, limit))
    }

    #[instrument(skip(self, exclude_titles), fields(provider = "memory"))]
    async fn popular_overall(
        &self,
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let counts = self.rental_counts();
        let scored = self
            .films
            .iter()
            .filter(|film| !exclude_titles.contains(&film.title))
            .filter_map(|film| {
                let rentals = counts.get(&film.film_id).copied().unwrap_or(0);
                (rentals > 0).then(|| (0, rentals, film.title.clone()))
            })
            .collect();
        Ok(Self::rank(scored, limit))
    }

    #[instrument(skip(self), fields(provider = "memory"))]
    async fn fulltext_of_watched(&self, user_id: i32) -> AppResult<Vec<String>> {
        Ok(distinct(
            self.watched(user_id)
                .into_iter()
                .filter_map(|film| film.fulltext.as_deref()),
        ))
    }

    #[instrument(skip(self, preferences, exclude_titles), fields(provider = "memory"))]
    async fn candidates_by_keyword_affinity(
        &self,
        preferences: &TermWeights,
        exclude_titles: &[String],
        limit: usize,
    ) -> AppResult<Vec<KeywordCandidate>> {
        if preferences.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &FilmRecord, &str)> = self
            .films
            .iter()
            .filter(|film| !exclude_titles.contains(&film.title))
            .filter_map(|film| {
                let fulltext = film.fulltext.as_deref()?;
                let parsed = TermWeights::parse(fulltext);
                let matched = preferences
                    .iter()
                    .filter(|(keyword, _)| parsed.contains(keyword))
                    .count();
                (matched > 0).then_some((matched, film, fulltext))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.title.cmp(&b.1.title)));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, film, fulltext)| KeywordCandidate {
                title: film.title.clone(),
                fulltext: fulltext.to_string(),
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
