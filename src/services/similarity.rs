use std::collections::HashSet;

use crate::{
    models::FilmRecord,
    services::{
        text::canonical_text,
        vectorizer::{cosine_similarity, mean_vector, SparseVector, VectorModel},
    },
};

/// Catalog film scored against a user profile
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFilm {
    pub film_id: i32,
    pub title: String,
    pub score: f64,
}

/// Mean of the watched films' projections, or `None` for an empty watched set
pub fn user_profile(model: &VectorModel, watched: &[FilmRecord]) -> Option<Vec<f64>> {
    if watched.is_empty() {
        return None;
    }
    let rows: Vec<SparseVector> = watched
        .iter()
        .map(|film| model.transform(&canonical_text(film)))
        .collect();
    Some(mean_vector(&rows, model.vocabulary_size()))
}

/// Ranks the model's catalog by cosine similarity to the user's watched films.
///
/// Watched films are excluded by id; equal scores keep catalog order.
pub fn score(model: &VectorModel, watched: &[FilmRecord], limit: usize) -> Vec<ScoredFilm> {
    let Some(profile) = user_profile(model, watched) else {
        return Vec::new();
    };
    let watched_ids: HashSet<i32> = watched.iter().map(|film| film.film_id).collect();

    let mut scored: Vec<ScoredFilm> = model
        .catalog()
        .iter()
        .zip(model.rows())
        .filter(|(film, _)| !watched_ids.contains(&film.film_id))
        .map(|(film, row)| ScoredFilm {
            film_id: film.film_id,
            title: film.title.clone(),
            score: cosine_similarity(&profile, row),
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}
