use std::collections::HashSet;

use crate::{
    models::{KeywordCandidate, RecommendationCandidate},
    services::text::TermWeights,
};

/// Maximum number of full-text recommendations returned
pub const TOTAL_LIMIT: usize = 10;

/// Maximum number of recommendations credited to one keyword
pub const PER_KEYWORD_LIMIT: usize = 3;

/// The candidate pool is fetched at this multiple of [`TOTAL_LIMIT`]
pub const CANDIDATE_EXPANSION: usize = 5;

/// Picks a varied list from a relevance-ordered candidate pool.
///
/// Keywords are visited by preference weight (ties keep first-seen order). Each
/// keyword takes up to `cap_per_key` unselected candidates whose full-text
/// contains it, scanning the pool in order, until `cap_total` is reached.
pub fn diversify(
    pool: &[KeywordCandidate],
    preferences: &TermWeights,
    cap_total: usize,
    cap_per_key: usize,
) -> Vec<RecommendationCandidate> {
    let parsed: Vec<TermWeights> = pool
        .iter()
        .map(|candidate| TermWeights::parse(&candidate.fulltext))
        .collect();

    let mut selected: Vec<RecommendationCandidate> = Vec::new();
    let mut taken: HashSet<&str> = HashSet::new();

    for (keyword, _) in preferences.ranked() {
        if selected.len() >= cap_total {
            break;
        }

        let mut per_keyword = 0;
        for (candidate, terms) in pool.iter().zip(&parsed) {
            if per_keyword >= cap_per_key || selected.len() >= cap_total {
                break;
            }
            if taken.contains(candidate.title.as_str()) {
                continue;
            }
            let Some(weight) = terms.get(keyword) else {
                continue;
            };

            taken.insert(candidate.title.as_str());
            selected.push(RecommendationCandidate::new(
                candidate.title.clone(),
                format!("Affinity with the theme '{}' (score: {})", keyword, weight),
            ));
            per_keyword += 1;
        }
    }

    selected
}
