use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::AttributeKind;

/// Recommendation strategy selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Category,
    Actor,
    Language,
    Rating,
    Popularity,
    Fulltext,
    /// TF-IDF semantic similarity
    #[serde(rename = "ml")]
    Semantic,
}

impl Focus {
    pub const ALL: [Focus; 7] = [
        Focus::Category,
        Focus::Actor,
        Focus::Language,
        Focus::Rating,
        Focus::Popularity,
        Focus::Fulltext,
        Focus::Semantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Focus::Category => "category",
            Focus::Actor => "actor",
            Focus::Language => "language",
            Focus::Rating => "rating",
            Focus::Popularity => "popularity",
            Focus::Fulltext => "fulltext",
            Focus::Semantic => "ml",
        }
    }

    /// Attribute matched by the categorical rankers, if this focus is one of them
    pub fn attribute(&self) -> Option<AttributeKind> {
        match self {
            Focus::Category => Some(AttributeKind::Genre),
            Focus::Actor => Some(AttributeKind::Actor),
            Focus::Language => Some(AttributeKind::Language),
            Focus::Rating => Some(AttributeKind::Rating),
            Focus::Popularity | Focus::Fulltext | Focus::Semantic => None,
        }
    }

    /// Comma separated list of accepted selectors
    pub fn valid_options() -> String {
        Focus::ALL
            .iter()
            .map(Focus::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selector that did not name any known focus
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown focus '{0}'")]
pub struct UnknownFocus(pub String);

impl FromStr for Focus {
    type Err = UnknownFocus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "category" | "categories" => Ok(Focus::Category),
            "actor" | "actors" => Ok(Focus::Actor),
            "language" | "languages" => Ok(Focus::Language),
            "rating" | "ratings" => Ok(Focus::Rating),
            "popularity" => Ok(Focus::Popularity),
            "fulltext" => Ok(Focus::Fulltext),
            "ml" => Ok(Focus::Semantic),
            _ => Err(UnknownFocus(s.to_string())),
        }
    }
}

/// A single recommended film with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_id: Option<i32>,
    /// Similarity score in [0, 1]; only set on the semantic path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub explanation: String,
}

impl RecommendationCandidate {
    pub fn new(title: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            film_id: None,
            score: None,
            explanation: explanation.into(),
        }
    }

    /// Candidate with an empty title that only carries an explanation
    pub fn placeholder(explanation: impl Into<String>) -> Self {
        Self::new(String::new(), explanation)
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_film_id(mut self, film_id: Option<i32>) -> Self {
        self.film_id = film_id;
        self
    }
}

/// How a recommendation list was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Ranked,
    InsufficientSignal,
    Degraded,
    InvalidFocus,
}

/// Result of one ranker before it is wrapped for the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ranked(Vec<RecommendationCandidate>),
    /// Not enough history for the ranker; popularity list or explanatory placeholder
    InsufficientSignal(Vec<RecommendationCandidate>),
    /// A provider or model failure converted into an explainable result
    Degraded(RecommendationCandidate),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Ranked(_) => OutcomeKind::Ranked,
            Outcome::InsufficientSignal(_) => OutcomeKind::InsufficientSignal,
            Outcome::Degraded(_) => OutcomeKind::Degraded,
        }
    }

    pub fn into_candidates(self) -> Vec<RecommendationCandidate> {
        match self {
            Outcome::Ranked(candidates) | Outcome::InsufficientSignal(candidates) => candidates,
            Outcome::Degraded(candidate) => vec![candidate],
        }
    }
}

/// Uniform response of the dispatcher regardless of the path taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub focus: String,
    pub outcome: OutcomeKind,
    pub candidates: Vec<RecommendationCandidate>,
}

impl Recommendations {
    pub fn from_outcome(focus: Focus, outcome: Outcome) -> Self {
        Self {
            focus: focus.as_str().to_string(),
            outcome: outcome.kind(),
            candidates: outcome.into_candidates(),
        }
    }

    /// Placeholder answer for a selector outside [`Focus::ALL`]
    pub fn invalid_focus(selector: &str) -> Self {
        Self {
            focus: selector.to_string(),
            outcome: OutcomeKind::InvalidFocus,
            candidates: vec![RecommendationCandidate::placeholder(format!(
                "Invalid recommendation focus. Valid options: {}.",
                Focus::valid_options()
            ))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_parses_wire_names_and_aliases() {
        assert_eq!("category".parse::<Focus>().unwrap(), Focus::Category);
        assert_eq!("Categories".parse::<Focus>().unwrap(), Focus::Category);
        assert_eq!("ACTORS".parse::<Focus>().unwrap(), Focus::Actor);
        assert_eq!("ml".parse::<Focus>().unwrap(), Focus::Semantic);
        assert_eq!("fulltext".parse::<Focus>().unwrap(), Focus::Fulltext);
    }

    #[test]
    fn test_focus_rejects_unknown() {
        let err = "directors".parse::<Focus>().unwrap_err();
        assert_eq!(err, UnknownFocus("directors".to_string()));
    }

    #[test]
    fn test_focus_round_trips_through_as_str() {
        for focus in Focus::ALL {
            assert_eq!(focus.as_str().parse::<Focus>().unwrap(), focus);
        }
    }

    #[test]
    fn test_categorical_focus_maps_to_attribute() {
        assert_eq!(Focus::Category.attribute(), Some(AttributeKind::Genre));
        assert_eq!(Focus::Actor.attribute(), Some(AttributeKind::Actor));
        assert_eq!(Focus::Rating.attribute(), Some(AttributeKind::Rating));
        assert_eq!(Focus::Popularity.attribute(), None);
        assert_eq!(Focus::Semantic.attribute(), None);
    }

    #[test]
    fn test_semantic_focus_serializes_as_ml() {
        assert_eq!(serde_json::to_string(&Focus::Semantic).unwrap(), "\"ml\"");
    }

    #[test]
    fn test_invalid_focus_lists_all_options() {
        let result = Recommendations::invalid_focus("unknown_value");
        assert_eq!(result.outcome, OutcomeKind::InvalidFocus);
        assert_eq!(result.candidates.len(), 1);
        let explanation = &result.candidates[0].explanation;
        for focus in Focus::ALL {
            assert!(explanation.contains(focus.as_str()));
        }
    }

    #[test]
    fn test_candidate_omits_missing_score() {
        let json = serde_json::to_value(RecommendationCandidate::new("A", "why")).unwrap();
        assert!(json.get("score").is_none());
        assert!(json.get("film_id").is_none());

        let json = serde_json::to_value(RecommendationCandidate::new("A", "why").with_score(0.0))
            .unwrap();
        assert_eq!(json["score"], 0.0);
    }

    #[test]
    fn test_degraded_outcome_yields_single_candidate() {
        let outcome = Outcome::Degraded(RecommendationCandidate::placeholder("boom"));
        assert_eq!(outcome.kind(), OutcomeKind::Degraded);
        assert_eq!(outcome.into_candidates().len(), 1);
    }
}
