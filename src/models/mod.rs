pub mod film;
pub mod recommendation;

pub use film::{AttributeKind, AttributeValue, FilmRecord, KeywordCandidate, WatchedFilmDetail};
pub use recommendation::{
    Focus, Outcome, OutcomeKind, RecommendationCandidate, Recommendations, UnknownFocus,
};
