use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A catalog film with the fields the ranking engine reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FilmRecord {
    pub film_id: i32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Category (genre) name
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Rating code such as "PG-13"
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    /// Weighted-term string, e.g. `'drama':3 'robot':1,7`
    #[serde(default)]
    pub fulltext: Option<String>,
}

impl FilmRecord {
    /// Value of a categorical attribute. Actors are multi-valued and handled separately.
    pub fn attribute(&self, kind: AttributeKind) -> Vec<&str> {
        match kind {
            AttributeKind::Genre => self.category.as_deref().into_iter().collect(),
            AttributeKind::Language => self.language.as_deref().into_iter().collect(),
            AttributeKind::Rating => self.rating.as_deref().into_iter().collect(),
            AttributeKind::Actor => self.actors.iter().map(String::as_str).collect(),
        }
    }
}

/// Categorical attribute a ranker can match on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Genre,
    Actor,
    Language,
    Rating,
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeKind::Genre => write!(f, "genre"),
            AttributeKind::Actor => write!(f, "actor"),
            AttributeKind::Language => write!(f, "language"),
            AttributeKind::Rating => write!(f, "rating"),
        }
    }
}

/// One value of a watched attribute
///
/// `key` is what catalog queries match on, `label` is what explanations show.
/// They differ for actors, whose names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttributeValue {
    pub key: String,
    pub label: String,
}

impl AttributeValue {
    /// Value identified by its display name
    pub fn named(name: impl Into<String>) -> Self {
        let label = name.into();
        Self {
            key: label.clone(),
            label,
        }
    }
}

/// Watched film as echoed back next to a recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedFilmDetail {
    pub title: String,
    pub category: Option<String>,
    pub language: Option<String>,
    pub rating: Option<String>,
    pub actors: Vec<String>,
    pub fulltext: Option<String>,
}

impl From<&FilmRecord> for WatchedFilmDetail {
    fn from(film: &FilmRecord) -> Self {
        Self {
            title: film.title.clone(),
            category: film.category.clone(),
            language: film.language.clone(),
            rating: film.rating.clone(),
            actors: film.actors.clone(),
            fulltext: film.fulltext.clone(),
        }
    }
}

/// Catalog candidate returned by the keyword affinity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct KeywordCandidate {
    pub title: String,
    pub fulltext: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film() -> FilmRecord {
        FilmRecord {
            film_id: 1,
            title: "ACADEMY DINOSAUR".to_string(),
            description: Some("An Epic Drama".to_string()),
            category: Some("Documentary".to_string()),
            language: Some("English".to_string()),
            rating: Some("PG".to_string()),
            actors: vec!["PENELOPE GUINESS".to_string(), "CHRISTIAN GABLE".to_string()],
            fulltext: Some("'academi':1 'dinosaur':2".to_string()),
        }
    }

    #[test]
    fn test_attribute_projection() {
        let film = film();
        assert_eq!(film.attribute(AttributeKind::Genre), vec!["Documentary"]);
        assert_eq!(film.attribute(AttributeKind::Rating), vec!["PG"]);
        assert_eq!(film.attribute(AttributeKind::Actor).len(), 2);
    }

    #[test]
    fn test_attribute_projection_missing_value() {
        let mut film = film();
        film.language = None;
        assert!(film.attribute(AttributeKind::Language).is_empty());
    }

    #[test]
    fn test_film_record_deserializes_with_defaults() {
        let film: FilmRecord =
            serde_json::from_str(r#"{"film_id": 7, "title": "AIRPLANE SIERRA"}"#).unwrap();
        assert_eq!(film.film_id, 7);
        assert!(film.actors.is_empty());
        assert_eq!(film.fulltext, None);
    }

    #[test]
    fn test_attribute_kind_display() {
        assert_eq!(AttributeKind::Genre.to_string(), "genre");
        assert_eq!(
            serde_json::to_string(&AttributeKind::Language).unwrap(),
            "\"language\""
        );
    }
}
