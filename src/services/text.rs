//! Text handling shared by the vectorizer and the full-text rankers.
//!
//! Everything here is pure: canonical document text for a film, the tokenizer
//! used when fitting the vector space, and the parser for weighted-term strings.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::models::FilmRecord;

/// Two or more word characters, matched on lowercased text
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid token regex"));

/// `'word':3,7` pairs inside a weighted-term string
static WEIGHTED_TERM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([a-zA-Z]+)':([\d,]+)").expect("Invalid weighted term regex"));

/// Literal that switches stop-word filtering on when found in the first corpus document
pub const STOP_WORD_MARKER: &str = "english";

static ENGLISH_STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone",
        "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became",
        "because", "become", "becomes", "becoming", "been", "before", "beforehand", "behind",
        "being", "below", "beside", "besides", "between", "beyond", "bill", "both", "bottom",
        "but", "by", "call", "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry",
        "de", "describe", "detail", "do", "done", "down", "due", "during", "each", "eg",
        "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even",
        "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen",
        "fifty", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty",
        "found", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
        "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
        "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred",
        "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself",
        "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
        "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
        "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
        "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
        "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
        "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
        "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
        "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
        "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
        "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than",
        "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
        "thereby", "therefore", "therein", "thereupon", "these", "they", "thick", "thin",
        "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
        "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
        "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were",
        "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
        "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
        "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
        "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Canonical document text of a film: title, description, category, actors,
/// language, rating and full-text joined by spaces, lowercased.
pub fn canonical_text(film: &FilmRecord) -> String {
    let actors = film.actors.join(" ");
    let parts = [
        Some(film.title.as_str()),
        film.description.as_deref(),
        film.category.as_deref(),
        Some(actors.as_str()),
        film.language.as_deref(),
        film.rating.as_deref(),
        film.fulltext.as_deref(),
    ];

    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Splits text into lowercase tokens, optionally dropping English stop words
pub fn tokenize(text: &str, drop_stop_words: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_REGEX
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !drop_stop_words || !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    ENGLISH_STOP_WORDS.contains(token)
}

/// Keyword weights kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermWeights {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl TermWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a weighted-term string; each value list contributes its sum
    pub fn parse(fulltext: &str) -> Self {
        let mut weights = Self::new();
        for cap in WEIGHTED_TERM_REGEX.captures_iter(fulltext) {
            let word = cap[1].to_lowercase();
            let sum: u64 = cap[2]
                .split(',')
                .filter_map(|value| value.parse::<u64>().ok())
                .sum();
            weights.add(&word, sum);
        }
        weights
    }

    /// Aggregates the parsed weights of several full-text strings
    pub fn aggregate<'a>(fulltexts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut total = Self::new();
        for fulltext in fulltexts {
            for (word, weight) in Self::parse(fulltext).entries {
                total.add(&word, weight);
            }
        }
        total
    }

    pub fn add(&mut self, word: &str, weight: u64) {
        match self.index.get(word) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(word.to_string(), self.entries.len());
                self.entries.push((word.to_string(), weight));
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.index.get(word).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keywords(&self) -> Vec<String> {
        self.entries.iter().map(|(word, _)| word.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(word, weight)| (word.as_str(), *weight))
    }

    /// Keywords by weight descending; equal weights keep insertion order
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for TermWeights {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut weights = Self::new();
        for (word, weight) in iter {
            weights.add(&word.into(), weight);
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film() -> FilmRecord {
        FilmRecord {
            film_id: 1,
            title: "ACADEMY DINOSAUR".to_string(),
            description: Some("A Epically Drama".to_string()),
            category: Some("Documentary".to_string()),
            language: Some("English".to_string()),
            rating: Some("PG".to_string()),
            actors: vec!["PENELOPE GUINESS".to_string(), "ROCK DUKAKIS".to_string()],
            fulltext: Some("'academi':1 'dinosaur':2".to_string()),
        }
    }

    #[test]
    fn test_canonical_text_joins_fields_in_order() {
        assert_eq!(
            canonical_text(&film()),
            "academy dinosaur a epically drama documentary penelope guiness rock dukakis english pg 'academi':1 'dinosaur':2"
        );
    }

    #[test]
    fn test_canonical_text_skips_missing_fields() {
        let film = FilmRecord {
            film_id: 2,
            title: "ACE GOLDFINGER".to_string(),
            description: None,
            category: None,
            language: None,
            rating: Some("G".to_string()),
            actors: Vec::new(),
            fulltext: None,
        };
        assert_eq!(canonical_text(&film), "ace goldfinger g");
    }

    #[test]
    fn test_tokenize_drops_single_characters() {
        assert_eq!(tokenize("A Epic Drama of a Cat", false), vec!["epic", "drama", "of", "cat"]);
    }

    #[test]
    fn test_tokenize_with_stop_words() {
        assert_eq!(tokenize("the story of the robot", true), vec!["story", "robot"]);
        assert!(is_stop_word("the"));
        assert!(!is_stop_word("robot"));
    }

    #[test]
    fn test_parse_sums_positions() {
        let weights = TermWeights::parse("'drama':3 'robot':1,7 'drama':2");
        assert_eq!(weights.get("drama"), Some(5));
        assert_eq!(weights.get("robot"), Some(8));
        assert_eq!(weights.keywords(), vec!["drama", "robot"]);
    }

    #[test]
    fn test_parse_ignores_malformed_pairs() {
        let weights = TermWeights::parse("drama:3 'r2d2':4 'cat':");
        assert!(weights.is_empty());
    }

    #[test]
    fn test_aggregate_across_films() {
        let weights = TermWeights::aggregate(["'thriller':4 'drama':1", "'thriller':5 'drama':1"]);
        assert_eq!(weights.get("thriller"), Some(9));
        assert_eq!(weights.get("drama"), Some(2));
    }

    #[test]
    fn test_ranked_is_stable_for_ties() {
        let weights: TermWeights = vec![("boat", 2), ("shark", 5), ("astronaut", 2)]
            .into_iter()
            .collect();
        assert_eq!(weights.ranked(), vec![("shark", 5), ("boat", 2), ("astronaut", 2)]);
    }
}
