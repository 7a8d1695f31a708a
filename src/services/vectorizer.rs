//! TF-IDF vector space fitted over the whole catalog.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::models::FilmRecord;
use crate::services::text::{canonical_text, tokenize, STOP_WORD_MARKER};

/// Sparse row: (column, weight) pairs sorted by column
pub type SparseVector = Vec<(usize, f64)>;

/// Fitted TF-IDF model together with the catalog snapshot it was fitted from.
///
/// Row `i` of the matrix always describes `catalog[i]`.
#[derive(Debug, Clone)]
pub struct VectorModel {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    matrix: Vec<SparseVector>,
    catalog: Arc<Vec<FilmRecord>>,
    stop_words: bool,
}

impl VectorModel {
    /// Fits the model over the canonical text of every film. Returns `None` for an empty catalog.
    pub fn fit(catalog: Vec<FilmRecord>) -> Option<Self> {
        if catalog.is_empty() {
            return None;
        }

        let corpus: Vec<String> = catalog.iter().map(canonical_text).collect();
        let stop_words = corpus[0].contains(STOP_WORD_MARKER);
        let documents: Vec<Vec<String>> = corpus
            .iter()
            .map(|doc| tokenize(doc, stop_words))
            .collect();

        let terms: BTreeSet<&str> = documents
            .iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect();
        let vocabulary: HashMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term.to_string(), i))
            .collect();

        let mut document_frequency = vec![0usize; vocabulary.len()];
        for tokens in &documents {
            let unique: BTreeSet<usize> = tokens.iter().map(|t| vocabulary[t]).collect();
            for column in unique {
                document_frequency[column] += 1;
            }
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut model = Self {
            vocabulary,
            idf,
            matrix: Vec::with_capacity(documents.len()),
            catalog: Arc::new(catalog),
            stop_words,
        };
        let matrix = documents.iter().map(|tokens| model.weigh(tokens)).collect();
        model.matrix = matrix;

        Some(model)
    }

    /// Projects text into the fitted space; unknown terms are ignored
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text, self.stop_words))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&column) = self.vocabulary.get(token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();
        row.sort_by_key(|&(column, _)| column);
        row
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Vocabulary terms in column order
    pub fn vocabulary(&self) -> Vec<&str> {
        let mut terms: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(term, &column)| (term.as_str(), column))
            .collect();
        terms.sort_by_key(|&(_, column)| column);
        terms.into_iter().map(|(term, _)| term).collect()
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.matrix
    }

    pub fn catalog(&self) -> &[FilmRecord] {
        &self.catalog
    }

    pub fn document_count(&self) -> usize {
        self.matrix.len()
    }

    /// Whether the English stop-word list was active during fit. It is switched on
    /// only when the first corpus document contains [`STOP_WORD_MARKER`].
    pub fn stop_words_enabled(&self) -> bool {
        self.stop_words
    }
}

/// Element-wise mean of sparse rows as a dense vector of `dimensions` columns
pub fn mean_vector(rows: &[SparseVector], dimensions: usize) -> Vec<f64> {
    let mut mean = vec![0.0; dimensions];
    if rows.is_empty() {
        return mean;
    }
    for row in rows {
        for &(column, weight) in row {
            mean[column] += weight;
        }
    }
    let count = rows.len() as f64;
    for value in &mut mean {
        *value /= count;
    }
    mean
}

/// Cosine similarity between a dense and a sparse vector, clamped to [0, 1].
/// A zero-norm side yields 0.0.
pub fn cosine_similarity(dense: &[f64], sparse: &SparseVector) -> f64 {
    let dense_norm = dense.iter().map(|x| x * x).sum::<f64>().sqrt();
    let sparse_norm = sparse.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
    if dense_norm == 0.0 || sparse_norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = sparse
        .iter()
        .map(|&(column, weight)| dense.get(column).copied().unwrap_or(0.0) * weight)
        .sum();
    (dot / (dense_norm * sparse_norm)).clamp(0.0, 1.0)
}
