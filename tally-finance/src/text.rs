//! Bag-of-words features: tokenization, unigram + bigram extraction and a
//! document-frequency-pruned vocabulary.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::stop_words::is_stop_word;

// Runs of two or more word characters
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is valid"));

/// Lowercase, split into word tokens and drop stop words
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Unigrams followed by bigrams of adjacent (post stop-word) tokens
pub fn ngrams(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let bigrams: Vec<String> = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
    let mut out = tokens;
    out.extend(bigrams);
    out
}

/// Term → column index. Terms are kept in lexical order so the same training
/// data always produces the same columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Keep every n-gram that occurs in at least `min_df` documents.
    pub fn fit<S: AsRef<str>>(documents: &[S], min_df: usize) -> Self {
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique: HashSet<String> = ngrams(doc.as_ref()).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let terms = df
            .into_iter()
            .filter(|(_, count)| *count >= min_df)
            .map(|(term, _)| term)
            .collect();
        Self::from_terms(terms)
    }

    pub fn from_terms(terms: Vec<String>) -> Self {
        let index = terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
        Self { terms, index }
    }

    /// Rebuild the lookup index after deserialization
    pub(crate) fn reindex(&mut self) {
        self.index = self.terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Sparse term counts for one document; unknown n-grams are ignored.
    pub fn transform(&self, document: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(document) {
            if let Some(idx) = self.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        counts.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(tokenize("Checking OUT the new Cafe, a b"), vec!["checking", "new", "cafe"]);
    }

    #[test]
    fn test_ngrams_include_bigrams() {
        assert_eq!(
            ngrams("uber ride home"),
            vec!["uber", "ride", "home", "uber ride", "ride home"]
        );
    }

    #[test]
    fn test_bigrams_skip_over_stop_words() {
        assert_eq!(ngrams("movie at the cinema"), vec!["movie", "cinema", "movie cinema"]);
    }

    #[test]
    fn test_fit_prunes_by_document_frequency() {
        let docs = ["uber ride", "ola ride", "ola ride", "pizza"];
        let vocab = Vocabulary::fit(&docs, 2);
        assert_eq!(vocab.terms(), ["ola", "ola ride", "ride"]);
    }

    #[test]
    fn test_document_frequency_counts_documents_not_occurrences() {
        let vocab = Vocabulary::fit(&["pizza pizza", "burger"], 2);
        assert!(vocab.is_empty());
    }

    #[test]
    fn test_transform_counts_known_terms() {
        let vocab = Vocabulary::from_terms(vec!["ride".into(), "uber".into()]);
        assert_eq!(vocab.transform("Uber ride, uber!"), vec![(0, 1.0), (1, 2.0)]);
        assert!(vocab.transform("pizza").is_empty());
    }

    #[test]
    fn test_reindex_after_serde() {
        let vocab = Vocabulary::from_terms(vec!["ride".into()]);
        let json = serde_json::to_string(&vocab).unwrap();
        let mut back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("ride"), None);
        back.reindex();
        assert_eq!(back.get("ride"), Some(0));
    }
}
