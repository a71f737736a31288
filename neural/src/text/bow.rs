//! Bag-of-words term counts

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Count vectorizer with a capped vocabulary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BagOfWords {
    max_features: usize,
    /// Term -> column, columns in lexicographic term order
    columns: BTreeMap<String, usize>,
    fitted: bool,
}

impl BagOfWords {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            columns: BTreeMap::new(),
            fitted: false,
        }
    }

    /// Lower-cased word tokens of at least two characters
    pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| word.chars().count() >= 2)
            .map(str::to_lowercase)
    }

    /// Keep the `max_features` most frequent terms of the corpus
    pub fn fit<'a>(&mut self, corpus: impl IntoIterator<Item = &'a str>) {
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for document in corpus {
            for term in Self::tokenize(document) {
                *frequencies.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let total = ranked.len();
        ranked.truncate(self.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();
        self.columns = terms.into_iter().enumerate().map(|(i, term)| (term, i)).collect();
        self.fitted = true;

        debug!("Bag of words kept {} of {} terms", self.columns.len(), total);
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Number of columns after fitting
    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Dense term counts; unknown terms are ignored
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut counts = vec![0.0; self.columns.len()];
        for term in Self::tokenize(text) {
            if let Some(&column) = self.columns.get(&term) {
                counts[column] += 1.0;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens: Vec<String> = BagOfWords::tokenize("Black's ko-threat, a 3-3 invasion!").collect();
        assert_eq!(tokens, vec!["black", "ko", "threat", "invasion"]);
    }

    #[test]
    fn test_fit_keeps_most_frequent() {
        let mut bow = BagOfWords::new(3);
        bow.fit(["ko ko ko atari", "atari tesuji", "ladder net", "ko"]);

        // ko=4, atari=2, then ladder/net/tesuji tie at 1 and ladder sorts first
        assert_eq!(bow.terms().collect::<Vec<_>>(), vec!["atari", "ko", "ladder"]);
        assert_eq!(bow.transform("Ko, KO and atari"), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_unfitted_is_empty() {
        let bow = BagOfWords::new(10);
        assert!(!bow.is_fitted());
        assert!(bow.transform("anything").is_empty());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let corpus = ["the corner is alive", "the group is dead", "alive or dead"];
        let mut a = BagOfWords::new(4);
        let mut b = BagOfWords::new(4);
        a.fit(corpus);
        b.fit(corpus);
        assert_eq!(a.terms().collect::<Vec<_>>(), b.terms().collect::<Vec<_>>());
    }
}
