//! TF-IDF and term-count feature extraction
//!
//! A vectorizer is fitted once on a training corpus and then reused
//! read-only: `transform` never changes the vocabulary or idf weights.

use crate::lexicon::stop_word_set;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use toxiscan_core::{Error, Result};
use tracing::{debug, info};

/// Dense feature matrix, one row per input text
pub type FeatureMatrix = Vec<Vec<f64>>;

/// Weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorizerScheme {
    /// Term frequency scaled by smoothed inverse document frequency, L2-normalized
    #[default]
    Tfidf,
    /// Raw term counts
    Count,
}

/// Document-frequency cutoff: an absolute document count or a proportion of the corpus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocFrequency {
    Count(usize),
    Proportion(f64),
}

impl DocFrequency {
    fn resolve(&self, n_docs: usize) -> f64 {
        match self {
            Self::Count(count) => *count as f64,
            Self::Proportion(p) => p * n_docs as f64,
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        match self {
            Self::Proportion(p) if !(0.0..=1.0).contains(p) => Err(Error::config(format!(
                "{} proportion must be within [0, 1], got {}",
                field, p
            ))),
            _ => Ok(()),
        }
    }
}

/// Vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    #[serde(default)]
    pub scheme: VectorizerScheme,

    /// Vocabulary cap; `None` keeps every term that survives df pruning
    #[serde(default = "default_max_features")]
    pub max_features: Option<usize>,

    /// Inclusive n-gram span
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),

    #[serde(default = "default_min_df")]
    pub min_df: DocFrequency,

    #[serde(default = "default_max_df")]
    pub max_df: DocFrequency,

    /// Drop built-in English stop-words before building n-grams
    #[serde(default = "default_true")]
    pub stop_words: bool,

    #[serde(default = "default_true")]
    pub lowercase: bool,
}

fn default_max_features() -> Option<usize> {
    Some(1000)
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

fn default_min_df() -> DocFrequency {
    DocFrequency::Count(2)
}

fn default_max_df() -> DocFrequency {
    DocFrequency::Proportion(0.95)
}

fn default_true() -> bool {
    true
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            scheme: VectorizerScheme::default(),
            max_features: default_max_features(),
            ngram_range: default_ngram_range(),
            min_df: default_min_df(),
            max_df: default_max_df(),
            stop_words: true,
            lowercase: true,
        }
    }
}

impl VectorizerConfig {
    /// Check settings that do not depend on the corpus
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::config(format!(
                "invalid ngram_range ({}, {})",
                min_n, max_n
            )));
        }
        if self.max_features == Some(0) {
            return Err(Error::config("max_features must be positive"));
        }
        self.min_df.validate("min_df")?;
        self.max_df.validate("max_df")?;
        Ok(())
    }

    /// Learn vocabulary (and idf weights for TF-IDF) from a corpus
    pub fn fit<S: AsRef<str>>(&self, corpus: &[S]) -> Result<FittedVectorizer> {
        self.validate()?;
        if corpus.is_empty() {
            return Err(Error::invalid_argument("cannot fit vectorizer on an empty corpus"));
        }

        let analyzer = Analyzer::new(self)?;
        let n_docs = corpus.len();

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            let counts = analyzer.term_counts(doc.as_ref());
            for (term, count) in counts {
                *term_freq.entry(term.clone()).or_insert(0) += count;
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        if doc_freq.is_empty() {
            return Err(Error::invalid_argument(
                "empty vocabulary: documents contain only stop-words or no tokens",
            ));
        }

        let max_doc_count = self.max_df.resolve(n_docs);
        let min_doc_count = self.min_df.resolve(n_docs);
        if max_doc_count < min_doc_count {
            return Err(Error::config(
                "max_df corresponds to fewer documents than min_df",
            ));
        }

        let mut kept: Vec<(String, usize)> = doc_freq
            .iter()
            .filter(|&(_, &df)| (df as f64) >= min_doc_count && (df as f64) <= max_doc_count)
            .map(|(term, _)| (term.clone(), term_freq.get(term).copied().unwrap_or(0)))
            .collect();

        if kept.is_empty() {
            return Err(Error::config(
                "no terms remain after document-frequency pruning; relax min_df or max_df",
            ));
        }

        if let Some(limit) = self.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(limit);
        }

        let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let idf = match self.scheme {
            VectorizerScheme::Tfidf => Some(
                terms
                    .iter()
                    .map(|term| {
                        let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                        ((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0
                    })
                    .collect(),
            ),
            VectorizerScheme::Count => None,
        };

        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(index, term)| (term, index))
            .collect();

        info!(
            documents = n_docs,
            vocabulary_size = vocabulary.len(),
            scheme = ?self.scheme,
            "Fitted vectorizer"
        );

        Ok(FittedVectorizer {
            state: VectorizerState {
                config: self.clone(),
                vocabulary,
                idf,
            },
            analyzer,
        })
    }
}

/// Tokenizer, stop-word filter and n-gram builder
struct Analyzer {
    token_regex: Regex,
    stop_words: Option<HashSet<String>>,
    lowercase: bool,
    ngram_range: (usize, usize),
}

impl Analyzer {
    fn new(config: &VectorizerConfig) -> Result<Self> {
        let token_regex = Regex::new(r"\b\w\w+\b")
            .map_err(|e| Error::internal(format!("Failed to compile token regex: {}", e)))?;
        let stop_words = config
            .stop_words
            .then(|| stop_word_set(std::iter::empty::<&str>()));

        Ok(Self {
            token_regex,
            stop_words,
            lowercase: config.lowercase,
            ngram_range: config.ngram_range,
        })
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        self.token_regex
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| {
                self.stop_words
                    .as_ref()
                    .map_or(true, |stop| !stop.contains(*token))
            })
            .map(str::to_string)
            .collect()
    }

    fn term_counts(&self, text: &str) -> HashMap<String, usize> {
        let tokens = self.tokens(text);
        let (min_n, max_n) = self.ngram_range;
        let mut counts = HashMap::new();

        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                *counts.entry(window.join(" ")).or_insert(0) += 1;
            }
        }

        counts
    }
}

/// Serialized part of a fitted vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorizerState {
    config: VectorizerConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Option<Vec<f64>>,
}

/// Immutable, fitted vectorizer
pub struct FittedVectorizer {
    state: VectorizerState,
    analyzer: Analyzer,
}

impl std::fmt::Debug for FittedVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedVectorizer")
            .field("scheme", &self.state.config.scheme)
            .field("vocabulary_size", &self.state.vocabulary.len())
            .finish()
    }
}

impl FittedVectorizer {
    /// Number of output columns
    pub fn vocabulary_size(&self) -> usize {
        self.state.vocabulary.len()
    }

    /// Column index of a term, if it is in the vocabulary
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.state.vocabulary.get(term).copied()
    }

    /// Vocabulary terms in column order
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names = vec![""; self.vocabulary_size()];
        for (term, &index) in &self.state.vocabulary {
            names[index] = term.as_str();
        }
        names
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.state.config
    }

    /// Inverse document frequency weights, present for TF-IDF only
    pub fn idf(&self) -> Option<&[f64]> {
        self.state.idf.as_deref()
    }

    /// Vectorize one text
    pub fn transform_one(&self, text: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.vocabulary_size()];

        for (term, count) in self.analyzer.term_counts(text) {
            if let Some(&index) = self.state.vocabulary.get(&term) {
                row[index] = count as f64;
            }
        }

        if let Some(idf) = &self.state.idf {
            for (value, weight) in row.iter_mut().zip(idf) {
                *value *= weight;
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for value in row.iter_mut() {
                    *value /= norm;
                }
            }
        }

        row
    }

    /// Vectorize many texts; shape is `(texts.len(), vocabulary_size())`
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> FeatureMatrix {
        texts.iter().map(|t| self.transform_one(t.as_ref())).collect()
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.state)?)
    }

    /// Restore from JSON bytes produced by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: VectorizerState = serde_json::from_slice(bytes)?;
        Self::from_state(state)
    }

    fn from_state(state: VectorizerState) -> Result<Self> {
        state.config.validate()?;

        let size = state.vocabulary.len();
        if let Some(idf) = &state.idf {
            if idf.len() != size {
                return Err(Error::internal(format!(
                    "idf length {} does not match vocabulary size {}",
                    idf.len(),
                    size
                )));
            }
        }
        if state.vocabulary.values().any(|&index| index >= size) {
            return Err(Error::internal("vocabulary index out of range"));
        }

        let analyzer = Analyzer::new(&state.config)?;
        Ok(Self { state, analyzer })
    }

    /// Write the fitted vectorizer to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)?;
        debug!(path = %path.display(), "Saved vectorizer");
        Ok(())
    }

    /// Read a fitted vectorizer from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "stupid idiot video",
            "great video love",
            "stupid idiot",
            "love great music",
            "idiot comment",
        ]
    }

    fn unigram_config() -> VectorizerConfig {
        VectorizerConfig {
            ngram_range: (1, 1),
            min_df: DocFrequency::Count(1),
            max_df: DocFrequency::Proportion(1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let vectorizer = unigram_config().fit(&corpus()).unwrap();
        assert_eq!(
            vectorizer.feature_names(),
            vec!["comment", "great", "idiot", "love", "music", "stupid", "video"]
        );
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let config = VectorizerConfig {
            min_df: DocFrequency::Count(2),
            ..unigram_config()
        };
        let vectorizer = config.fit(&corpus()).unwrap();
        assert_eq!(
            vectorizer.feature_names(),
            vec!["great", "idiot", "love", "stupid", "video"]
        );
    }

    #[test]
    fn test_max_df_prunes_common_terms() {
        let config = VectorizerConfig {
            max_df: DocFrequency::Proportion(0.5),
            ..unigram_config()
        };
        let vectorizer = config.fit(&corpus()).unwrap();
        assert!(vectorizer.term_index("idiot").is_none());
        assert!(vectorizer.term_index("video").is_some());
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let config = VectorizerConfig {
            max_features: Some(2),
            ..unigram_config()
        };
        let vectorizer = config.fit(&corpus()).unwrap();
        // idiot appears 3 times; great, love, stupid and video twice each
        assert_eq!(vectorizer.feature_names(), vec!["great", "idiot"]);
    }

    #[test]
    fn test_bigrams() {
        let config = VectorizerConfig {
            ngram_range: (1, 2),
            ..unigram_config()
        };
        let vectorizer = config.fit(&corpus()).unwrap();
        assert!(vectorizer.term_index("stupid idiot").is_some());
        assert!(vectorizer.term_index("great video").is_some());
    }

    #[test]
    fn test_stop_words_removed_before_ngrams() {
        let config = VectorizerConfig {
            ngram_range: (2, 2),
            ..unigram_config()
        };
        let vectorizer = config.fit(&["stupid and ugly", "so stupid"]).unwrap();
        assert_eq!(vectorizer.feature_names(), vec!["stupid ugly"]);
    }

    #[test]
    fn test_tfidf_rows_are_unit_norm() {
        let vectorizer = unigram_config().fit(&corpus()).unwrap();
        let matrix = vectorizer.transform(&["stupid idiot video", "great"]);
        assert_eq!(matrix.len(), 2);
        for row in &matrix {
            assert_eq!(row.len(), vectorizer.vocabulary_size());
            let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_idf_weights() {
        let vectorizer = unigram_config().fit(&corpus()).unwrap();
        let idf = vectorizer.idf().unwrap();
        let idiot = vectorizer.term_index("idiot").unwrap();
        let music = vectorizer.term_index("music").unwrap();
        assert!((idf[idiot] - ((6.0f64 / 4.0).ln() + 1.0)).abs() < 1e-12);
        assert!((idf[music] - ((6.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_count_scheme() {
        let config = VectorizerConfig {
            scheme: VectorizerScheme::Count,
            ..unigram_config()
        };
        let vectorizer = config.fit(&corpus()).unwrap();
        assert!(vectorizer.idf().is_none());
        let row = vectorizer.transform_one("idiot idiot video");
        assert_eq!(row[vectorizer.term_index("idiot").unwrap()], 2.0);
        assert_eq!(row[vectorizer.term_index("video").unwrap()], 1.0);
        assert_eq!(row.iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn test_unknown_terms_give_zero_row() {
        let vectorizer = unigram_config().fit(&corpus()).unwrap();
        let row = vectorizer.transform_one("completely unrelated words");
        assert!(row.iter().all(|v| *v == 0.0));
        assert!(vectorizer.transform_one("").iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_fit_errors() {
        let empty: Vec<&str> = vec![];
        assert!(matches!(
            unigram_config().fit(&empty),
            Err(Error::InvalidArgument(_))
        ));

        assert!(matches!(
            unigram_config().fit(&["the and of", "a"]),
            Err(Error::InvalidArgument(_))
        ));

        let inverted = VectorizerConfig {
            min_df: DocFrequency::Count(4),
            max_df: DocFrequency::Count(2),
            ..unigram_config()
        };
        assert!(matches!(inverted.fit(&corpus()), Err(Error::Config(_))));

        let nothing_left = VectorizerConfig {
            min_df: DocFrequency::Count(5),
            ..unigram_config()
        };
        assert!(matches!(nothing_left.fit(&corpus()), Err(Error::Config(_))));

        let bad_ngram = VectorizerConfig {
            ngram_range: (2, 1),
            ..unigram_config()
        };
        assert!(matches!(bad_ngram.fit(&corpus()), Err(Error::Config(_))));
    }

    #[test]
    fn test_persistence_preserves_transform() {
        let vectorizer = VectorizerConfig {
            ngram_range: (1, 2),
            ..unigram_config()
        }
        .fit(&corpus())
        .unwrap();

        let restored = FittedVectorizer::from_bytes(&vectorizer.to_bytes().unwrap()).unwrap();
        let text = "stupid idiot with a great video";
        assert_eq!(vectorizer.transform_one(text), restored.transform_one(text));
        assert_eq!(vectorizer.feature_names(), restored.feature_names());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorizer.json");
        let vectorizer = unigram_config().fit(&corpus()).unwrap();
        vectorizer.save(&path).unwrap();
        let loaded = FittedVectorizer::load(&path).unwrap();
        assert_eq!(loaded.vocabulary_size(), vectorizer.vocabulary_size());
    }

    #[test]
    fn test_config_from_yaml() {
        let config: VectorizerConfig =
            serde_yaml::from_str("scheme: count\nmin_df: 0.01\nmax_df: 10\nngram_range: [1, 3]")
                .unwrap();
        assert_eq!(config.scheme, VectorizerScheme::Count);
        assert_eq!(config.min_df, DocFrequency::Proportion(0.01));
        assert_eq!(config.max_df, DocFrequency::Count(10));
        assert_eq!(config.ngram_range, (1, 3));
        assert_eq!(config.max_features, Some(1000));
    }
}
