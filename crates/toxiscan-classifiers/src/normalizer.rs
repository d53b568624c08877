//! Text normalization
//!
//! Turns a raw comment into the token string the vectorizer was fitted on:
//!
//! 1. lowercase and trim
//! 2. drop URLs and emails
//! 3. drop `@mentions`, unwrap `#hashtags`
//! 4. expand contractions
//! 5. replace anything outside `[a-z0-9\s]` with a space
//! 6. collapse runs of three or more identical characters to two
//! 7. drop stop-words and (for the lemmatizing backend) lemmatize
//!
//! Normalization is total: any input yields a string, possibly empty.

use crate::lemmatizer::Lemmatizer;
use crate::lexicon::{stop_word_set, CONTRACTIONS};
use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use toxiscan_core::{Error, Result};

/// Upper bound on lemmatize/collapse rounds per token
const MAX_FIXPOINT_ROUNDS: usize = 8;

/// Capability interface for text normalizers
pub trait Normalizer: Send + Sync {
    /// Normalize a single text
    fn normalize(&self, text: &str) -> String;

    /// Normalize an optional text; absent input becomes the empty string
    fn normalize_optional(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }

    /// Backend name, reported in logs and `/health`
    fn name(&self) -> &str;
}

/// Available normalizer backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerBackend {
    /// Full pipeline with rule-based lemmatization
    #[default]
    Lemmatizing,
    /// Same pipeline without lemmatization
    Simple,
}

/// Normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub backend: NormalizerBackend,

    #[serde(default = "default_remove_stopwords")]
    pub remove_stopwords: bool,

    /// Additional domain stop-words
    #[serde(default)]
    pub extra_stop_words: Vec<String>,
}

fn default_remove_stopwords() -> bool {
    true
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            backend: NormalizerBackend::default(),
            remove_stopwords: default_remove_stopwords(),
            extra_stop_words: Vec::new(),
        }
    }
}

impl NormalizerConfig {
    /// Build the configured backend
    pub fn build(&self) -> Result<Arc<dyn Normalizer>> {
        let normalizer = TextNormalizer::new(self)?;
        Ok(Arc::new(normalizer))
    }
}

/// Shared cleaning stages (steps 1-6)
struct Cleaner {
    url_regex: Regex,
    email_regex: Regex,
    mention_regex: Regex,
    hashtag_regex: Regex,
    disallowed_regex: Regex,
    contractions: AhoCorasick,
    expansions: Vec<&'static str>,
}

impl Cleaner {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::internal(format!("Failed to compile normalizer regex: {}", e)))
        };

        let (patterns, expansions): (Vec<&'static str>, Vec<&'static str>) =
            CONTRACTIONS.iter().copied().unzip();

        let contractions = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| Error::internal(format!("Failed to build contraction matcher: {}", e)))?;

        Ok(Self {
            url_regex: compile(r"http\S+|www\.\S+")?,
            email_regex: compile(r"\S+@\S+")?,
            mention_regex: compile(r"@\w+")?,
            hashtag_regex: compile(r"#(\w+)")?,
            disallowed_regex: compile(r"[^a-z0-9\s]")?,
            contractions,
            expansions,
        })
    }

    fn clean(&self, text: &str) -> String {
        let text = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let text = text.trim();

        let text = self.url_regex.replace_all(text, "");
        let text = self.email_regex.replace_all(&text, "");
        let text = self.mention_regex.replace_all(&text, "");
        let text = self.hashtag_regex.replace_all(&text, "$1");
        let text = self.contractions.replace_all(&text, &self.expansions);
        let text = self.disallowed_regex.replace_all(&text, " ");

        // Collapsing can turn a run like "htttpx" into a fresh url token
        let text = collapse_repeats(&text);
        self.url_regex.replace_all(&text, "").into_owned()
    }
}

/// Collapse runs of three or more identical characters to exactly two
pub fn collapse_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut run = 0usize;

    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run <= 2 {
            out.push(c);
        }
    }

    out
}

/// Default normalizer implementation, parameterized by backend
pub struct TextNormalizer {
    name: String,
    cleaner: Cleaner,
    stop_words: HashSet<String>,
    remove_stopwords: bool,
    lemmatizer: Option<Lemmatizer>,
}

impl TextNormalizer {
    /// Create a normalizer from configuration
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let lemmatizer = match config.backend {
            NormalizerBackend::Lemmatizing => Some(Lemmatizer::new()),
            NormalizerBackend::Simple => None,
        };
        let name = match config.backend {
            NormalizerBackend::Lemmatizing => "lemmatizing",
            NormalizerBackend::Simple => "simple",
        };

        Ok(Self {
            name: name.to_string(),
            cleaner: Cleaner::new()?,
            stop_words: stop_word_set(&config.extra_stop_words),
            remove_stopwords: config.remove_stopwords,
            lemmatizer,
        })
    }

    /// Lemmatizing normalizer with default stop-words
    pub fn lemmatizing() -> Result<Self> {
        Self::new(&NormalizerConfig::default())
    }

    /// Non-lemmatizing normalizer with default stop-words
    pub fn simple() -> Result<Self> {
        Self::new(&NormalizerConfig {
            backend: NormalizerBackend::Simple,
            ..Default::default()
        })
    }

    fn is_stop_word(&self, token: &str) -> bool {
        self.remove_stopwords && self.stop_words.contains(token)
    }

    fn lemma(&self, token: &str) -> String {
        let Some(lemmatizer) = &self.lemmatizer else {
            return token.to_string();
        };

        let mut current = token.to_string();
        for _ in 0..MAX_FIXPOINT_ROUNDS {
            let next = collapse_repeats(&lemmatizer.lemmatize(&current));
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

impl Normalizer for TextNormalizer {
    fn normalize(&self, text: &str) -> String {
        let cleaned = self.cleaner.clean(text);

        let tokens: Vec<String> = cleaned
            .split_whitespace()
            .filter(|token| !self.is_stop_word(token))
            .map(|token| self.lemma(token))
            .filter(|lemma| !lemma.is_empty() && !self.is_stop_word(lemma))
            .collect();

        tokens.join(" ")
    }

    fn name(&self) -> &str {
        &self.name
    }
}
