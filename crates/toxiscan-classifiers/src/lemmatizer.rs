//! Rule-based English lemmatizer
//!
//! Covers the inflections that matter for short social-media comments:
//! plural nouns, third-person verbs, progressive and past forms, plus a
//! table of common irregular forms. Output is always a fixed point, so
//! lemmatizing a lemma returns it unchanged.

use std::collections::{HashMap, HashSet};

/// Irregular inflections mapped to their lemma.
const IRREGULAR_FORMS: &[(&str, &str)] = &[
    ("am", "be"),
    ("are", "be"),
    ("is", "be"),
    ("was", "be"),
    ("were", "be"),
    ("been", "be"),
    ("being", "be"),
    ("has", "have"),
    ("had", "have"),
    ("having", "have"),
    ("does", "do"),
    ("did", "do"),
    ("done", "do"),
    ("doing", "do"),
    ("went", "go"),
    ("gone", "go"),
    ("goes", "go"),
    ("said", "say"),
    ("says", "say"),
    ("made", "make"),
    ("took", "take"),
    ("taken", "take"),
    ("gave", "give"),
    ("given", "give"),
    ("saw", "see"),
    ("seen", "see"),
    ("sees", "see"),
    ("came", "come"),
    ("got", "get"),
    ("gotten", "get"),
    ("knew", "know"),
    ("known", "know"),
    ("thought", "think"),
    ("told", "tell"),
    ("brought", "bring"),
    ("bought", "buy"),
    ("felt", "feel"),
    ("left", "leave"),
    ("lost", "lose"),
    ("ran", "run"),
    ("wrote", "write"),
    ("written", "write"),
    ("ate", "eat"),
    ("eaten", "eat"),
    ("died", "die"),
    ("dies", "die"),
    ("dying", "die"),
    ("lied", "lie"),
    ("lies", "lie"),
    ("lying", "lie"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "person"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("lives", "life"),
    ("wives", "wife"),
    ("knives", "knife"),
    ("idiots", "idiot"),
];

/// Words whose suffix looks inflectional but is part of the stem.
const PROTECTED_WORDS: &[&str] = &[
    "nothing", "something", "anything", "everything", "thing", "things", "morning", "evening",
    "ceiling", "wedding", "pudding", "during", "bring", "king", "sing", "ring", "string",
    "spring", "swing", "wing", "news", "always", "series", "species", "bus", "gas", "yes",
    "this", "his", "has", "was", "its", "us", "plus", "virus", "status", "bonus", "focus",
    "campus", "chaos", "alias", "atlas", "lens", "physics", "politics", "ethics", "mathematics",
    "need", "feed", "seed", "speed", "breed", "bleed", "weed", "deed", "greed", "indeed",
    "red", "bed", "shed", "wed", "fed", "led", "bred", "sped", "hundred", "sacred", "naked",
    "wicked", "wretched", "crooked", "beloved",
];

/// Rule-based lemmatizer with an irregular-form table
#[derive(Debug, Clone)]
pub struct Lemmatizer {
    irregular: HashMap<&'static str, &'static str>,
    protected: HashSet<&'static str>,
}

impl Lemmatizer {
    /// Minimum stem length a suffix rule may leave behind
    const MIN_STEM: usize = 3;

    pub fn new() -> Self {
        Self {
            irregular: IRREGULAR_FORMS.iter().copied().collect(),
            protected: PROTECTED_WORDS.iter().copied().collect(),
        }
    }

    /// Lemmatize a single lowercase ASCII token
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(lemma) = self.irregular.get(token) {
            return (*lemma).to_string();
        }
        if self.protected.contains(token) || token.len() <= Self::MIN_STEM {
            return token.to_string();
        }

        self.strip_plural(token)
            .or_else(|| self.strip_progressive(token))
            .or_else(|| self.strip_past(token))
            .unwrap_or_else(|| token.to_string())
    }

    fn strip_plural(&self, token: &str) -> Option<String> {
        if let Some(stem) = token.strip_suffix("ies") {
            if stem.len() >= 2 {
                return Some(format!("{}y", stem));
            }
        }
        if let Some(stem) = token.strip_suffix("sses") {
            return Some(format!("{}ss", stem));
        }
        for suffix in ["xes", "ches", "shes", "zzes"] {
            if let Some(stem) = token.strip_suffix(suffix) {
                let kept = &suffix[..suffix.len() - 2];
                return Some(format!("{}{}", stem, kept));
            }
        }
        if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
            return None;
        }
        let stem = token.strip_suffix('s')?;
        if stem.len() >= Self::MIN_STEM {
            Some(stem.to_string())
        } else {
            None
        }
    }

    fn strip_progressive(&self, token: &str) -> Option<String> {
        let stem = token.strip_suffix("ing")?;
        self.restore_stem(stem)
    }

    fn strip_past(&self, token: &str) -> Option<String> {
        if token.ends_with("eed") {
            return None;
        }
        if let Some(stem) = token.strip_suffix("ied") {
            if stem.len() >= 2 {
                return Some(format!("{}y", stem));
            }
        }
        let stem = token.strip_suffix("ed")?;
        self.restore_stem(stem)
    }

    /// Undo consonant doubling ("hitting" -> "hit") or restore a dropped
    /// final "e" ("hating" -> "hate") after removing -ing/-ed.
    fn restore_stem(&self, stem: &str) -> Option<String> {
        if stem.len() < Self::MIN_STEM - 1 || !stem.bytes().any(is_vowel) {
            return None;
        }

        let bytes = stem.as_bytes();
        let n = bytes.len();
        let last = bytes[n - 1];

        if n >= 2 && last == bytes[n - 2] && !is_vowel(last) && !matches!(last, b'l' | b's' | b'z')
        {
            return Some(stem[..n - 1].to_string());
        }

        if ends_consonant_vowel_consonant(bytes) && n <= 4 && !matches!(last, b'w' | b'x' | b'y') {
            return Some(format!("{}e", stem));
        }

        if n < Self::MIN_STEM {
            return None;
        }

        if matches!(last, b'v' | b'z' | b'c' | b'g' | b'u') && !stem.ends_with("ng") {
            return Some(format!("{}e", stem));
        }

        Some(stem.to_string())
    }
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn ends_consonant_vowel_consonant(bytes: &[u8]) -> bool {
    let n = bytes.len();
    n >= 3 && !is_vowel(bytes[n - 3]) && is_vowel(bytes[n - 2]) && !is_vowel(bytes[n - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plurals() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("comments"), "comment");
        assert_eq!(lemmatizer.lemmatize("stories"), "story");
        assert_eq!(lemmatizer.lemmatize("boxes"), "box");
        assert_eq!(lemmatizer.lemmatize("watches"), "watch");
        assert_eq!(lemmatizer.lemmatize("classes"), "class");
        assert_eq!(lemmatizer.lemmatize("glass"), "glass");
    }

    #[test]
    fn test_verb_forms() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("hating"), "hate");
        assert_eq!(lemmatizer.lemmatize("hated"), "hate");
        assert_eq!(lemmatizer.lemmatize("hitting"), "hit");
        assert_eq!(lemmatizer.lemmatize("killed"), "kill");
        assert_eq!(lemmatizer.lemmatize("talking"), "talk");
        assert_eq!(lemmatizer.lemmatize("tried"), "try");
    }

    #[test]
    fn test_irregular_and_protected() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("was"), "be");
        assert_eq!(lemmatizer.lemmatize("children"), "child");
        assert_eq!(lemmatizer.lemmatize("nothing"), "nothing");
        assert_eq!(lemmatizer.lemmatize("need"), "need");
        assert_eq!(lemmatizer.lemmatize("bring"), "bring");
    }

    #[test]
    fn test_short_tokens_untouched() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("bus"), "bus");
        assert_eq!(lemmatizer.lemmatize("ok"), "ok");
    }

    #[test]
    fn test_lemma_is_fixed_point() {
        let lemmatizer = Lemmatizer::new();
        for word in ["stories", "hating", "killed", "children", "boxes", "running", "fixes"] {
            let once = lemmatizer.lemmatize(word);
            assert_eq!(lemmatizer.lemmatize(&once), once, "{} -> {}", word, once);
        }
    }
}
