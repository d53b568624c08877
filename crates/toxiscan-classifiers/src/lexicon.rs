//! Built-in English word lists used by the normalizer and vectorizer

use std::collections::HashSet;

/// Contraction expansions, matched leftmost-longest so specific entries such
/// as `don't` win over the generic `n't` suffix.
pub const CONTRACTIONS: &[(&str, &str)] = &[
    ("don't", "do not"),
    ("won't", "will not"),
    ("can't", "cannot"),
    ("n't", " not"),
    ("'re", " are"),
    ("'ve", " have"),
    ("'ll", " will"),
    ("'d", " would"),
    ("'m", " am"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("what's", "what is"),
    ("who's", "who is"),
    ("where's", "where is"),
    ("there's", "there is"),
    ("here's", "here is"),
    ("let's", "let us"),
    ("i'm", "i am"),
    ("you're", "you are"),
    ("he's", "he is"),
    ("she's", "she is"),
    ("we're", "we are"),
    ("they're", "they are"),
    ("i've", "i have"),
    ("you've", "you have"),
    ("we've", "we have"),
    ("they've", "they have"),
    ("i'll", "i will"),
    ("you'll", "you will"),
    ("he'll", "he will"),
    ("she'll", "she will"),
    ("we'll", "we will"),
    ("they'll", "they will"),
];

/// Negations carry toxicity signal ("not stupid") and are never treated as stop words.
pub const NEGATIONS: &[&str] = &["no", "not", "nor", "never", "cannot"];

/// English function words.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "almost", "alone", "along",
    "already", "also", "although", "always", "am", "among", "an", "and", "another", "any",
    "anyhow", "anyone", "anything", "anyway", "anywhere", "are", "around", "as", "at", "be",
    "became", "because", "become", "becomes", "been", "before", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "both", "but", "by", "can", "could", "did", "do",
    "does", "doing", "done", "down", "during", "each", "either", "else", "elsewhere", "enough",
    "etc", "even", "ever", "every", "everyone", "everything", "everywhere", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "hence", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "least", "less", "many", "may", "me", "meanwhile", "might",
    "mine", "more", "moreover", "most", "mostly", "much", "must", "my", "myself", "namely",
    "neither", "nevertheless", "next", "now", "of", "off", "often", "on", "once", "only",
    "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
    "own", "per", "perhaps", "please", "quite", "rather", "re", "s", "same", "several", "she",
    "should", "since", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "t", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
    "these", "they", "this", "those", "though", "through", "throughout", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very",
    "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
    "where", "whereas", "wherever", "whether", "which", "while", "who", "whoever", "whole",
    "whom", "whose", "why", "will", "with", "within", "without", "would", "yet", "you",
    "your", "yours", "yourself", "yourselves",
];

/// Build the default stop-word set plus any extra words
pub fn stop_word_set<I, S>(extra: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set: HashSet<String> = ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect();
    set.extend(extra.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
    for negation in NEGATIONS {
        set.remove(*negation);
    }
    set.remove("");
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negations_never_stop_words() {
        let set = stop_word_set(["not", "Never", "video"]);
        for negation in NEGATIONS {
            assert!(!set.contains(*negation), "{} should be kept", negation);
        }
        assert!(set.contains("video"));
        assert!(set.contains("the"));
    }

    #[test]
    fn test_stop_words_are_normalized_form() {
        for word in ENGLISH_STOP_WORDS {
            assert!(word.chars().all(|c| c.is_ascii_lowercase()), "{}", word);
        }
    }
}
