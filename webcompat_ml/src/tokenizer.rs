//! Text to token-sequence adapters.
//!
//! Every vectorizer goes through the [`Tokenize`] capability, so an NLP backend
//! can be swapped without touching feature extraction. Two built-in tokenizers
//! cover the issue schema: [`EnglishTokenizer`] for prose fields and
//! [`LabelTokenizer`] for the comma separated GitHub label list.

use bincode::{Decode, Encode};
use unicode_segmentation::UnicodeSegmentation;

/// Splits a text into an ordered sequence of tokens.
pub trait Tokenize {
    /// Tokenizes `text`.
    ///
    /// # Arguments
    ///
    /// * `text` - Input text.
    ///
    /// # Returns
    ///
    /// Tokens in order of appearance. Duplicates are kept.
    fn tokenize(&self, text: &str) -> Vec<String>;
}

impl<T> Tokenize for &T
where
    T: Tokenize + ?Sized,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        (**self).tokenize(text)
    }
}

// Based on the spaCy English stop list, trimmed to the entries that survive
// UAX #29 word segmentation.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "done", "down", "during", "each",
    "either", "else", "even", "ever", "every", "few", "for", "from", "further", "had", "has",
    "have", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
    "however", "i", "if", "in", "into", "is", "it", "it's", "its", "itself", "just", "may", "me",
    "might", "more", "most", "must", "my", "myself", "neither", "no", "nor", "not", "now", "of",
    "off", "often", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "per", "please", "quite", "rather", "really", "same", "say", "see", "seem",
    "several", "she", "should", "since", "so", "some", "still", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "though", "through", "thus", "to", "together", "too", "under", "until", "up", "upon", "us",
    "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "where", "whether",
    "which", "while", "who", "whole", "whom", "whose", "why", "will", "with", "within",
    "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Checks whether a lowercased word is an English stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Reduces an English word to a base form with suffix rules.
///
/// Only plain plural, `-ing` and `-ed` forms are handled. The input is
/// expected to be lowercased already.
pub fn lemmatize(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 3 && word.ends_with("es") {
        let stem = &word[..word.len() - 2];
        if stem.ends_with("ss")
            || stem.ends_with("sh")
            || stem.ends_with("ch")
            || stem.ends_with('x')
        {
            return stem.to_string();
        }
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    if word.len() > 5 && word.ends_with("ing") {
        return undouble(&word[..word.len() - 3]);
    }
    if word.len() > 4 && word.ends_with("ied") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 4 && word.ends_with("ed") {
        return undouble(&word[..word.len() - 2]);
    }
    word.to_string()
}

/// Drops a trailing doubled consonant (`runn` -> `run`).
fn undouble(stem: &str) -> String {
    let mut chars = stem.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(last), Some(prev))
            if last == prev && last.is_ascii_alphabetic() && !"aeiouls".contains(last) =>
        {
            stem[..stem.len() - last.len_utf8()].to_string()
        }
        _ => stem.to_string(),
    }
}

/// Tokenizer for English prose: word segmentation, stop word removal and
/// lemmatization.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnglishTokenizer;

impl EnglishTokenizer {
    /// Creates a new EnglishTokenizer.
    pub const fn new() -> Self {
        Self
    }
}

impl Tokenize for EnglishTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(str::to_lowercase)
            .filter(|word| !is_stop_word(word))
            .map(|word| lemmatize(&word))
            .collect()
    }
}

/// Tokenizer for label lists such as `"browser-firefox, type-media"`.
///
/// Labels are separated by commas or whitespace and kept whole.
#[derive(Clone, Copy, Debug, Default)]
pub struct LabelTokenizer;

impl LabelTokenizer {
    /// Creates a new LabelTokenizer.
    pub const fn new() -> Self {
        Self
    }
}

impl Tokenize for LabelTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .map(|label| label.trim_matches(|c: char| matches!(c, '"' | '\'' | '[' | ']')))
            .filter(|label| !label.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

/// Serializable choice of built-in tokenizer, stored with each fitted
/// vectorizer so inference tokenizes exactly as training did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Analyzer {
    English,
    Labels,
}

impl Tokenize for Analyzer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        match self {
            Self::English => EnglishTokenizer.tokenize(text),
            Self::Labels => LabelTokenizer.tokenize(text),
        }
    }
}
