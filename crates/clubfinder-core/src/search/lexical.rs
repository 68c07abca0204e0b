//! Lexical matching and term extraction

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:'[\p{L}]+)?").expect("word pattern compiles"));

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "about", "into", "is", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "do", "does", "did", "will", "would", "can", "could", "should", "may", "i",
    "me", "my", "you", "your", "we", "our", "us", "they", "them", "their", "it", "its", "this",
    "that", "these", "those", "who", "what", "which", "all", "any", "some", "so", "if", "than",
    "too", "very", "just", "also", "not", "no", "up", "out",
];

/// Case-insensitive containment. An empty needle never matches.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Lowercased words with stop words removed, in text order
pub fn words(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Unigrams followed by bigrams of adjacent non-stop words
pub fn terms(text: &str) -> Vec<String> {
    let words = words(text);
    let bigrams: Vec<String> = words.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
    words.into_iter().chain(bigrams).collect()
}
