//! Text normalisation shared by the message, channel and index aggregates.
//!
//! Tokens are split on a single space; consecutive spaces yield empty
//! tokens, which are kept.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Anything that is not a letter, a digit, an underscore or a literal space.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_ ]").expect("regex is valid"));

/// Strip punctuation, lowercase, then split on single spaces.
///
/// ```
/// use chatlog_core::text::clean_words;
///
/// assert_eq!(clean_words("Hi! there you"), vec!["hi", "there", "you"]);
/// assert_eq!(clean_words("a  b"), vec!["a", "", "b"]);
/// ```
pub fn clean_words(contents: &str) -> Vec<String> {
    let stripped = NON_WORD.replace_all(contents, "");
    stripped
        .to_lowercase()
        .split(' ')
        .map(str::to_string)
        .collect()
}

/// Split raw text on single spaces without any normalisation.
pub fn words(contents: &str) -> Vec<String> {
    contents.split(' ').map(str::to_string).collect()
}

/// Number of Unicode scalar values in `contents`.
pub fn char_length(contents: &str) -> usize {
    contents.chars().count()
}

/// Number of single-space separated tokens in `contents`.
pub fn word_count(contents: &str) -> usize {
    contents.split(' ').count()
}

// ── WordFrequency ─────────────────────────────────────────────────────────────

/// Running tally of clean words.
#[derive(Debug, Clone, Default)]
pub struct WordFrequency {
    counts: HashMap<String, usize>,
}

impl WordFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally the clean words of `contents`. Empty tokens are not counted.
    pub fn add_text(&mut self, contents: &str) {
        for word in clean_words(contents) {
            if word.is_empty() {
                continue;
            }
            *self.counts.entry(word).or_insert(0) += 1;
        }
    }

    /// Occurrences of `word`, `0` when never seen.
    pub fn get(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All `(word, count)` pairs, most frequent first; ties alphabetical.
    pub fn into_sorted(self) -> Vec<(String, usize)> {
        let mut pairs: Vec<(String, usize)> = self.counts.into_iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pairs
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── clean_words ───────────────────────────────────────────────────────────

    #[test]
    fn test_clean_words_strips_punctuation_and_lowercases() {
        assert_eq!(clean_words("Hi! there you"), vec!["hi", "there", "you"]);
    }

    #[test]
    fn test_clean_words_removes_rather_than_replaces() {
        assert_eq!(clean_words("Hi! there--you"), vec!["hi", "thereyou"]);
    }

    #[test]
    fn test_clean_words_keeps_empty_tokens() {
        assert_eq!(clean_words("a  b"), vec!["a", "", "b"]);
        // A punctuation-only token collapses to an empty string.
        assert_eq!(clean_words("ok ?! fine"), vec!["ok", "", "fine"]);
    }

    #[test]
    fn test_clean_words_keeps_digits_underscores_and_unicode_letters() {
        assert_eq!(
            clean_words("Größe_2 café!"),
            vec!["größe_2", "café"]
        );
    }

    #[test]
    fn test_clean_words_strips_combining_marks_and_connectors() {
        assert_eq!(clean_words("cafe\u{301}! x\u{203F}y"), vec!["cafe", "xy"]);
    }

    #[test]
    fn test_clean_words_empty_input() {
        assert_eq!(clean_words(""), vec![""]);
    }

    #[test]
    fn test_clean_words_tabs_and_newlines_are_removed() {
        assert_eq!(clean_words("a\tb\nc"), vec!["abc"]);
    }

    // ── words / counts ────────────────────────────────────────────────────────

    #[test]
    fn test_words_is_raw_split() {
        assert_eq!(words("Hi! there"), vec!["Hi!", "there"]);
        assert_eq!(words(" x"), vec!["", "x"]);
    }

    #[test]
    fn test_char_length_counts_chars_not_bytes() {
        assert_eq!(char_length("héllo"), 5);
        assert_eq!(char_length("👋"), 1);
        assert_eq!(char_length(""), 0);
    }

    #[test]
    fn test_word_count_matches_words_len() {
        for text in ["", "one", "one two", "a  b", " lead", "trail "] {
            assert_eq!(word_count(text), words(text).len(), "text: {:?}", text);
        }
    }

    // ── WordFrequency ─────────────────────────────────────────────────────────

    #[test]
    fn test_word_frequency_counts_clean_words() {
        let mut freq = WordFrequency::new();
        freq.add_text("Hello hello, world!");
        freq.add_text("world  peace");
        assert_eq!(freq.get("hello"), 2);
        assert_eq!(freq.get("world"), 2);
        assert_eq!(freq.get("peace"), 1);
        assert_eq!(freq.get(""), 0);
        assert_eq!(freq.len(), 3);
    }

    #[test]
    fn test_word_frequency_sorted_by_count_then_word() {
        let mut freq = WordFrequency::new();
        freq.add_text("b a c b a b");
        let sorted = freq.into_sorted();
        assert_eq!(
            sorted,
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_word_frequency_empty() {
        let freq = WordFrequency::new();
        assert!(freq.is_empty());
        assert!(freq.into_sorted().is_empty());
    }
}
