//! Word extraction, tested with golden files under `tests/`.

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WordError {
    #[error("no words in {0:?}")]
    Empty(String),
}

/// Lowercased alphanumeric runs of `text`, in order.
pub fn find_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The longest word of `text`. Ties keep the first one.
pub fn longest_word(text: &str) -> Result<String, WordError> {
    let words = find_words(text);
    let max = words
        .iter()
        .map(|word| word.chars().count())
        .max()
        .ok_or_else(|| WordError::Empty(text.to_string()))?;

    let mut longest = words.into_iter().filter(|word| word.chars().count() == max);
    let first = longest.next().unwrap_or_default();
    if longest.next().is_some() {
        warn!("several longest words, keeping {:?}", first);
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_words_splits_on_punctuation() {
        assert_eq!(find_words("Don't panic!"), vec!["don", "t", "panic"]);
        assert!(find_words(" ,. ").is_empty());
    }

    #[test]
    fn test_longest_word() {
        assert_eq!(longest_word("a bb ccc").unwrap(), "ccc");
        assert_eq!(longest_word("cat dog").unwrap(), "cat");
        assert_eq!(longest_word("").unwrap_err(), WordError::Empty(String::new()));
    }
}
