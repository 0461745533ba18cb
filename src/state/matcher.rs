//! Free-text answer matching.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::state::game::Entity;

const DELIMITER: char = ' ';

/// Lowercase, strip diacritics and collapse every run of punctuation or
/// whitespace into a single space, trimming both ends.
pub fn normalize(input: &str) -> String {
    let lowered: String = input.chars().flat_map(char::to_lowercase).collect();

    let mut normalized = String::with_capacity(lowered.len());
    let mut pending_delimiter = false;
    for c in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if pending_delimiter && !normalized.is_empty() {
                normalized.push(DELIMITER);
            }
            pending_delimiter = false;
            normalized.push(c);
        } else {
            pending_delimiter = true;
        }
    }
    normalized
}

/// Whether `guess` names `entity`, either by its canonical name or one of its
/// alternative names. Exact match after normalization, no fuzzy matching.
pub fn is_match(guess: &str, entity: &Entity) -> bool {
    let guess = normalize(guess);
    if guess.is_empty() {
        return false;
    }

    std::iter::once(&entity.name)
        .chain(entity.alt_names.iter())
        .any(|candidate| normalize(candidate) == guess)
}
