//! Word completion from history
//!
//! Candidates are the identifiers seen in earlier entries. The completion is
//! the longest prefix all candidates share.

use super::buffer::is_word_char;
use std::collections::BTreeSet;

/// Distinct identifiers in `entries` that extend `prefix`
pub fn candidates<'a>(prefix: &str, entries: &'a [String]) -> BTreeSet<&'a str> {
    if prefix.is_empty() {
        return BTreeSet::new();
    }
    entries
        .iter()
        .flat_map(|entry| entry.split(|c: char| !is_word_char(c)))
        .filter(|word| word.len() > prefix.len() && word.starts_with(prefix))
        .collect()
}

/// Text to insert after `prefix`, if the candidates agree on any
pub fn complete(prefix: &str, entries: &[String]) -> Option<String> {
    let found = candidates(prefix, entries);
    let mut words = found.iter();
    let first = *words.next()?;

    let mut common = first.len();
    for word in words {
        common = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((at, a), _)| at + a.len_utf8())
            .min(common);
    }

    let suffix = &first[prefix.len()..common.max(prefix.len())];
    (!suffix.is_empty()).then(|| suffix.to_string())
}
