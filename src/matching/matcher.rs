use core::fmt::Debug;
use std::ops::Range;

use regex::Regex;

use crate::EditError;

/// A candidate match inside one paragraph's logical text.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub range: Range<usize>,

    /// Similarity in `0.0..=1.0`, exact and regex matches score `1.0`
    pub score: f64,
}

impl Candidate {
    #[must_use]
    pub fn exact(range: Range<usize>) -> Self { Candidate { range, score: 1.0 } }
}

/// A match predicate run against the logical text of a single paragraph.
///
/// Implementations must return non-overlapping candidates ordered by start
/// offset, with ranges on character boundaries of `haystack`.
pub trait TextMatcher: Debug {
    fn find_candidates(&self, haystack: &str) -> Vec<Candidate>;
}

#[derive(Debug, Clone)]
pub struct ExactMatcher {
    needle: String,
}

impl ExactMatcher {
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] for an empty needle.
    pub fn new(needle: impl Into<String>) -> Result<Self, EditError> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(EditError::invalid_operation("cannot search for empty text"));
        }
        Ok(ExactMatcher { needle })
    }
}

impl TextMatcher for ExactMatcher {
    fn find_candidates(&self, haystack: &str) -> Vec<Candidate> {
        haystack
            .match_indices(self.needle.as_str())
            .map(|(start, matched)| Candidate::exact(start..start + matched.len()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    /// # Errors
    ///
    /// Returns [`EditError::InvalidPattern`] when the pattern does not
    /// compile.
    pub fn new(pattern: &str) -> Result<Self, EditError> {
        Regex::new(pattern)
            .map(|regex| RegexMatcher { regex })
            .map_err(|error| EditError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: error.to_string(),
            })
    }
}

impl TextMatcher for RegexMatcher {
    fn find_candidates(&self, haystack: &str) -> Vec<Candidate> {
        self.regex
            .find_iter(haystack)
            .filter(|found| !found.is_empty())
            .map(|found| Candidate::exact(found.range()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_exact_matches_are_non_overlapping() {
        let matcher = ExactMatcher::new("aa").unwrap();
        assert_eq!(
            matcher.find_candidates("aaaa"),
            vec![Candidate::exact(0..2), Candidate::exact(2..4)]
        );
        assert!(ExactMatcher::new("").is_err());
    }

    #[test]
    fn test_regex_skips_empty_matches() {
        let matcher = RegexMatcher::new(r"\d*").unwrap();
        assert_eq!(
            matcher.find_candidates("a12b3"),
            vec![Candidate::exact(1..3), Candidate::exact(4..5)]
        );
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            RegexMatcher::new("(unclosed"),
            Err(EditError::InvalidPattern { .. })
        ));
    }
}
