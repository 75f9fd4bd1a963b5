use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::matcher::{Candidate, TextMatcher};
use crate::EditError;

/// Similarity measure used for fuzzy matching, all provided by `strsim`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FuzzyAlgorithm {
    #[default]
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

impl FuzzyAlgorithm {
    #[must_use]
    pub fn similarity(self, a: &str, b: &str) -> f64 {
        match self {
            FuzzyAlgorithm::Levenshtein => strsim::normalized_levenshtein(a, b),
            FuzzyAlgorithm::JaroWinkler => strsim::jaro_winkler(a, b),
            FuzzyAlgorithm::SorensenDice => strsim::sorensen_dice(a, b),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyOptions {
    /// Minimum similarity in `0.0..=1.0` a candidate needs to be kept
    pub threshold: f64,
    pub algorithm: FuzzyAlgorithm,

    /// Collapse runs of whitespace before comparing
    pub normalize_whitespace: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        FuzzyOptions {
            threshold: 0.8,
            algorithm: FuzzyAlgorithm::default(),
            normalize_whitespace: true,
        }
    }
}

/// Finds word-aligned windows of the haystack that are similar to the
/// needle.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    needle: String,
    needle_chars: usize,
    options: FuzzyOptions,
}

impl FuzzyMatcher {
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] for an empty needle or a
    /// threshold outside of `0.0..=1.0`.
    pub fn new(needle: &str, options: FuzzyOptions) -> Result<Self, EditError> {
        if !(0.0..=1.0).contains(&options.threshold) {
            return Err(EditError::invalid_operation(format!(
                "fuzzy threshold {} is not within 0.0..=1.0",
                options.threshold
            )));
        }

        let needle = normalize(needle, options.normalize_whitespace);
        if needle.is_empty() {
            return Err(EditError::invalid_operation("cannot search for empty text"));
        }

        Ok(FuzzyMatcher {
            needle_chars: needle.chars().count(),
            needle,
            options,
        })
    }

    fn score(&self, window: &str) -> f64 {
        self.options.algorithm.similarity(
            &normalize(window, self.options.normalize_whitespace),
            &self.needle,
        )
    }
}

impl TextMatcher for FuzzyMatcher {
    fn find_candidates(&self, haystack: &str) -> Vec<Candidate> {
        let words = word_ranges(haystack);
        let min_chars = self.needle_chars / 2;
        let max_chars = self.needle_chars * 2;

        let mut candidates = Vec::new();
        for (i, first) in words.iter().enumerate() {
            for last in &words[i..] {
                let window = &haystack[first.start..last.end];
                let chars = window.chars().count();
                if chars > max_chars {
                    break;
                }
                if chars < min_chars {
                    continue;
                }

                let score = self.score(window);
                if score >= self.options.threshold {
                    candidates.push(Candidate {
                        range: first.start..last.end,
                        score,
                    });
                }
            }
        }

        best_non_overlapping(candidates)
    }
}

/// Keeps the best candidate of every overlapping group: higher scores win,
/// ties go to the leftmost candidate.
fn best_non_overlapping(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.range.start.cmp(&b.range.start))
            .then(a.range.len().cmp(&b.range.len()))
    });

    let mut selected: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps = selected.iter().any(|kept| {
            kept.range.start < candidate.range.end && candidate.range.start < kept.range.end
        });
        if !overlaps {
            selected.push(candidate);
        }
    }

    selected.sort_by_key(|candidate| candidate.range.start);
    selected
}

/// Byte ranges of the whitespace-separated words of `text`.
fn word_ranges(text: &str) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut word_start = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), word_start) {
            (true, Some(start)) => {
                result.push(start..i);
                word_start = None;
            }
            (false, None) => word_start = Some(i),
            _ => {}
        }
    }

    if let Some(start) = word_start {
        result.push(start..text.len());
    }

    result
}

fn normalize(text: &str, normalize_whitespace: bool) -> String {
    if normalize_whitespace {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.to_owned()
    }
}
