//! Locating text inside a [`Document`].
//!
//! A [`TextQuery`] combines a scope (which paragraphs are searched), a match
//! predicate (exact, regex, fuzzy or a custom [`TextMatcher`]) and an
//! [`Occurrence`] selector. Matches never cross paragraph boundaries.

use std::{ops::Range, sync::Arc};

use log::debug;

use crate::{
    Document, EditError,
    document::ParagraphAddress,
    text_view::{TextSpan, logical_text, offset_to_span},
};

pub mod fuzzy;
pub mod matcher;
pub mod scope;

pub use fuzzy::{FuzzyAlgorithm, FuzzyMatcher, FuzzyOptions};
pub use matcher::{Candidate, ExactMatcher, RegexMatcher, TextMatcher};
pub use scope::{Scope, ScopeContext};

use scope::SectionStack;

/// Which of the matches of a query are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occurrence {
    /// Exactly one match is required
    #[default]
    Unique,
    First,
    Last,

    /// Zero-based index into the matches in document order
    Nth(usize),
    All,
}

/// Where a match was found, reported by [`EditError::AmbiguousText`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLocation {
    pub part: String,
    pub paragraph: usize,
    pub range: Range<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub location: MatchLocation,
    pub span: TextSpan,
    pub score: f64,
}

impl TextMatch {
    #[must_use]
    pub fn address(&self) -> ParagraphAddress { self.span.address }

    #[must_use]
    pub fn text(&self) -> &str { self.span.text() }
}

#[derive(Debug, Clone)]
enum Predicate {
    Exact,
    Regex,
    Fuzzy(Option<FuzzyOptions>),
    Custom(Arc<dyn TextMatcher + Send + Sync>),
}

/// Describes the text an operation targets.
#[derive(Debug, Clone)]
pub struct TextQuery {
    pattern: String,
    predicate: Predicate,
    regex_requested: bool,
    scope: Scope,
    occurrence: Occurrence,
    include_deleted: Option<bool>,
}

impl TextQuery {
    /// Exact substring search for `pattern`, requiring a unique match.
    pub fn new(pattern: impl Into<String>) -> Self {
        TextQuery {
            pattern: pattern.into(),
            predicate: Predicate::Exact,
            regex_requested: false,
            scope: Scope::All,
            occurrence: Occurrence::Unique,
            include_deleted: None,
        }
    }

    /// Search for matches of the regular expression `pattern`.
    pub fn regex(pattern: impl Into<String>) -> Self { Self::new(pattern).with_regex() }

    /// Search with a custom predicate. `description` is used in errors.
    pub fn custom(
        description: impl Into<String>,
        matcher: impl TextMatcher + Send + Sync + 'static,
    ) -> Self {
        TextQuery {
            predicate: Predicate::Custom(Arc::new(matcher)),
            ..Self::new(description)
        }
    }

    #[must_use]
    pub fn with_regex(mut self) -> Self {
        self.regex_requested = true;
        if matches!(self.predicate, Predicate::Exact) {
            self.predicate = Predicate::Regex;
        }
        self
    }

    /// Fuzzy search, using the document's configured options when `options`
    /// is `None`.
    #[must_use]
    pub fn with_fuzzy(mut self, options: Option<FuzzyOptions>) -> Self {
        self.predicate = Predicate::Fuzzy(options);
        self
    }

    #[must_use]
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = occurrence;
        self
    }

    #[must_use]
    pub fn first(self) -> Self { self.occurrence(Occurrence::First) }

    #[must_use]
    pub fn last(self) -> Self { self.occurrence(Occurrence::Last) }

    #[must_use]
    pub fn nth(self, index: usize) -> Self { self.occurrence(Occurrence::Nth(index)) }

    #[must_use]
    pub fn all(self) -> Self { self.occurrence(Occurrence::All) }

    #[must_use]
    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = Some(include_deleted);
        self
    }

    #[must_use]
    pub fn pattern(&self) -> &str { &self.pattern }

    #[must_use]
    pub fn scope(&self) -> &Scope { &self.scope }

    #[must_use]
    pub fn selected_occurrence(&self) -> Occurrence { self.occurrence }

    pub(crate) fn includes_deleted(&self, document: &Document) -> bool {
        self.include_deleted
            .unwrap_or(document.config().include_deleted)
    }

    fn matcher(
        &self,
        document: &Document,
    ) -> Result<Arc<dyn TextMatcher + Send + Sync>, EditError> {
        if self.regex_requested && !matches!(self.predicate, Predicate::Regex) {
            return Err(EditError::invalid_operation(
                "regex matching cannot be combined with fuzzy or custom matching",
            ));
        }

        let matcher: Arc<dyn TextMatcher + Send + Sync> = match &self.predicate {
            Predicate::Exact => Arc::new(ExactMatcher::new(self.pattern.as_str())?),
            Predicate::Regex => Arc::new(RegexMatcher::new(&self.pattern)?),
            Predicate::Fuzzy(options) => Arc::new(FuzzyMatcher::new(
                &self.pattern,
                options
                    .clone()
                    .unwrap_or_else(|| document.config().fuzzy.clone()),
            )?),
            Predicate::Custom(matcher) => Arc::clone(matcher),
        };
        Ok(matcher)
    }
}

impl From<&str> for TextQuery {
    fn from(pattern: &str) -> Self { TextQuery::new(pattern) }
}

impl From<String> for TextQuery {
    fn from(pattern: String) -> Self { TextQuery::new(pattern) }
}

impl Document {
    /// Every match of `query` in document order, ignoring its occurrence
    /// selector.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidPattern`] or
    /// [`EditError::InvalidOperation`] when the query itself is invalid.
    pub fn find_all(&self, query: &TextQuery) -> Result<Vec<TextMatch>, EditError> {
        self.find_all_with(query, query.includes_deleted(self))
    }

    pub(crate) fn find_all_with(
        &self,
        query: &TextQuery,
        include_deleted: bool,
    ) -> Result<Vec<TextMatch>, EditError> {
        let matcher = query.matcher(self)?;
        let mut matches = Vec::new();

        for (part_index, part) in self.parts().iter().enumerate() {
            let mut sections = SectionStack::default();

            for (paragraph_index, paragraph) in part.paragraphs().iter().enumerate() {
                let address = ParagraphAddress::new(part_index, paragraph_index);
                let context = ScopeContext {
                    address,
                    part,
                    paragraph,
                    sections: sections.enter(paragraph),
                };
                if !query.scope.matches(&context) {
                    continue;
                }

                let text = logical_text(paragraph.content(), include_deleted);
                for candidate in matcher.find_candidates(&text) {
                    let span = offset_to_span(
                        paragraph,
                        address,
                        candidate.range.clone(),
                        include_deleted,
                    )?;
                    matches.push(TextMatch {
                        location: MatchLocation {
                            part: part.name().to_owned(),
                            paragraph: paragraph_index,
                            range: candidate.range,
                            text: span.text().to_owned(),
                        },
                        span,
                        score: candidate.score,
                    });
                }
            }
        }

        debug!(
            "Found {} match(es) for `{}` (include_deleted: {include_deleted})",
            matches.len(),
            query.pattern
        );
        Ok(matches)
    }

    /// The matches of `query` selected by its occurrence.
    ///
    /// # Errors
    ///
    /// - [`EditError::TextNotFound`] when nothing matches or an explicit
    ///   index is out of range
    /// - [`EditError::AmbiguousText`] when a unique match is required but
    ///   several exist
    /// - [`EditError::InvalidPattern`] or [`EditError::InvalidOperation`] for
    ///   invalid queries
    pub fn find_text(&self, query: &TextQuery) -> Result<Vec<TextMatch>, EditError> {
        select(query, self.find_all(query)?)
    }
}

pub(crate) fn select(
    query: &TextQuery,
    mut matches: Vec<TextMatch>,
) -> Result<Vec<TextMatch>, EditError> {
    let not_found = || EditError::TextNotFound {
        pattern: query.pattern.clone(),
    };

    if matches.is_empty() {
        return Err(not_found());
    }

    match query.occurrence {
        Occurrence::All => Ok(matches),
        Occurrence::First => Ok(vec![matches.swap_remove(0)]),
        Occurrence::Last => Ok(matches.pop().into_iter().collect()),
        Occurrence::Nth(index) if index < matches.len() => Ok(vec![matches.swap_remove(index)]),
        Occurrence::Nth(_) => Err(not_found()),
        Occurrence::Unique if matches.len() == 1 => Ok(matches),
        Occurrence::Unique => Err(EditError::AmbiguousText {
            pattern: query.pattern.clone(),
            count: matches.len(),
            locations: matches.into_iter().map(|found| found.location).collect(),
        }),
    }
}
