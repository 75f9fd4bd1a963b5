use thiserror::Error;

use crate::matching::MatchLocation;

/// Error type for every fallible operation on a [`crate::Document`].
///
/// All variants are recoverable: a failed operation leaves the document
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    /// The searched text does not occur in any paragraph of the selected scope
    #[error("Text not found: `{pattern}`")]
    TextNotFound {
        /// The pattern that was searched for
        pattern: String,
    },

    /// More than one match was found where a single target was required
    #[error("Text `{pattern}` is ambiguous: found {count} matches")]
    AmbiguousText {
        /// The pattern that was searched for
        pattern: String,
        /// The number of matches
        count: usize,
        /// Where each match was found, in document order
        locations: Vec<MatchLocation>,
    },

    /// The target region already sits inside a tracked change that cannot
    /// contain the requested one
    #[error("Text `{text}` is already tracked by {kind} change {id}")]
    AlreadyTracked {
        /// The text of the rejected target
        text: String,
        /// The id of the conflicting tracked change
        id: u32,
        /// The kind of the conflicting tracked change
        kind: &'static str,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Tracked change {0} not found")]
    ChangeNotFound(u32),

    #[error("Invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structural check failed after an operation had been applied. The
    /// document has been restored to its state before the operation.
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl EditError {
    /// Short, stable name of the error variant, used in batch results.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            EditError::TextNotFound { .. } => "TextNotFound",
            EditError::AmbiguousText { .. } => "AmbiguousText",
            EditError::AlreadyTracked { .. } => "AlreadyTracked",
            EditError::InvalidOperation(_) => "InvalidOperation",
            EditError::ChangeNotFound(_) => "ChangeNotFound",
            EditError::InvalidPattern { .. } => "InvalidPattern",
            EditError::InvalidConfig(_) => "InvalidConfig",
            EditError::InvariantViolation(_) => "InvariantViolation",
        }
    }

    pub(crate) fn invalid_operation(reason: impl Into<String>) -> Self {
        EditError::InvalidOperation(reason.into())
    }
}
