use chrono::{DateTime, Utc};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::EditError;
use crate::matching::FuzzyOptions;

pub const DEFAULT_AUTHOR: &str = "Author";

/// Settings of an editing session on a [`crate::Document`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Author recorded on every tracked change created by the session
    #[cfg_attr(feature = "serde", serde(default = "default_author"))]
    pub author: String,

    /// Fixed timestamp for new tracked changes, the current time when unset
    #[cfg_attr(feature = "serde", serde(default))]
    pub date: Option<DateTime<Utc>>,

    /// Whether text searches see deleted text unless a query says otherwise
    #[cfg_attr(feature = "serde", serde(default = "default_include_deleted"))]
    pub include_deleted: bool,

    /// Whether inserted text is parsed as inline markdown (`**bold**`,
    /// `*italic*`, `++underline++`, `~~strikethrough~~`)
    #[cfg_attr(feature = "serde", serde(default = "default_markdown"))]
    pub markdown: bool,

    #[cfg_attr(feature = "serde", serde(default))]
    pub fuzzy: FuzzyOptions,

    /// Whether the comparator treats runs of whitespace as equal
    #[cfg_attr(feature = "serde", serde(default = "default_normalize_whitespace"))]
    pub compare_normalize_whitespace: bool,

    /// Whether batches keep going after a failed edit
    #[cfg_attr(feature = "serde", serde(default = "default_continue_on_error"))]
    pub continue_on_error: bool,
}

fn default_author() -> String {
    debug!("Using default author: {DEFAULT_AUTHOR}");
    DEFAULT_AUTHOR.to_owned()
}

fn default_include_deleted() -> bool {
    debug!("Searching deleted text is disabled by default");
    false
}

fn default_markdown() -> bool {
    debug!("Markdown parsing of inserted text is disabled by default");
    false
}

fn default_normalize_whitespace() -> bool {
    debug!("Whitespace normalisation for comparisons is enabled by default");
    true
}

fn default_continue_on_error() -> bool {
    debug!("Batches stop at the first failed edit by default");
    false
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            author: default_author(),
            date: None,
            include_deleted: default_include_deleted(),
            markdown: default_markdown(),
            fuzzy: FuzzyOptions::default(),
            compare_normalize_whitespace: default_normalize_whitespace(),
            continue_on_error: default_continue_on_error(),
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }
}

#[cfg(feature = "serde")]
impl EditorConfig {
    /// Parses a configuration from YAML, missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidConfig`] when the YAML cannot be parsed.
    pub fn from_yaml(contents: &str) -> Result<Self, EditError> {
        serde_yaml::from_str(contents).map_err(|error| EditError::InvalidConfig(error.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`EditError::InvalidConfig`] when the configuration cannot be
    /// serialised.
    pub fn to_yaml(&self) -> Result<String, EditError> {
        serde_yaml::to_string(self).map_err(|error| EditError::InvalidConfig(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.author, DEFAULT_AUTHOR);
        assert!(config.date.is_none());
        assert!(!config.include_deleted);
        assert!(!config.markdown);
        assert!(config.compare_normalize_whitespace);
        assert!(!config.continue_on_error);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EditorConfig::from_yaml("author: Reviewer\nmarkdown: true\n").unwrap();
        assert_eq!(config.author, "Reviewer");
        assert!(config.markdown);
        assert!(config.compare_normalize_whitespace);

        let round_tripped = EditorConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(round_tripped, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            EditorConfig::from_yaml("author: [unclosed"),
            Err(EditError::InvalidConfig(_))
        ));
    }
}
