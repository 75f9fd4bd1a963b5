use core::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::paragraph::Paragraph;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Body,
    Header,
    Footer,
    Footnote,
    Endnote,
}

/// A text-bearing part of the package, e.g. the main body or one header.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    kind: PartKind,
    name: String,
    pub(crate) paragraphs: Vec<Paragraph>,
}

impl Part {
    pub fn new(kind: PartKind, name: impl Into<String>, paragraphs: Vec<Paragraph>) -> Self {
        Part {
            kind,
            name: name.into(),
            paragraphs,
        }
    }

    #[must_use]
    pub fn body(paragraphs: Vec<Paragraph>) -> Self {
        Self::new(PartKind::Body, "word/document.xml", paragraphs)
    }

    #[must_use]
    pub fn kind(&self) -> PartKind { self.kind }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn paragraphs(&self) -> &[Paragraph] { &self.paragraphs }

    /// Visible text of every paragraph, one paragraph per line.
    #[must_use]
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, paragraph) in self.paragraphs.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{paragraph}")?;
        }
        Ok(())
    }
}
