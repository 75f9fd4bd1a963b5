use core::fmt::{self, Debug};
use std::{
    ops::{BitAnd, BitOr, Not},
    sync::Arc,
};

use crate::document::{
    ParagraphAddress,
    paragraph::{CellPosition, Paragraph},
    part::{Part, PartKind},
};

/// Everything a [`Scope`] may look at to decide whether a paragraph is
/// searched.
#[derive(Debug, Clone, Copy)]
pub struct ScopeContext<'a> {
    pub address: ParagraphAddress,
    pub part: &'a Part,
    pub paragraph: &'a Paragraph,

    /// Texts of the headings enclosing the paragraph, outermost first. A
    /// heading is part of its own section.
    pub sections: &'a [String],
}

/// Selects the paragraphs a query searches.
#[derive(Clone, Default)]
pub enum Scope {
    #[default]
    All,
    PartKind(PartKind),
    PartName(String),

    /// Paragraphs whose visible text contains the substring
    ParagraphContains(String),

    /// Paragraphs below the heading with this text, up to the next heading of
    /// the same or a higher level
    Section(String),
    Style(String),

    /// Paragraphs inside any table cell
    InTable,
    Cell(CellPosition),
    Not(Box<Scope>),
    And(Box<Scope>, Box<Scope>),
    Or(Box<Scope>, Box<Scope>),
    Custom(Arc<dyn Fn(&ScopeContext<'_>) -> bool + Send + Sync>),
}

impl Scope {
    pub fn part_name(name: impl Into<String>) -> Self { Scope::PartName(name.into()) }

    pub fn paragraph_contains(text: impl Into<String>) -> Self {
        Scope::ParagraphContains(text.into())
    }

    pub fn section(heading: impl Into<String>) -> Self { Scope::Section(heading.into()) }

    pub fn style(style: impl Into<String>) -> Self { Scope::Style(style.into()) }

    pub fn custom(predicate: impl Fn(&ScopeContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Scope::Custom(Arc::new(predicate))
    }

    #[must_use]
    pub fn matches(&self, context: &ScopeContext<'_>) -> bool {
        match self {
            Scope::All => true,
            Scope::PartKind(kind) => context.part.kind() == *kind,
            Scope::PartName(name) => context.part.name() == name,
            Scope::ParagraphContains(text) => context.paragraph.text().contains(text.as_str()),
            Scope::Section(heading) => context
                .sections
                .iter()
                .any(|section| section.trim().eq_ignore_ascii_case(heading.trim())),
            Scope::Style(style) => context
                .paragraph
                .style()
                .is_some_and(|own| own.eq_ignore_ascii_case(style)),
            Scope::InTable => context.paragraph.cell().is_some(),
            Scope::Cell(cell) => context.paragraph.cell() == Some(*cell),
            Scope::Not(scope) => !scope.matches(context),
            Scope::And(left, right) => left.matches(context) && right.matches(context),
            Scope::Or(left, right) => left.matches(context) || right.matches(context),
            Scope::Custom(predicate) => predicate(context),
        }
    }
}

impl Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "All"),
            Scope::PartKind(kind) => f.debug_tuple("PartKind").field(kind).finish(),
            Scope::PartName(name) => f.debug_tuple("PartName").field(name).finish(),
            Scope::ParagraphContains(text) => {
                f.debug_tuple("ParagraphContains").field(text).finish()
            }
            Scope::Section(heading) => f.debug_tuple("Section").field(heading).finish(),
            Scope::Style(style) => f.debug_tuple("Style").field(style).finish(),
            Scope::InTable => write!(f, "InTable"),
            Scope::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Scope::Not(scope) => f.debug_tuple("Not").field(scope).finish(),
            Scope::And(left, right) => f.debug_tuple("And").field(left).field(right).finish(),
            Scope::Or(left, right) => f.debug_tuple("Or").field(left).field(right).finish(),
            Scope::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Not for Scope {
    type Output = Scope;

    fn not(self) -> Self::Output { Scope::Not(Box::new(self)) }
}

impl BitAnd for Scope {
    type Output = Scope;

    fn bitand(self, rhs: Self) -> Self::Output { Scope::And(Box::new(self), Box::new(rhs)) }
}

impl BitOr for Scope {
    type Output = Scope;

    fn bitor(self, rhs: Self) -> Self::Output { Scope::Or(Box::new(self), Box::new(rhs)) }
}

/// Tracks the headings enclosing each paragraph while walking a part in
/// order.
#[derive(Debug, Default)]
pub(crate) struct SectionStack {
    headings: Vec<(u8, String)>,
    texts: Vec<String>,
}

impl SectionStack {
    /// Enters `paragraph`, returning the sections it belongs to.
    pub(crate) fn enter(&mut self, paragraph: &Paragraph) -> &[String] {
        if let Some(level) = paragraph.heading_level() {
            while self
                .headings
                .last()
                .is_some_and(|(open, _)| *open >= level)
            {
                self.headings.pop();
            }
            self.headings.push((level, paragraph.text()));
            self.texts = self.headings.iter().map(|(_, text)| text.clone()).collect();
        }
        &self.texts
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn part() -> Part {
        Part::body(vec![
            Paragraph::from_text("Introduction").with_style("Heading1"),
            Paragraph::from_text("Intro text"),
            Paragraph::from_text("Details").with_style("Heading2"),
            Paragraph::from_text("Detail text"),
            Paragraph::from_text("Results").with_style("Heading1"),
            Paragraph::from_text("Result text").in_cell(CellPosition {
                table: 0,
                row: 1,
                column: 2,
            }),
        ])
    }

    fn selected(part: &Part, scope: &Scope) -> Vec<usize> {
        let mut sections = SectionStack::default();
        part.paragraphs()
            .iter()
            .enumerate()
            .filter_map(|(index, paragraph)| {
                let context = ScopeContext {
                    address: ParagraphAddress::new(0, index),
                    part,
                    paragraph,
                    sections: sections.enter(paragraph),
                };
                scope.matches(&context).then_some(index)
            })
            .collect()
    }

    #[test]
    fn test_sections_follow_heading_levels() {
        let part = part();
        assert_eq!(selected(&part, &Scope::section("Introduction")), vec![0, 1, 2, 3]);
        assert_eq!(selected(&part, &Scope::section("details")), vec![2, 3]);
        assert_eq!(selected(&part, &Scope::section("Results")), vec![4, 5]);
    }

    #[test]
    fn test_composition() {
        let part = part();
        let scope = Scope::section("Introduction") & !Scope::style("Heading2");
        assert_eq!(selected(&part, &scope), vec![0, 1, 3]);

        let scope = Scope::InTable | Scope::paragraph_contains("Intro");
        assert_eq!(selected(&part, &scope), vec![0, 1, 5]);
    }

    #[test]
    fn test_custom_and_part_scopes() {
        let part = part();
        let scope = Scope::custom(|context| context.address.paragraph % 2 == 1);
        assert_eq!(selected(&part, &scope), vec![1, 3, 5]);
        assert_eq!(selected(&part, &Scope::PartKind(PartKind::Header)), vec![]);
        assert_eq!(selected(&part, &Scope::part_name("word/document.xml")).len(), 6);
    }

    #[test]
    fn test_debug_hides_closures() {
        let scope = Scope::custom(|_| true) | Scope::All;
        assert_eq!(format!("{scope:?}"), "Or(Custom(..), All)");
    }
}
