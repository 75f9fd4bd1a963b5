//! Splitting inserted text into formatting segments.
//!
//! Every segment becomes exactly one run inside the insertion wrapper, line
//! breaks become break runs.

use core::fmt::Debug;

use crate::document::formatting::Formatting;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text with the formatting flags it switches on, layered over the
    /// formatting inherited at the insertion point
    Text { text: String, format: Formatting },
    Break,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text {
            text: text.into(),
            format: Formatting::default(),
        }
    }

    pub fn formatted(text: impl Into<String>, format: Formatting) -> Self {
        Segment::Text {
            text: text.into(),
            format,
        }
    }
}

/// Turns the text of an insertion into segments.
pub trait SegmentParser: Debug {
    fn parse(&self, text: &str) -> Vec<Segment>;
}

/// Takes text literally, only newlines are special.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl SegmentParser for PlainText {
    fn parse(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();

        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                segments.push(Segment::Break);
            }

            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                segments.push(Segment::text(line));
            }
        }

        segments
    }
}

/// Inline markdown: `**bold**`, `*italic*` or `_italic_`, `++underline++` and
/// `~~strikethrough~~`. Markers without a closing counterpart are kept as
/// literal text and a backslash escapes the next character.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineMarkdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Bold,
    Underline,
    Strikethrough,
    ItalicStar,
    ItalicUnderscore,
}

impl Marker {
    const ALL: [Marker; 5] = [
        Marker::Bold,
        Marker::Underline,
        Marker::Strikethrough,
        Marker::ItalicStar,
        Marker::ItalicUnderscore,
    ];

    fn token(self) -> &'static str {
        match self {
            Marker::Bold => "**",
            Marker::Underline => "++",
            Marker::Strikethrough => "~~",
            Marker::ItalicStar => "*",
            Marker::ItalicUnderscore => "_",
        }
    }
}

#[derive(Debug, Default)]
struct OpenMarkers([bool; 5]);

impl OpenMarkers {
    fn is_open(&self, marker: Marker) -> bool { self.0[marker as usize] }

    fn toggle(&mut self, marker: Marker) { self.0[marker as usize] = !self.0[marker as usize]; }

    fn format(&self) -> Formatting {
        Formatting {
            bold: self.is_open(Marker::Bold),
            italic: self.is_open(Marker::ItalicStar) || self.is_open(Marker::ItalicUnderscore),
            underline: self.is_open(Marker::Underline),
            strikethrough: self.is_open(Marker::Strikethrough),
            color: None,
        }
    }
}

impl SegmentParser for InlineMarkdown {
    fn parse(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut open = OpenMarkers::default();

        let flush = |current: &mut String, open: &OpenMarkers, segments: &mut Vec<Segment>| {
            if !current.is_empty() {
                segments.push(Segment::formatted(core::mem::take(current), open.format()));
            }
        };

        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            let after = &rest[c.len_utf8()..];

            if c == '\\' {
                if let Some(escaped) = after.chars().next() {
                    current.push(escaped);
                    rest = &after[escaped.len_utf8()..];
                    continue;
                }
            }

            if c == '\n' {
                let trimmed = current.strip_suffix('\r').map(str::len);
                if let Some(len) = trimmed {
                    current.truncate(len);
                }
                flush(&mut current, &open, &mut segments);
                segments.push(Segment::Break);
                rest = after;
                continue;
            }

            let marker = Marker::ALL
                .into_iter()
                .find(|marker| rest.starts_with(marker.token()));
            if let Some(marker) = marker {
                let token = marker.token();
                let tail = &rest[token.len()..];
                if open.is_open(marker) || tail.contains(token) {
                    flush(&mut current, &open, &mut segments);
                    open.toggle(marker);
                    rest = tail;
                    continue;
                }
            }

            current.push(c);
            rest = after;
        }

        flush(&mut current, &open, &mut segments);
        segments
    }
}
