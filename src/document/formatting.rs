#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Character formatting of a run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,

    /// Hex RGB colour such as `FF0000`, `None` means automatic
    pub color: Option<String>,
}

impl Formatting {
    #[must_use]
    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }

    #[must_use]
    pub fn with_underline(mut self) -> Self {
        self.underline = true;
        self
    }

    #[must_use]
    pub fn with_strikethrough(mut self) -> Self {
        self.strikethrough = true;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Returns the formatting obtained by switching on every flag that is set
    /// in `overlay`. The overlay's colour wins when it has one.
    #[must_use]
    pub fn layered(&self, overlay: &Formatting) -> Formatting {
        Formatting {
            bold: self.bold || overlay.bold,
            italic: self.italic || overlay.italic,
            underline: self.underline || overlay.underline,
            strikethrough: self.strikethrough || overlay.strikethrough,
            color: overlay.color.clone().or_else(|| self.color.clone()),
        }
    }
}

/// Colour part of a [`FormatPatch`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorChange {
    Set(String),
    Clear,
}

/// A requested formatting change. `None` fields are left untouched.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatPatch {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub color: Option<ColorChange>,
}

impl FormatPatch {
    #[must_use]
    pub fn bold(mut self, value: bool) -> Self {
        self.bold = Some(value);
        self
    }

    #[must_use]
    pub fn italic(mut self, value: bool) -> Self {
        self.italic = Some(value);
        self
    }

    #[must_use]
    pub fn underline(mut self, value: bool) -> Self {
        self.underline = Some(value);
        self
    }

    #[must_use]
    pub fn strikethrough(mut self, value: bool) -> Self {
        self.strikethrough = Some(value);
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(ColorChange::Set(color.into()));
        self
    }

    #[must_use]
    pub fn clear_color(mut self) -> Self {
        self.color = Some(ColorChange::Clear);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.strikethrough.is_none()
            && self.color.is_none()
    }

    #[must_use]
    pub fn apply(&self, formatting: &Formatting) -> Formatting {
        Formatting {
            bold: self.bold.unwrap_or(formatting.bold),
            italic: self.italic.unwrap_or(formatting.italic),
            underline: self.underline.unwrap_or(formatting.underline),
            strikethrough: self.strikethrough.unwrap_or(formatting.strikethrough),
            color: match &self.color {
                Some(ColorChange::Set(color)) => Some(color.clone()),
                Some(ColorChange::Clear) => None,
                None => formatting.color.clone(),
            },
        }
    }
}
