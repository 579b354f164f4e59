//! Font attributes

/// Font attributes a comment-table cell can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontStyle {
    #[cfg_attr(feature = "serde", serde(default))]
    pub bold: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub italic: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub underline: bool,
}

impl FontStyle {
    /// Create a new plain font
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bold
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Set italic
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// Set underline
    pub fn with_underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    /// True when no attribute is set
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.underline
    }
}
