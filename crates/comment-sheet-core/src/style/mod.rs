//! Cell formatting types
//!
//! - [`CellFormat`] - Optional font attributes and colors of a cell
//! - [`FontStyle`] - Bold, italic and underline flags
//! - [`Color`] - Hex color representation

mod color;
mod font;

pub use color::Color;
pub use font::FontStyle;

/// Formatting attached to a cell
///
/// Every part is optional; `None` means "unset" and is omitted when the cell
/// is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellFormat {
    /// Font attributes
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub font: Option<FontStyle>,
    /// Foreground (text) color
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub text_color: Option<Color>,
    /// Background color
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub bg_color: Option<Color>,
}

impl CellFormat {
    /// Create an empty format
    pub fn new() -> Self {
        Self::default()
    }

    /// Set font attributes
    pub fn with_font(mut self, font: FontStyle) -> Self {
        self.font = Some(font);
        self
    }

    /// Set the text color
    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    /// Set the background color
    pub fn with_bg_color(mut self, color: Color) -> Self {
        self.bg_color = Some(color);
        self
    }

    /// Whether no formatting is set at all
    pub fn is_empty(&self) -> bool {
        self.font.is_none() && self.text_color.is_none() && self.bg_color.is_none()
    }

    /// Font attributes, or the plain font when unset
    pub fn font_or_default(&self) -> FontStyle {
        self.font.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let format = CellFormat::new()
            .with_font(FontStyle::new().with_bold(true))
            .with_bg_color(Color::YELLOW);

        assert!(!format.is_empty());
        assert!(format.font_or_default().bold);
        assert!(!format.font_or_default().italic);
        assert_eq!(format.text_color, None);
        assert!(CellFormat::default().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_unset_fields_are_omitted() {
        let format = CellFormat::new().with_text_color(Color::RED);
        let json = serde_json::to_value(format).unwrap();
        assert_eq!(json, serde_json::json!({ "text_color": "#FF0000" }));

        let parsed: CellFormat =
            serde_json::from_str(r##"{"font": {"bold": true}, "bg_color": "#00ff00"}"##).unwrap();
        assert_eq!(parsed.font, Some(FontStyle::new().with_bold(true)));
        assert_eq!(parsed.bg_color, Some(Color::GREEN));
    }
}
