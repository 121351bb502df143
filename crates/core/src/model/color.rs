use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fallback accent used when a program or module has no explicit color.
pub const DEFAULT_COLOR: &str = "#4f46e5";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("color must be a hex value like #4f46e5, got {0:?}")]
    InvalidHex(String),
}

/// Accent color of a program or module, stored as a lowercase `#rrggbb` or `#rgb` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayColor(String);

impl DisplayColor {
    /// Parses a hex color.
    ///
    /// # Errors
    ///
    /// Returns `ColorError::InvalidHex` unless the input is `#` followed by 3 or 6 hex digits.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ColorError> {
        let raw = raw.as_ref().trim();
        let digits = raw
            .strip_prefix('#')
            .ok_or_else(|| ColorError::InvalidHex(raw.to_owned()))?;
        let valid_len = digits.len() == 3 || digits.len() == 6;
        if !valid_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(raw.to_owned()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    /// Like `parse`, but blank input falls back to the default accent.
    ///
    /// # Errors
    ///
    /// Returns `ColorError::InvalidHex` for non-blank input that is not a hex color.
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self, ColorError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => Self::parse(value),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DisplayColor {
    fn default() -> Self {
        Self(DEFAULT_COLOR.to_owned())
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DisplayColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DisplayColor> for String {
    fn from(value: DisplayColor) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_and_long_hex() {
        assert_eq!(DisplayColor::parse("#ABC").unwrap().as_str(), "#abc");
        assert_eq!(DisplayColor::parse(" #4F46E5 ").unwrap().as_str(), "#4f46e5");
    }

    #[test]
    fn rejects_css_names_and_gradients() {
        assert!(DisplayColor::parse("indigo").is_err());
        assert!(DisplayColor::parse("#12345").is_err());
        assert!(DisplayColor::parse("linear-gradient(135deg, #667eea 0%, #764ba2 100%)").is_err());
    }

    #[test]
    fn blank_falls_back_to_default() {
        assert_eq!(DisplayColor::parse_or_default(None).unwrap().as_str(), DEFAULT_COLOR);
        assert_eq!(DisplayColor::parse_or_default(Some("  ")).unwrap().as_str(), DEFAULT_COLOR);
    }
}
