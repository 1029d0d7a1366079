//! Feature paint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid color '{0}': expected #rgb or #rrggbb")]
pub struct ColorParseError(pub String);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    /// `#rrggbb` form.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// `rgba(r,g,b,a)` form with the given alpha.
    pub fn to_rgba(&self, alpha: f64) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, alpha)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |i: usize, len: usize| -> Result<u8, ColorParseError> {
            let v = u8::from_str_radix(&hex[i * len..(i + 1) * len], 16).map_err(|_| err())?;
            Ok(if len == 1 { v * 17 } else { v })
        };
        match hex.len() {
            3 => Ok(Color::rgb(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Ok(Color::rgb(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Colors are accepted either as a hex string or as an `[r, g, b]` triple.
impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Rgb([u8; 3]),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Rgb([r, g, b]) => Ok(Color::rgb(r, g, b)),
        }
    }
}

/// How a vector feature is painted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Style {
    /// Not drawn, but still hit-testable.
    Hidden,
    /// Stroke in `stroke` with `stroke_width`, filled with `fill` at
    /// `fill_opacity`.
    Painted {
        stroke: Color,
        stroke_width: f64,
        fill: Color,
        fill_opacity: f64,
    },
}

impl Style {
    /// Stroke and fill in the same color.
    pub fn paint(color: Color, fill_opacity: f64, stroke_width: f64) -> Self {
        Style::Painted {
            stroke: color,
            stroke_width,
            fill: color,
            fill_opacity,
        }
    }

    /// The style of features picked by the select or transform tools.
    pub fn selection() -> Self {
        Style::Painted {
            stroke: Color::BLUE,
            stroke_width: 3.0,
            fill: Color::YELLOW,
            fill_opacity: 0.5,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Style::Painted { .. })
    }

    pub fn fill_opacity(&self) -> f64 {
        match self {
            Style::Hidden => 0.0,
            Style::Painted { fill_opacity, .. } => *fill_opacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_and_long_hex() {
        assert_eq!("#f00".parse::<Color>(), Ok(Color::RED));
        assert_eq!("#00ff7f".parse::<Color>(), Ok(Color::rgb(0, 255, 127)));
        assert_eq!("#A0A0A0".parse::<Color>(), Ok(Color::rgb(160, 160, 160)));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("f00".parse::<Color>().is_err());
        assert!("#ff00".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("#ééé".parse::<Color>().is_err());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let hex: Color = serde_json::from_str("\"#0f0\"").unwrap();
        let rgb: Color = serde_json::from_str("[0, 255, 0]").unwrap();
        assert_eq!(hex, rgb);
        assert_eq!(serde_json::to_string(&hex).unwrap(), "\"#00ff00\"");
    }

    #[test]
    fn test_selection_style() {
        let s = Style::selection();
        assert!(s.is_visible());
        assert_eq!(s.fill_opacity(), 0.5);
        assert!(!Style::Hidden.is_visible());
    }
}
