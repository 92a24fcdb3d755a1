use std::fmt;
use std::str::FromStr;

use image::Rgba;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primitive count per ring candidate at the default spacing.
pub const DEFAULT_DENSITY: f32 = 0.3;
pub const DEFAULT_SPACING: f32 = 12.0;

/// Border color, written as `#rgb`, `#rrggbb`, `#rrggbbaa`, `white` or `black`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub const WHITE: Color = Color(Rgba([255, 255, 255, 255]));
    pub const BLACK: Color = Color(Rgba([0, 0, 0, 255]));

    /// The same color at full opacity, which is how the ring is filled.
    pub fn opaque(self) -> Rgba<u8> {
        let [r, g, b, _] = self.0.0;
        Rgba([r, g, b, 255])
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            _ => {}
        }
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| Error::InvalidConfig(format!("color `{}` must start with '#'", s)))?;
        let digit = |i: usize| -> Result<u8> {
            hex.get(i..i + 1)
                .and_then(|d| u8::from_str_radix(d, 16).ok())
                .ok_or_else(|| Error::InvalidConfig(format!("invalid hex color `{}`", s)))
        };
        let byte = |i: usize| -> Result<u8> { Ok(digit(i)? << 4 | digit(i + 1)?) };
        let rgba = match hex.len() {
            3 => [digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255],
            6 => [byte(0)?, byte(2)?, byte(4)?, 255],
            8 => [byte(0)?, byte(2)?, byte(4)?, byte(6)?],
            _ => return Err(Error::InvalidConfig(format!("invalid hex color `{}`", s))),
        };
        Ok(Color(Rgba(rgba)))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0.0;
        if a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Inclusive `[min, max]` pixel range, serialized as a two element array.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "[f32; 2]", into = "[f32; 2]")
)]
pub struct SizeRange {
    pub min: f32,
    pub max: f32,
}

impl SizeRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::InvalidConfig(format!("{} must be finite", name)));
        }
        if self.min < 0.0 {
            return Err(Error::InvalidConfig(format!("{} must not be negative", name)));
        }
        if self.min > self.max {
            return Err(Error::InvalidConfig(format!(
                "{} has min {} greater than max {}",
                name, self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f32; 2]> for SizeRange {
    fn from([min, max]: [f32; 2]) -> Self {
        Self { min, max }
    }
}

impl From<SizeRange> for [f32; 2] {
    fn from(range: SizeRange) -> Self {
        [range.min, range.max]
    }
}

/// How a silhouette is grown outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Expansion {
    /// Scale the occupied box about its center and union with the source.
    /// Exact for convex subjects, uneven for deep concavities.
    #[default]
    Rescale,
    Dilate,
}

/// Size of the working canvas the border is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum CanvasPolicy {
    /// Twice the source size (or more when the border needs it), source centered.
    #[default]
    Double,
    /// Source plus the border margin on each side.
    Tight,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct BorderConfig {
    pub color: Color,
    /// Distance between the subject edge and the inner edge of the border.
    pub gap_px: f32,
    pub stroke_px: f32,
    pub line_length_range: SizeRange,
    pub dot_size_range: SizeRange,
    /// Larger spacing means fewer marks.
    pub spacing: f32,
    pub jitter_amount: f32,
    /// Probability that a mark is a dot rather than a dash.
    pub dot_ratio: f32,
    pub expansion: Expansion,
    pub canvas: CanvasPolicy,
    /// Fixes the stipple pattern; `None` draws a fresh pattern on every call.
    pub seed: Option<u64>,
}

impl Default for BorderConfig {
    fn default() -> Self {
        BorderConfig {
            color: Color::WHITE,
            gap_px: 10.0,
            stroke_px: 5.0,
            line_length_range: SizeRange::new(20.0, 40.0),
            dot_size_range: SizeRange::new(3.0, 5.0),
            spacing: DEFAULT_SPACING,
            jitter_amount: 1.5,
            dot_ratio: 0.4,
            expansion: Expansion::Rescale,
            canvas: CanvasPolicy::Double,
            seed: None,
        }
    }
}

impl BorderConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("gap_px", self.gap_px),
            ("stroke_px", self.stroke_px),
            ("spacing", self.spacing),
            ("jitter_amount", self.jitter_amount),
            ("dot_ratio", self.dot_ratio),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidConfig(format!("{} must be finite", name)));
        }
        if self.gap_px < 0.0 {
            return Err(Error::InvalidConfig(format!("gap_px must be >= 0, got {}", self.gap_px)));
        }
        if self.stroke_px <= 0.0 {
            return Err(Error::InvalidConfig(format!("stroke_px must be > 0, got {}", self.stroke_px)));
        }
        if self.spacing <= 0.0 {
            return Err(Error::InvalidConfig(format!("spacing must be > 0, got {}", self.spacing)));
        }
        if self.jitter_amount < 0.0 {
            return Err(Error::InvalidConfig("jitter_amount must not be negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.dot_ratio) {
            return Err(Error::InvalidConfig(format!("dot_ratio must be in [0, 1], got {}", self.dot_ratio)));
        }
        self.line_length_range.validate("line_length_range")?;
        self.dot_size_range.validate("dot_size_range")?;
        Ok(())
    }

    pub fn density(&self) -> f32 {
        DEFAULT_DENSITY * DEFAULT_SPACING / self.spacing
    }

    /// Widest distance the border reaches past the subject edge.
    pub fn reach(&self) -> f32 {
        self.gap_px.round() + self.stroke_px.round()
    }
}
