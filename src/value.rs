//! Property values animated by the core.
//!
//! `PropertyValue` is a tagged union of the three animatable shapes: a
//! scalar with an optional unit, a color, and a composite bundle of named
//! sub-values (transform channels that serialize together). The core never
//! interprets targets; values flow out through the `PropertySink` boundary.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Unit attached to a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Px,
    #[serde(rename = "%")]
    Percent,
    Em,
    Rem,
    Deg,
    Rad,
    Turn,
    Vw,
    Vh,
}

impl Unit {
    /// The textual suffix for this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Percent => "%",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::Deg => "deg",
            Unit::Rad => "rad",
            Unit::Turn => "turn",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
        }
    }
}

/// Resolve the unit of a from/to pair: both sides declaring different units
/// is a configuration error, otherwise the declared side wins (preferring
/// `to`).
pub fn resolve_unit(from: Option<Unit>, to: Option<Unit>) -> Result<Option<Unit>, AnimationError> {
    match (from, to) {
        (Some(a), Some(b)) if a != b => Err(AnimationError::config(format!(
            "unit mismatch: from is '{}', to is '{}'",
            a.as_str(),
            b.as_str()
        ))),
        (_, Some(b)) => Ok(Some(b)),
        (Some(a), None) => Ok(Some(a)),
        (None, None) => Ok(None),
    }
}

/// RGBA color. Channels are 0-255 integers; alpha stays a float in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Color {
            r: 0,
            g: 0,
            b: 0,
            a: 1.0,
        }
    }
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self, AnimationError> {
        let digits = hex.trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(AnimationError::config(format!(
                "malformed hex color '{hex}'"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| AnimationError::config(format!("malformed hex color '{hex}'")))
        };
        match digits.len() {
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::rgba(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)? as f32 / 255.0,
            )),
            _ => Err(AnimationError::config(format!(
                "malformed hex color '{hex}'"
            ))),
        }
    }

    /// Convert to HSLA (h: 0-360, s/l/a: 0-1).
    pub fn to_hsla(&self) -> (f32, f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        if max == min {
            return (0.0, 0.0, l, self.a);
        }
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h * 60.0, s, l, self.a)
    }

    /// Build from HSLA (h: 0-360 wrapping, s/l/a: 0-1). Channels round to
    /// the nearest integer.
    pub fn from_hsla(h: f32, s: f32, l: f32, a: f32) -> Self {
        let h = h.rem_euclid(360.0) / 360.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = if h < 1.0 / 6.0 {
            (c, x, 0.0)
        } else if h < 2.0 / 6.0 {
            (x, c, 0.0)
        } else if h < 3.0 / 6.0 {
            (0.0, c, x)
        } else if h < 4.0 / 6.0 {
            (0.0, x, c)
        } else if h < 5.0 / 6.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        Self {
            r: ((r + m) * 255.0).round().clamp(0.0, 255.0) as u8,
            g: ((g + m) * 255.0).round().clamp(0.0, 255.0) as u8,
            b: ((b + m) * 255.0).round().clamp(0.0, 255.0) as u8,
            a: a.clamp(0.0, 1.0),
        }
    }
}

/// Coarse value kind for dispatch and error reporting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Number,
    Color,
    Composite,
}

/// A value an animation can produce for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PropertyValue {
    /// Scalar with an optional unit.
    Number {
        value: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<Unit>,
    },

    /// RGBA color.
    Color(Color),

    /// Ordered named sub-values, e.g. a transform bundle. Construction via
    /// [`PropertyValue::composite`] applies the canonical channel ordering.
    Composite(Vec<(String, PropertyValue)>),
}

/// Canonical ordering of composite transform channels. The serialization
/// order of a transform bundle is visually significant, so recombination is
/// fixed: perspective, then translate, rotate, scale, skew.
const CHANNEL_ORDER: &[&str] = &[
    "perspective",
    "translateX",
    "translateY",
    "translateZ",
    "rotate",
    "rotateX",
    "rotateY",
    "rotateZ",
    "scale",
    "scaleX",
    "scaleY",
    "scaleZ",
    "skewX",
    "skewY",
];

fn channel_rank(name: &str) -> usize {
    CHANNEL_ORDER
        .iter()
        .position(|c| *c == name)
        .unwrap_or(CHANNEL_ORDER.len())
}

impl PropertyValue {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Number { .. } => ValueKind::Number,
            PropertyValue::Color(_) => ValueKind::Color,
            PropertyValue::Composite(_) => ValueKind::Composite,
        }
    }

    /// Convenience constructors
    pub fn number(value: f32) -> Self {
        PropertyValue::Number { value, unit: None }
    }

    pub fn with_unit(value: f32, unit: Unit) -> Self {
        PropertyValue::Number {
            value,
            unit: Some(unit),
        }
    }

    pub fn color(color: Color) -> Self {
        PropertyValue::Color(color)
    }

    /// Build a composite bundle, normalizing the channel order. Unknown
    /// channel names sort after the known ones, keeping their insertion
    /// order (stable sort).
    pub fn composite(entries: Vec<(String, PropertyValue)>) -> Self {
        let mut entries = entries;
        entries.sort_by_key(|(name, _)| channel_rank(name));
        PropertyValue::Composite(entries)
    }

    /// Scalar payload, if this is a Number.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PropertyValue::Number { value, .. } => Some(*value),
            _ => None,
        }
    }
}
