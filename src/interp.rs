//! Value interpolators.
//!
//! An [`Interpolator`] is built once per animated property from a matching
//! from/to pair, then sampled with an eased `t` in `[0, 1]` every tick.
//! Kind mismatches are construction-time errors, never per-tick surprises.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::value::{resolve_unit, Color, PropertyValue, Unit};

/// Color interpolation space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Component-wise linear RGBA.
    #[default]
    Rgb,
    /// Hue along the shorter angular path, saturation/lightness/alpha linear.
    Hsl,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate hue along the shorter angular path: the delta is wrapped
/// into (-180, 180] before blending.
#[inline]
fn lerp_hue(a: f32, b: f32, t: f32) -> f32 {
    let delta = (b - a + 540.0).rem_euclid(360.0) - 180.0;
    (a + delta * t).rem_euclid(360.0)
}

/// Per-property interpolation state.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolator {
    Number {
        from: f32,
        to: f32,
        unit: Option<Unit>,
    },
    Color {
        from: Color,
        to: Color,
        space: ColorSpace,
    },
    Composite(Vec<(String, Interpolator)>),
}

impl Interpolator {
    /// Build an interpolator over a matching from/to pair. Mismatched kinds
    /// are `InvalidPropertyPair`; a declared-unit conflict is
    /// `InvalidConfig`.
    pub fn new(from: &PropertyValue, to: &PropertyValue) -> Result<Self, AnimationError> {
        Self::with_color_space(from, to, ColorSpace::default())
    }

    /// Like [`Interpolator::new`] with an explicit color space for any color
    /// channels in the pair.
    pub fn with_color_space(
        from: &PropertyValue,
        to: &PropertyValue,
        space: ColorSpace,
    ) -> Result<Self, AnimationError> {
        match (from, to) {
            (
                PropertyValue::Number {
                    value: a,
                    unit: unit_a,
                },
                PropertyValue::Number {
                    value: b,
                    unit: unit_b,
                },
            ) => Ok(Interpolator::Number {
                from: *a,
                to: *b,
                unit: resolve_unit(*unit_a, *unit_b)?,
            }),
            (PropertyValue::Color(a), PropertyValue::Color(b)) => Ok(Interpolator::Color {
                from: *a,
                to: *b,
                space,
            }),
            (PropertyValue::Composite(a), PropertyValue::Composite(b)) => {
                if a.len() != b.len() {
                    return Err(AnimationError::InvalidPropertyPair {
                        expected: from.kind(),
                        actual: to.kind(),
                    });
                }
                let mut channels = Vec::with_capacity(a.len());
                for ((name_a, val_a), (name_b, val_b)) in a.iter().zip(b.iter()) {
                    if name_a != name_b {
                        return Err(AnimationError::config(format!(
                            "composite channel mismatch: '{name_a}' vs '{name_b}'"
                        )));
                    }
                    channels.push((name_a.clone(), Self::with_color_space(val_a, val_b, space)?));
                }
                Ok(Interpolator::Composite(channels))
            }
            _ => Err(AnimationError::InvalidPropertyPair {
                expected: from.kind(),
                actual: to.kind(),
            }),
        }
    }

    /// Sample the interpolated value at `t` in `[0, 1]`. Eased overshoot
    /// (back/elastic producing t outside the unit range) extrapolates
    /// linearly for numbers and clamps for color channels.
    pub fn sample(&self, t: f32) -> PropertyValue {
        match self {
            Interpolator::Number { from, to, unit } => PropertyValue::Number {
                value: lerp(*from, *to, t),
                unit: *unit,
            },
            Interpolator::Color { from, to, space } => {
                let t = t.clamp(0.0, 1.0);
                let color = match space {
                    ColorSpace::Rgb => Color {
                        r: lerp(from.r as f32, to.r as f32, t).round().clamp(0.0, 255.0) as u8,
                        g: lerp(from.g as f32, to.g as f32, t).round().clamp(0.0, 255.0) as u8,
                        b: lerp(from.b as f32, to.b as f32, t).round().clamp(0.0, 255.0) as u8,
                        a: lerp(from.a, to.a, t),
                    },
                    ColorSpace::Hsl => {
                        let (h1, s1, l1, a1) = from.to_hsla();
                        let (h2, s2, l2, a2) = to.to_hsla();
                        Color::from_hsla(
                            lerp_hue(h1, h2, t),
                            lerp(s1, s2, t),
                            lerp(l1, l2, t),
                            lerp(a1, a2, t),
                        )
                    }
                };
                PropertyValue::Color(color)
            }
            Interpolator::Composite(channels) => PropertyValue::Composite(
                channels
                    .iter()
                    .map(|(name, interp)| (name.clone(), interp.sample(t)))
                    .collect(),
            ),
        }
    }
}
