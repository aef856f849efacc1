//! Easing functions.
//!
//! Every curve is a pure mapping of normalized time to normalized progress
//! with `apply(0) == 0` and `apply(1) == 1`. Inputs outside `[0, 1]` clamp
//! to the endpoints.

use serde::{Deserialize, Serialize};

use std::f32::consts::PI;

/// Easing function selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    BounceIn,
    BounceOut,
    BounceInOut,
    CubicBezier(f32, f32, f32, f32),
}

/// The named curve set exposed through [`Easing::from_name`].
pub const NAMED: &[(&str, Easing)] = &[
    ("linear", Easing::Linear),
    ("quad_in", Easing::QuadIn),
    ("quad_out", Easing::QuadOut),
    ("quad_in_out", Easing::QuadInOut),
    ("cubic_in", Easing::CubicIn),
    ("cubic_out", Easing::CubicOut),
    ("cubic_in_out", Easing::CubicInOut),
    ("quart_in", Easing::QuartIn),
    ("quart_out", Easing::QuartOut),
    ("quart_in_out", Easing::QuartInOut),
    ("quint_in", Easing::QuintIn),
    ("quint_out", Easing::QuintOut),
    ("quint_in_out", Easing::QuintInOut),
    ("sine_in", Easing::SineIn),
    ("sine_out", Easing::SineOut),
    ("sine_in_out", Easing::SineInOut),
    ("expo_in", Easing::ExpoIn),
    ("expo_out", Easing::ExpoOut),
    ("expo_in_out", Easing::ExpoInOut),
    ("circ_in", Easing::CircIn),
    ("circ_out", Easing::CircOut),
    ("circ_in_out", Easing::CircInOut),
    ("back_in", Easing::BackIn),
    ("back_out", Easing::BackOut),
    ("back_in_out", Easing::BackInOut),
    ("elastic_in", Easing::ElasticIn),
    ("elastic_out", Easing::ElasticOut),
    ("elastic_in_out", Easing::ElasticInOut),
    ("bounce_in", Easing::BounceIn),
    ("bounce_out", Easing::BounceOut),
    ("bounce_in_out", Easing::BounceInOut),
];

impl Easing {
    /// Look up a curve by name. Unknown names fall back to `Linear` rather
    /// than failing, so data-driven animation specs degrade gracefully.
    pub fn from_name(name: &str) -> Self {
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, e)| *e)
            .unwrap_or(Easing::Linear)
    }

    /// Apply the easing function to a progress value in `[0, 1]`.
    pub fn apply(&self, t: f32) -> f32 {
        // Endpoints are exact for every curve, including the exponential
        // family whose closed forms only approach 0/1.
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::QuartIn => t * t * t * t,
            Easing::QuartOut => 1.0 - (1.0 - t).powi(4),
            Easing::QuartInOut => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::QuintIn => t * t * t * t * t,
            Easing::QuintOut => 1.0 - (1.0 - t).powi(5),
            Easing::QuintInOut => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::ExpoIn => (2.0f32).powf(10.0 * t - 10.0),
            Easing::ExpoOut => 1.0 - (2.0f32).powf(-10.0 * t),
            Easing::ExpoInOut => {
                if t < 0.5 {
                    (2.0f32).powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - (2.0f32).powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Easing::CircIn => 1.0 - (1.0 - t * t).sqrt(),
            Easing::CircOut => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            Easing::CircInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Easing::BackIn => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                C3 * t * t * t - C1 * t * t
            }
            Easing::BackOut => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::BackInOut => {
                const C1: f32 = 1.70158;
                const C2: f32 = C1 * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
            Easing::ElasticIn => {
                const C4: f32 = 2.0 * PI / 3.0;
                -(2.0f32).powf(10.0 * t - 10.0) * ((t * 10.0 - 10.75) * C4).sin()
            }
            Easing::ElasticOut => {
                const C4: f32 = 2.0 * PI / 3.0;
                (2.0f32).powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
            }
            Easing::ElasticInOut => {
                const C5: f32 = 2.0 * PI / 4.5;
                if t < 0.5 {
                    -((2.0f32).powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0
                } else {
                    ((2.0f32).powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }
            Easing::BounceIn => 1.0 - bounce_out(1.0 - t),
            Easing::BounceOut => bounce_out(t),
            Easing::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Cubic bezier easing (CSS-style control points).
///
/// Uses Newton-Raphson with a binary-search fallback, computed in f64 to
/// avoid f32 precision jitter on near-linear curves.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    // Solve for the curve parameter p where bezier_x(p) == x.
    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges).
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// Evaluate the one-dimensional cubic bezier with endpoints 0 and 1 at
/// parameter t, in Horner form.
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}
