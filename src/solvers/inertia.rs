//! Velocity-decay (inertia) solver.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::sink::{PropertySink, TargetId};
use crate::time::AnimationTime;
use crate::tween::{Advance, Animate};
use crate::value::{PropertyValue, Unit};

/// Inertia parameters: an initial fling velocity decaying under friction,
/// optionally bouncing between bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InertiaOptions {
    /// Initial velocity, in value units per second.
    pub velocity: f32,
    /// Per-frame decay factor at 60 Hz, in (0, 1]. Applied as
    /// `friction^(dt * 60)` so variable frame rates feel identical.
    pub friction: f32,
    pub min: Option<f32>,
    pub max: Option<f32>,
    /// Velocity retained after hitting a bound (`0` stops dead, `1` is a
    /// perfectly elastic bounce).
    pub bounce: f32,
    /// Speed below which the motion is considered settled.
    pub rest_speed: f32,
    /// Integration step clamp for large frame gaps.
    pub max_step: AnimationTime,
}

impl Default for InertiaOptions {
    fn default() -> Self {
        Self {
            velocity: 0.0,
            friction: 0.95,
            min: None,
            max: None,
            bounce: 0.0,
            rest_speed: 0.1,
            max_step: AnimationTime::from_nanos(64_000_000),
        }
    }
}

impl InertiaOptions {
    pub fn validate(&self) -> Result<(), AnimationError> {
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return Err(AnimationError::config("inertia friction must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.bounce) {
            return Err(AnimationError::config("inertia bounce must be in [0, 1]"));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(AnimationError::config("inertia min bound exceeds max"));
            }
        }
        if self.rest_speed <= 0.0 {
            return Err(AnimationError::config("inertia rest speed must be positive"));
        }
        Ok(())
    }
}

type CompleteHook = Box<dyn FnMut()>;

/// A scalar property coasting under friction.
pub struct Inertia {
    target: TargetId,
    property: String,
    unit: Option<Unit>,
    position: f32,
    velocity: f32,
    opts: InertiaOptions,
    last_tick: Option<AnimationTime>,
    on_complete: Option<CompleteHook>,
    finished: bool,
}

impl Inertia {
    pub fn new(
        target: impl Into<TargetId>,
        property: impl Into<String>,
        from: f32,
        options: InertiaOptions,
    ) -> Result<Self, AnimationError> {
        options.validate()?;
        Ok(Self {
            target: target.into(),
            property: property.into(),
            unit: None,
            position: from,
            velocity: options.velocity,
            opts: options,
            last_tick: None,
            on_complete: None,
            finished: false,
        })
    }

    /// Attach a unit to the written values.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn on_complete(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    #[inline]
    pub fn position(&self) -> f32 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    fn write(&self, sink: &mut dyn PropertySink) -> Result<(), AnimationError> {
        sink.set(
            &self.target,
            &self.property,
            PropertyValue::Number {
                value: self.position,
                unit: self.unit,
            },
        )
    }

    fn finish(&mut self, sink: &mut dyn PropertySink) -> Advance {
        self.velocity = 0.0;
        if let Err(err) = self.write(sink) {
            log::warn!("inertia on '{}' retired: {err}", self.target);
        }
        self.finished = true;
        if let Some(hook) = self.on_complete.as_mut() {
            hook();
        }
        Advance::Finished
    }
}

impl std::fmt::Debug for Inertia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inertia")
            .field("target", &self.target)
            .field("property", &self.property)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Animate for Inertia {
    fn advance(&mut self, now: AnimationTime, sink: &mut dyn PropertySink) -> Advance {
        if self.finished {
            return Advance::Finished;
        }

        let Some(last) = self.last_tick.replace(now) else {
            if self.write(sink).is_err() {
                self.finished = true;
                return Advance::Finished;
            }
            return Advance::Running;
        };

        let dt_time = now.duration_since(last);
        let dt = dt_time.clamp(AnimationTime::zero(), self.opts.max_step).as_seconds() as f32;
        if dt > 0.0 {
            self.velocity *= self.opts.friction.powf(dt * 60.0);
            self.position += self.velocity * dt;

            // Bound collisions clamp position and reflect the remaining
            // velocity scaled by bounce.
            if let Some(min) = self.opts.min {
                if self.position < min {
                    self.position = min;
                    self.velocity = -self.velocity * self.opts.bounce;
                }
            }
            if let Some(max) = self.opts.max {
                if self.position > max {
                    self.position = max;
                    self.velocity = -self.velocity * self.opts.bounce;
                }
            }
        }

        if self.velocity.abs() < self.opts.rest_speed {
            return self.finish(sink);
        }

        if let Err(err) = self.write(sink) {
            log::warn!("inertia on '{}' retired: {err}", self.target);
            self.finished = true;
            return Advance::Finished;
        }
        Advance::Running
    }

    fn cancel(&mut self) {
        self.finished = true;
    }

    fn shift(&mut self, by: AnimationTime) {
        if let Some(last) = self.last_tick.as_mut() {
            *last += by;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_friction_and_bounds() {
        assert!(Inertia::new(
            "box",
            "x",
            0.0,
            InertiaOptions {
                friction: 0.0,
                ..Default::default()
            },
        )
        .is_err());
        assert!(Inertia::new(
            "box",
            "x",
            0.0,
            InertiaOptions {
                min: Some(10.0),
                max: Some(0.0),
                ..Default::default()
            },
        )
        .is_err());
        assert!(Inertia::new(
            "box",
            "x",
            0.0,
            InertiaOptions {
                bounce: 1.5,
                ..Default::default()
            },
        )
        .is_err());
    }
}
