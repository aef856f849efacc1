//! Damped spring solver.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::sink::{PropertySink, TargetId};
use crate::time::AnimationTime;
use crate::tween::{Advance, Animate};
use crate::value::{PropertyValue, Unit};

/// Spring parameters. With the defaults (`stiffness 100`, `damping 10`,
/// `mass 1`) the system is underdamped (damping ratio 0.5) and settles with
/// a visible overshoot; `damping 20` is critically damped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringOptions {
    pub mass: f32,
    pub stiffness: f32,
    pub damping: f32,
    /// Initial velocity, in value units per second.
    pub velocity: f32,
    /// Rest requires speed below this threshold...
    pub rest_speed: f32,
    /// ...and displacement from the target below this one.
    pub rest_delta: f32,
    /// Integration step clamp; larger frame gaps are cut to this to keep
    /// explicit Euler integration stable.
    pub max_step: AnimationTime,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            mass: 1.0,
            stiffness: 100.0,
            damping: 10.0,
            velocity: 0.0,
            rest_speed: 0.01,
            rest_delta: 0.01,
            max_step: AnimationTime::from_nanos(64_000_000),
        }
    }
}

impl SpringOptions {
    pub fn validate(&self) -> Result<(), AnimationError> {
        if self.mass <= 0.0 || self.stiffness <= 0.0 {
            return Err(AnimationError::config(
                "spring mass and stiffness must be positive",
            ));
        }
        if self.damping < 0.0 {
            return Err(AnimationError::config("spring damping must be >= 0"));
        }
        if self.rest_speed <= 0.0 || self.rest_delta <= 0.0 {
            return Err(AnimationError::config(
                "spring rest thresholds must be positive",
            ));
        }
        Ok(())
    }
}

type UpdateHook = Box<dyn FnMut(f32)>;
type CompleteHook = Box<dyn FnMut()>;

/// A scalar property animated by Hooke's law with viscous damping.
pub struct Spring {
    target: TargetId,
    property: String,
    unit: Option<Unit>,
    position: f32,
    velocity: f32,
    goal: f32,
    opts: SpringOptions,
    last_tick: Option<AnimationTime>,
    on_update: Option<UpdateHook>,
    on_complete: Option<CompleteHook>,
    finished: bool,
}

impl Spring {
    pub fn new(
        target: impl Into<TargetId>,
        property: impl Into<String>,
        from: f32,
        to: f32,
        options: SpringOptions,
    ) -> Result<Self, AnimationError> {
        options.validate()?;
        Ok(Self {
            target: target.into(),
            property: property.into(),
            unit: None,
            position: from,
            velocity: options.velocity,
            goal: to,
            opts: options,
            last_tick: None,
            on_update: None,
            on_complete: None,
            finished: false,
        })
    }

    /// Attach a unit to the written values.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(f32) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
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

    /// Retarget the spring mid-flight; velocity is preserved so the motion
    /// stays continuous.
    pub fn set_goal(&mut self, goal: f32) {
        self.goal = goal;
        self.finished = false;
    }

    #[inline]
    fn at_rest(&self) -> bool {
        self.velocity.abs() < self.opts.rest_speed
            && (self.position - self.goal).abs() < self.opts.rest_delta
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
}

impl std::fmt::Debug for Spring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spring")
            .field("target", &self.target)
            .field("property", &self.property)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("goal", &self.goal)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Animate for Spring {
    fn advance(&mut self, now: AnimationTime, sink: &mut dyn PropertySink) -> Advance {
        if self.finished {
            return Advance::Finished;
        }

        let Some(last) = self.last_tick.replace(now) else {
            // First tick establishes the time base and applies the start
            // position.
            if self.write(sink).is_err() {
                self.finished = true;
                return Advance::Finished;
            }
            return Advance::Running;
        };

        let dt_time = now.duration_since(last);
        let dt = dt_time.clamp(AnimationTime::zero(), self.opts.max_step).as_seconds() as f32;
        if dt > 0.0 {
            let displacement = self.position - self.goal;
            let force = -self.opts.stiffness * displacement - self.opts.damping * self.velocity;
            self.velocity += (force / self.opts.mass) * dt;
            self.position += self.velocity * dt;
        }

        if self.at_rest() {
            // Snap to the exact target so the final frame has no residue.
            self.position = self.goal;
            self.velocity = 0.0;
            if let Err(err) = self.write(sink) {
                log::warn!("spring on '{}' retired: {err}", self.target);
                self.finished = true;
                return Advance::Finished;
            }
            if let Some(hook) = self.on_update.as_mut() {
                hook(self.position);
            }
            self.finished = true;
            if let Some(hook) = self.on_complete.as_mut() {
                hook();
            }
            return Advance::Finished;
        }

        if let Err(err) = self.write(sink) {
            log::warn!("spring on '{}' retired: {err}", self.target);
            self.finished = true;
            return Advance::Finished;
        }
        if let Some(hook) = self.on_update.as_mut() {
            hook(self.position);
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
