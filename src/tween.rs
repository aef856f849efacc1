//! Tween: one scheduled interpolation of a property set over time for a
//! single target.
//!
//! A tween advances through `Pending -> Delaying -> Running -> Finished`,
//! with `Cancelled` reachable from any non-finished phase. Progress is
//! derived from elapsed wall time against the cycle anchor, so variable
//! frame rates cannot accumulate drift.

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::error::AnimationError;
use crate::interp::Interpolator;
use crate::sink::{PropertySink, TargetId};
use crate::time::AnimationTime;
use crate::value::PropertyValue;

/// Result of advancing an animation by one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Not yet active (delay window, or transport not playing).
    Pending,
    /// Produced values this tick and wants more ticks.
    Running,
    /// Done (completed or cancelled); the scheduler should retire it.
    Finished,
}

/// The per-tick contract shared by tweens, timelines, and physics solvers,
/// letting the engine drive them all from one active set.
pub trait Animate: std::any::Any {
    /// Advance to the given timestamp, writing values through the sink.
    fn advance(&mut self, now: AnimationTime, sink: &mut dyn PropertySink) -> Advance;

    /// Cancel immediately: no further hooks fire, applied values stay as-is.
    fn cancel(&mut self);

    /// Shift all internal time anchors forward by `by`. The engine uses this
    /// to resume a paused animation without a visual jump.
    fn shift(&mut self, by: AnimationTime);

    /// Typed access through the engine (e.g. to reach a timeline's
    /// transport while it is scheduled).
    fn as_any(&self) -> &dyn std::any::Any;

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Lifecycle phase of a tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TweenPhase {
    Pending,
    Delaying,
    Running,
    Finished,
    Cancelled,
}

impl TweenPhase {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delaying => "delaying",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal phases produce no further values.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// Options shared by every property of a tween.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TweenOptions {
    pub duration: AnimationTime,
    #[serde(default)]
    pub delay: AnimationTime,
    #[serde(default)]
    pub easing: Easing,
    /// Extra cycles after the first: `0` plays once, `-1` repeats forever.
    #[serde(default)]
    pub repeat: i32,
    /// Alternate direction on odd cycles (mirrors the eased curve).
    #[serde(default)]
    pub yoyo: bool,
}

impl Default for TweenOptions {
    fn default() -> Self {
        Self {
            duration: AnimationTime::from_nanos(300_000_000),
            delay: AnimationTime::zero(),
            easing: Easing::Linear,
            repeat: 0,
            yoyo: false,
        }
    }
}

impl TweenOptions {
    /// Validate construction-time invariants.
    pub fn validate(&self) -> Result<(), AnimationError> {
        if self.duration.is_zero() {
            return Err(AnimationError::config("tween duration must be positive"));
        }
        Ok(())
    }

    /// Total scheduled span: delay plus every cycle. Infinite repeat counts
    /// as a single cycle so timeline layout stays deterministic.
    pub fn total_duration(&self) -> AnimationTime {
        let cycles = if self.repeat < 0 {
            1
        } else {
            self.repeat as u64 + 1
        };
        let mut total = self.delay;
        for _ in 0..cycles {
            total += self.duration;
        }
        total
    }
}

/// One animated property: a name, an optional explicit start value, and the
/// end value. A missing `from` is read through the sink on the first active
/// tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PropertyValue>,
    pub to: PropertyValue,
}

impl PropertySpec {
    /// Animate from the target's current value to `to`.
    pub fn to(name: impl Into<String>, to: PropertyValue) -> Self {
        Self {
            name: name.into(),
            from: None,
            to,
        }
    }

    /// Animate between two explicit values.
    pub fn from_to(name: impl Into<String>, from: PropertyValue, to: PropertyValue) -> Self {
        Self {
            name: name.into(),
            from: Some(from),
            to,
        }
    }
}

type StartHook = Box<dyn FnMut()>;
type UpdateHook = Box<dyn FnMut(f32)>;
type RepeatHook = Box<dyn FnMut(u32)>;
type CompleteHook = Box<dyn FnMut()>;

/// Callback hooks fired as the tween advances. Panics inside hooks are
/// caught at the engine boundary, not here.
#[derive(Default)]
pub struct TweenHooks {
    pub on_start: Option<StartHook>,
    pub on_update: Option<UpdateHook>,
    pub on_repeat: Option<RepeatHook>,
    pub on_complete: Option<CompleteHook>,
}

struct PropertyTrack {
    name: String,
    from: Option<PropertyValue>,
    to: PropertyValue,
    interp: Option<Interpolator>,
}

/// A single animation instance.
pub struct Tween {
    target: TargetId,
    props: Vec<PropertyTrack>,
    opts: TweenOptions,
    hooks: TweenHooks,
    phase: TweenPhase,
    start_time: Option<AnimationTime>,
    /// Start of the current cycle (initially start + delay, rebased on
    /// every repeat).
    cycle_anchor: AnimationTime,
    current_repeat: u32,
    reversed: bool,
}

impl Tween {
    /// Create a tween. Fails synchronously on invalid options, an empty
    /// property set, or a from/to pair that cannot be interpolated.
    pub fn new(
        target: impl Into<TargetId>,
        properties: Vec<PropertySpec>,
        options: TweenOptions,
    ) -> Result<Self, AnimationError> {
        options.validate()?;
        if properties.is_empty() {
            return Err(AnimationError::config(
                "tween must animate at least one property",
            ));
        }
        let mut props = Vec::with_capacity(properties.len());
        for spec in properties {
            let interp = match &spec.from {
                Some(from) => Some(Interpolator::new(from, &spec.to)?),
                None => None,
            };
            props.push(PropertyTrack {
                name: spec.name,
                from: spec.from,
                to: spec.to,
                interp,
            });
        }
        Ok(Self {
            target: target.into(),
            props,
            opts: options,
            hooks: TweenHooks::default(),
            phase: TweenPhase::Pending,
            start_time: None,
            cycle_anchor: AnimationTime::zero(),
            current_repeat: 0,
            reversed: false,
        })
    }

    pub fn on_start(mut self, hook: impl FnMut() + 'static) -> Self {
        self.hooks.on_start = Some(Box::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(f32) + 'static) -> Self {
        self.hooks.on_update = Some(Box::new(hook));
        self
    }

    pub fn on_repeat(mut self, hook: impl FnMut(u32) + 'static) -> Self {
        self.hooks.on_repeat = Some(Box::new(hook));
        self
    }

    pub fn on_complete(mut self, hook: impl FnMut() + 'static) -> Self {
        self.hooks.on_complete = Some(Box::new(hook));
        self
    }

    #[inline]
    pub fn phase(&self) -> TweenPhase {
        self.phase
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn duration(&self) -> AnimationTime {
        self.opts.duration
    }

    /// Completed repeat transitions so far.
    #[inline]
    pub fn current_repeat(&self) -> u32 {
        self.current_repeat
    }

    /// Whether the current cycle plays mirrored (yoyo return leg).
    #[inline]
    pub fn is_reversed_cycle(&self) -> bool {
        self.reversed
    }

    /// Pin the tween's start to an explicit timestamp instead of the first
    /// tick it sees. Timelines use this to place children on a shared clock.
    pub(crate) fn start_at(&mut self, start: AnimationTime) {
        self.start_time = Some(start);
    }

    /// Resolve deferred `from` values and build the remaining interpolators.
    fn bind_interpolators(&mut self, sink: &mut dyn PropertySink) -> Result<(), AnimationError> {
        for track in &mut self.props {
            if track.interp.is_some() {
                continue;
            }
            let from = match &track.from {
                Some(v) => v.clone(),
                None => sink.get(&self.target, &track.name)?,
            };
            track.interp = Some(Interpolator::new(&from, &track.to)?);
        }
        Ok(())
    }

    fn retire(&mut self, reason: &AnimationError) -> Advance {
        log::warn!(
            "tween on '{}' retired: {} ({})",
            self.target,
            reason,
            reason.category()
        );
        self.phase = TweenPhase::Finished;
        Advance::Finished
    }
}

impl std::fmt::Debug for Tween {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tween")
            .field("target", &self.target)
            .field("properties", &self.props.len())
            .field("phase", &self.phase)
            .field("duration", &self.opts.duration)
            .field("current_repeat", &self.current_repeat)
            .field("reversed", &self.reversed)
            .finish_non_exhaustive()
    }
}

impl Animate for Tween {
    fn advance(&mut self, now: AnimationTime, sink: &mut dyn PropertySink) -> Advance {
        if self.phase.is_terminal() {
            return Advance::Finished;
        }

        let start = *self.start_time.get_or_insert(now);
        let active_from = start + self.opts.delay;
        if now < active_from {
            self.phase = TweenPhase::Delaying;
            return Advance::Pending;
        }

        if self.phase != TweenPhase::Running {
            if let Err(err) = self.bind_interpolators(sink) {
                return self.retire(&err);
            }
            self.cycle_anchor = active_from;
            self.phase = TweenPhase::Running;
            if let Some(hook) = self.hooks.on_start.as_mut() {
                hook();
            }
        }

        let raw = (now.duration_since(self.cycle_anchor).as_seconds()
            / self.opts.duration.as_seconds())
        .clamp(0.0, 1.0) as f32;
        let mut eased = self.opts.easing.apply(raw);
        if self.opts.yoyo && self.reversed {
            eased = 1.0 - eased;
        }

        for track in &self.props {
            // Every track has an interpolator once bind_interpolators ran.
            let Some(interp) = track.interp.as_ref() else {
                continue;
            };
            if let Err(err) = sink.set(&self.target, &track.name, interp.sample(eased)) {
                return self.retire(&err);
            }
        }

        if let Some(hook) = self.hooks.on_update.as_mut() {
            hook(eased);
        }

        if raw >= 1.0 {
            let repeats_remain =
                self.opts.repeat < 0 || (self.current_repeat as i32) < self.opts.repeat;
            if repeats_remain {
                self.current_repeat += 1;
                self.cycle_anchor = now;
                if self.opts.yoyo {
                    self.reversed = !self.reversed;
                }
                let repeat_index = self.current_repeat;
                if let Some(hook) = self.hooks.on_repeat.as_mut() {
                    hook(repeat_index);
                }
                return Advance::Running;
            }
            self.phase = TweenPhase::Finished;
            if let Some(hook) = self.hooks.on_complete.as_mut() {
                hook();
            }
            return Advance::Finished;
        }

        Advance::Running
    }

    fn cancel(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = TweenPhase::Cancelled;
        }
    }

    fn shift(&mut self, by: AnimationTime) {
        if let Some(start) = self.start_time.as_mut() {
            *start += by;
        }
        if self.phase == TweenPhase::Running {
            self.cycle_anchor += by;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
