//! motus: property animation core.
//!
//! Animates numeric, color, and composite properties of opaque targets over
//! time. The crate decides *when* each animated value changes and *what*
//! the value is at a given instant; applying values to a real surface is
//! the host's job, reached only through the [`PropertySink`] boundary.
//!
//! - Tweens interpolate a property set under a delay/duration/easing/
//!   repeat/yoyo state machine.
//! - Timelines place many tweens on a shared clock with a relative/
//!   absolute/labeled position grammar and a deterministic total duration.
//! - Spring and inertia solvers generate values from physical state
//!   instead of a fixed duration.
//! - The engine owns the active set, advances it once per externally
//!   driven tick, and reports frame-rate/budget diagnostics.
//!
//! Everything is single-threaded and cooperative: one tick source, one
//! call stack per tick, no locks.

pub mod clock;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod interp;
pub mod sink;
pub mod solvers;
pub mod time;
pub mod timeline;
pub mod tween;
pub mod value;

// Re-exports for consumers
pub use clock::{FrameClock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use easing::Easing;
pub use engine::{AnimationId, CancelHandle, Engine, EngineStats};
pub use error::AnimationError;
pub use interp::{ColorSpace, Interpolator};
pub use sink::{MemorySink, PropertySink, SharedSink, TargetId};
pub use solvers::{Inertia, InertiaOptions, Spring, SpringOptions};
pub use time::{AnimationTime, TimeRange};
pub use timeline::{Timeline, TimelineItem, TimelinePosition, Transport};
pub use tween::{Advance, Animate, PropertySpec, Tween, TweenOptions, TweenPhase};
pub use value::{Color, PropertyValue, Unit, ValueKind};

/// Animation core result type
pub type Result<T> = core::result::Result<T, AnimationError>;
