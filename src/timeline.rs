//! Timeline: a composition of tweens placed on a shared clock.
//!
//! Items are laid out with a small position grammar (absolute times,
//! relative offsets against the previous item, named labels) and the
//! timeline's total duration is the deterministic maximum of item end
//! times. At any playhead the timeline materializes the tweens whose
//! window contains it and drives those; the timeline itself never
//! interpolates.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::sink::{PropertySink, TargetId};
use crate::time::{AnimationTime, TimeRange};
use crate::tween::{Advance, Animate, PropertySpec, Tween, TweenOptions};

/// Where to place a new item relative to the timeline built so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimelinePosition {
    /// Explicit start time.
    Absolute(AnimationTime),
    /// `"<"`: start together with the previous item.
    WithPrevious,
    /// `">"` (and the default): start when the previous item ends.
    AfterPrevious,
    /// `"+=n"` / `"-=n"`: offset in seconds from the previous item's end,
    /// floored at zero.
    FromPreviousEnd(f64),
    /// `"name"`: start at a label.
    Label(String),
    /// `"name+=n"` / `"name-=n"`: offset in seconds from a label, floored
    /// at zero.
    LabelOffset(String, f64),
}

impl Default for TimelinePosition {
    fn default() -> Self {
        Self::AfterPrevious
    }
}

impl TimelinePosition {
    /// Parse a position token. Malformed tokens are `InvalidConfig`.
    pub fn parse(token: &str) -> Result<Self, AnimationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AnimationError::config("empty timeline position token"));
        }
        if token == "<" {
            return Ok(Self::WithPrevious);
        }
        if token == ">" {
            return Ok(Self::AfterPrevious);
        }
        if let Some(rest) = token.strip_prefix("+=") {
            return Ok(Self::FromPreviousEnd(parse_offset(token, rest)?));
        }
        if let Some(rest) = token.strip_prefix("-=") {
            return Ok(Self::FromPreviousEnd(-parse_offset(token, rest)?));
        }
        if let Ok(seconds) = token.parse::<f64>() {
            let time = AnimationTime::from_seconds(seconds)
                .map_err(|_| AnimationError::config(format!("invalid position time '{token}'")))?;
            return Ok(Self::Absolute(time));
        }
        if let Some((label, rest)) = token.split_once("+=") {
            return Ok(Self::LabelOffset(
                label.to_string(),
                parse_offset(token, rest)?,
            ));
        }
        if let Some((label, rest)) = token.split_once("-=") {
            return Ok(Self::LabelOffset(
                label.to_string(),
                -parse_offset(token, rest)?,
            ));
        }
        Ok(Self::Label(token.to_string()))
    }

    /// Resolve to an absolute start time, given the previous item's window
    /// and the label table. Unknown labels are a configuration error, not a
    /// silent fallback to zero.
    fn resolve(
        &self,
        prev: Option<&TimeRange>,
        labels: &HashMap<String, AnimationTime>,
    ) -> Result<AnimationTime, AnimationError> {
        let prev_start = prev.map(|w| w.start).unwrap_or_default();
        let prev_end = prev.map(|w| w.end).unwrap_or_default();
        match self {
            Self::Absolute(time) => Ok(*time),
            Self::WithPrevious => Ok(prev_start),
            Self::AfterPrevious => Ok(prev_end),
            Self::FromPreviousEnd(offset) => offset_time(prev_end, *offset),
            Self::Label(name) => lookup_label(labels, name),
            Self::LabelOffset(name, offset) => offset_time(lookup_label(labels, name)?, *offset),
        }
    }
}

fn parse_offset(token: &str, digits: &str) -> Result<f64, AnimationError> {
    digits
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| AnimationError::config(format!("malformed position token '{token}'")))
}

fn lookup_label(
    labels: &HashMap<String, AnimationTime>,
    name: &str,
) -> Result<AnimationTime, AnimationError> {
    labels
        .get(name)
        .copied()
        .ok_or_else(|| AnimationError::config(format!("unknown timeline label '{name}'")))
}

/// Apply a signed offset in seconds, floored at zero.
fn offset_time(base: AnimationTime, offset: f64) -> Result<AnimationTime, AnimationError> {
    let shifted = (base.as_seconds() + offset).max(0.0);
    AnimationTime::from_seconds(shifted)
}

/// Transport state of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Idle,
    Playing,
    Paused,
    Finished,
}

impl Transport {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    #[inline]
    pub fn can_pause(&self) -> bool {
        matches!(self, Self::Playing)
    }

    #[inline]
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Idle | Self::Paused)
    }
}

/// One placed child animation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub target: TargetId,
    pub properties: Vec<PropertySpec>,
    pub options: TweenOptions,
    pub window: TimeRange,
}

type CompleteHook = Box<dyn FnMut()>;

/// A composition of tweens on a shared clock.
pub struct Timeline {
    items: Vec<TimelineItem>,
    labels: HashMap<String, AnimationTime>,
    total: AnimationTime,
    transport: Transport,
    time_scale: f64,
    playhead: AnimationTime,
    /// Wall-clock anchor: (wall time, playhead at that moment). Cleared by
    /// pause/seek/scale changes and re-established on the next tick, so
    /// resuming never jumps.
    anchor: Option<(AnimationTime, AnimationTime)>,
    children: Vec<Option<Tween>>,
    on_complete: Option<CompleteHook>,
    completed_fired: bool,
    cancelled: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            labels: HashMap::new(),
            total: AnimationTime::zero(),
            transport: Transport::Idle,
            time_scale: 1.0,
            playhead: AnimationTime::zero(),
            anchor: None,
            children: Vec::new(),
            on_complete: None,
            completed_fired: false,
            cancelled: false,
        }
    }

    pub fn on_complete(mut self, hook: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    /// Add an item at the given position. Fails synchronously on invalid
    /// options, an unresolvable position, or an uninterpolatable from/to
    /// pair.
    pub fn to(
        &mut self,
        target: impl Into<TargetId>,
        properties: Vec<PropertySpec>,
        options: TweenOptions,
        position: TimelinePosition,
    ) -> Result<&mut Self, AnimationError> {
        let target = target.into();
        // Validate everything validatable now; a child that fails to
        // materialize mid-playback would be much harder to diagnose.
        Tween::new(target.clone(), properties.clone(), options.clone())?;

        let start = position.resolve(self.items.last().map(|i| &i.window), &self.labels)?;
        let window = TimeRange {
            start,
            end: start + options.total_duration(),
        };
        if window.end > self.total {
            self.total = window.end;
        }
        self.items.push(TimelineItem {
            target,
            properties,
            options,
            window,
        });
        self.children.push(None);
        Ok(self)
    }

    /// Add a label at the current end of the timeline. Re-adding a name
    /// moves the label.
    pub fn add_label(&mut self, name: impl Into<String>) -> &mut Self {
        self.labels.insert(name.into(), self.total);
        self
    }

    /// Add a label at an explicit position.
    pub fn add_label_at(
        &mut self,
        name: impl Into<String>,
        position: TimelinePosition,
    ) -> Result<&mut Self, AnimationError> {
        let time = position.resolve(self.items.last().map(|i| &i.window), &self.labels)?;
        self.labels.insert(name.into(), time);
        Ok(self)
    }

    /// Resolved time of a label, if present.
    pub fn label(&self, name: &str) -> Option<AnimationTime> {
        self.labels.get(name).copied()
    }

    #[inline]
    pub fn duration(&self) -> AnimationTime {
        self.total
    }

    #[inline]
    pub fn transport(&self) -> Transport {
        self.transport
    }

    #[inline]
    pub fn playhead(&self) -> AnimationTime {
        self.playhead
    }

    /// Playhead as a fraction of the total duration (0 for an empty
    /// timeline).
    pub fn progress(&self) -> f32 {
        TimeRange::from_duration(self.total).normalize(self.playhead)
    }

    /// Start (or resume) playback. A finished timeline stays finished; use
    /// [`Timeline::restart`] to play it again.
    pub fn play(&mut self) {
        if self.transport.can_resume() {
            self.transport = Transport::Playing;
            self.anchor = None;
        }
    }

    /// Freeze the playhead. `play` resumes without a jump.
    pub fn pause(&mut self) {
        if self.transport.can_pause() {
            self.transport = Transport::Paused;
            self.anchor = None;
        }
    }

    /// Stop playback and rewind to the start. A later `play` replays from
    /// the top and completion can fire again.
    pub fn stop(&mut self) {
        self.playhead = AnimationTime::zero();
        self.anchor = None;
        self.reset_children();
        self.completed_fired = false;
        self.transport = Transport::Idle;
    }

    /// Rewind to zero and play from the top. Completion can fire again.
    pub fn restart(&mut self) {
        self.playhead = AnimationTime::zero();
        self.anchor = None;
        self.reset_children();
        self.completed_fired = false;
        self.transport = Transport::Playing;
    }

    fn reset_children(&mut self) {
        self.children = (0..self.items.len()).map(|_| None).collect();
    }

    /// Jump the playhead, clamped to `[0, duration]`. The active item set
    /// is re-derived from the new playhead on the next tick: items whose
    /// window contains it restart there, all others stop.
    pub fn seek(&mut self, time: AnimationTime) {
        self.playhead = time.clamp(AnimationTime::zero(), self.total);
        self.anchor = None;
        self.reset_children();
        if self.transport == Transport::Finished && self.playhead < self.total {
            self.transport = Transport::Paused;
        }
    }

    /// Seek to a label.
    pub fn seek_label(&mut self, name: &str) -> Result<(), AnimationError> {
        let time = lookup_label(&self.labels, name)?;
        self.seek(time);
        Ok(())
    }

    /// Playback rate; negative values play backwards.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.anchor = None;
        self.time_scale = scale;
    }

    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Flip the playback direction in place.
    pub fn reverse(&mut self) {
        self.set_time_scale(-self.time_scale);
    }

    /// Materialize and drive every child whose window is at or behind the
    /// playhead. Children past their window advance once more so their end
    /// state lands, then sit finished; children ahead of the playhead are
    /// dropped.
    fn drive_children(&mut self, sink: &mut dyn PropertySink) {
        for (item, slot) in self.items.iter().zip(self.children.iter_mut()) {
            if self.playhead < item.window.start {
                *slot = None;
                continue;
            }

            let needs_fresh = match slot.as_ref() {
                None => true,
                // A terminal child with the playhead back inside its window
                // means a backwards jump: restart it from its own start.
                Some(tween) => tween.phase().is_terminal() && self.playhead < item.window.end,
            };
            if needs_fresh {
                match Tween::new(item.target.clone(), item.properties.clone(), item.options.clone())
                {
                    Ok(mut tween) => {
                        tween.start_at(item.window.start);
                        *slot = Some(tween);
                    }
                    Err(err) => {
                        log::warn!("timeline child on '{}' failed to build: {err}", item.target);
                        continue;
                    }
                }
            }
            if let Some(tween) = slot.as_mut() {
                // Children live in timeline time: the playhead is their
                // "now".
                tween.advance(self.playhead, sink);
            }
        }
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("items", &self.items.len())
            .field("labels", &self.labels.len())
            .field("total", &self.total)
            .field("transport", &self.transport)
            .field("playhead", &self.playhead)
            .field("time_scale", &self.time_scale)
            .finish_non_exhaustive()
    }
}

impl Animate for Timeline {
    fn advance(&mut self, now: AnimationTime, sink: &mut dyn PropertySink) -> Advance {
        if self.cancelled {
            return Advance::Finished;
        }
        match self.transport {
            Transport::Idle | Transport::Paused => return Advance::Pending,
            Transport::Finished => return Advance::Finished,
            Transport::Playing => {}
        }

        let (anchor_wall, anchor_playhead) = *self.anchor.get_or_insert((now, self.playhead));
        let elapsed = now.duration_since(anchor_wall).as_seconds();
        let raw = anchor_playhead.as_seconds() + elapsed * self.time_scale;
        let total = self.total.as_seconds();
        self.playhead = AnimationTime::from_seconds(raw.clamp(0.0, total))
            .unwrap_or(AnimationTime::zero());

        self.drive_children(sink);

        if self.playhead >= self.total {
            self.transport = Transport::Finished;
            if !self.completed_fired {
                self.completed_fired = true;
                if let Some(hook) = self.on_complete.as_mut() {
                    hook();
                }
            }
            return Advance::Finished;
        }
        if self.time_scale < 0.0 && raw <= 0.0 {
            // Played back to the start in reverse; stop without firing
            // completion (that is reserved for the forward end).
            self.transport = Transport::Finished;
            return Advance::Finished;
        }
        Advance::Running
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }

    fn shift(&mut self, by: AnimationTime) {
        if let Some((wall, _)) = self.anchor.as_mut() {
            *wall += by;
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
    fn parse_grammar_tokens() {
        assert_eq!(
            TimelinePosition::parse("<").unwrap(),
            TimelinePosition::WithPrevious
        );
        assert_eq!(
            TimelinePosition::parse(">").unwrap(),
            TimelinePosition::AfterPrevious
        );
        assert_eq!(
            TimelinePosition::parse("1.5").unwrap(),
            TimelinePosition::Absolute(AnimationTime::from_seconds(1.5).unwrap())
        );
        assert_eq!(
            TimelinePosition::parse("+=0.2").unwrap(),
            TimelinePosition::FromPreviousEnd(0.2)
        );
        assert_eq!(
            TimelinePosition::parse("-=0.2").unwrap(),
            TimelinePosition::FromPreviousEnd(-0.2)
        );
        assert_eq!(
            TimelinePosition::parse("intro").unwrap(),
            TimelinePosition::Label("intro".into())
        );
        assert_eq!(
            TimelinePosition::parse("intro+=1").unwrap(),
            TimelinePosition::LabelOffset("intro".into(), 1.0)
        );
        assert_eq!(
            TimelinePosition::parse("intro-=1").unwrap(),
            TimelinePosition::LabelOffset("intro".into(), -1.0)
        );
    }

    #[test]
    fn parse_rejects_malformed_tokens() {
        assert!(TimelinePosition::parse("").is_err());
        assert!(TimelinePosition::parse("-2.0").is_err());
        assert!(TimelinePosition::parse("+=abc").is_err());
        assert!(TimelinePosition::parse("intro+=x").is_err());
    }
}
