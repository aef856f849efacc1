//! Engine: owns the active set and advances it once per frame tick.
//!
//! The active set is a slotmap keyed by generational [`AnimationId`]s, so a
//! stale id after retirement simply misses; `remove`/`cancel` on an unknown
//! id is a no-op, never a dangling access. Each tick iterates a snapshot of
//! keys, advances every live entry against the same timestamp, and applies
//! all removals after the full pass — cancellations requested from inside a
//! hook (via [`CancelHandle`]) take effect before the next tick.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::config::EngineConfig;
use crate::sink::{MemorySink, PropertySink};
use crate::time::AnimationTime;
use crate::tween::{Advance, Animate};

new_key_type! {
    /// Generational key for an entry in the engine's active set.
    pub struct AnimationId;
}

/// Cancellation handle safe to move into hook closures. Cancelling marks
/// the entry; the engine sweeps it at the end of the in-flight tick (or
/// immediately at the start of the next one), so no further hooks fire.
#[derive(Clone)]
pub struct CancelHandle {
    flag: Rc<Cell<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}

struct Entry {
    anim: Box<dyn Animate>,
    cancel_flag: Rc<Cell<bool>>,
    paused_at: Option<AnimationTime>,
}

/// Read-only engine snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineStats {
    pub active_count: usize,
    /// Sliding-window average over the configured number of frame deltas.
    pub fps: f64,
    pub is_running: bool,
    pub frame_budget_ms: f64,
    /// Ticks whose processing time exceeded the budget.
    pub budget_overruns: u64,
}

/// Single-threaded scheduler for tweens, timelines, and solvers.
pub struct Engine {
    cfg: EngineConfig,
    sink: Box<dyn PropertySink>,
    active: SlotMap<AnimationId, Entry>,
    last_tick: Option<AnimationTime>,
    frame_deltas: VecDeque<f64>,
    budget_overruns: u64,
    running: bool,
    idle_since: Option<AnimationTime>,
}

impl Engine {
    pub fn new(cfg: EngineConfig, sink: impl PropertySink + 'static) -> Self {
        Self {
            cfg,
            sink: Box::new(sink),
            active: SlotMap::with_key(),
            last_tick: None,
            frame_deltas: VecDeque::new(),
            budget_overruns: 0,
            running: false,
            idle_since: None,
        }
    }

    /// Run a closure against the process-default engine (one per thread,
    /// backed by a [`MemorySink`]). A convenience only — explicit
    /// [`Engine::new`] is the primary construction path and the one tests
    /// should isolate with.
    pub fn with_default<R>(f: impl FnOnce(&mut Engine) -> R) -> R {
        thread_local! {
            static DEFAULT_ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
        }
        DEFAULT_ENGINE.with(|cell| {
            let mut slot = cell.borrow_mut();
            let engine = slot
                .get_or_insert_with(|| Engine::new(EngineConfig::default(), MemorySink::new()));
            f(engine)
        })
    }

    /// Insert an animation into the active set. The first insertion flips
    /// `is_running` to true; the host's drive loop owns actual tick
    /// scheduling, so repeated adds during a tick cannot double-schedule
    /// anything.
    pub fn add(&mut self, anim: impl Animate + 'static) -> AnimationId {
        let was_empty = self.active.is_empty();
        let id = self.active.insert(Entry {
            anim: Box::new(anim),
            cancel_flag: Rc::new(Cell::new(false)),
            paused_at: None,
        });
        self.idle_since = None;
        if was_empty && !self.running {
            self.running = true;
            log::debug!("engine started ({id:?})");
        }
        id
    }

    /// Erase an entry. Unknown or already-retired ids are a no-op.
    pub fn remove(&mut self, id: AnimationId) -> bool {
        self.active.remove(id).is_some()
    }

    /// Cancel an entry: its `cancel` runs immediately (no further hooks),
    /// and it is erased. Unknown ids are a no-op.
    pub fn cancel(&mut self, id: AnimationId) -> bool {
        match self.active.remove(id) {
            Some(mut entry) => {
                entry.cancel_flag.set(true);
                entry.anim.cancel();
                true
            }
            None => false,
        }
    }

    /// A handle that hook closures can capture to cancel this animation
    /// from inside a tick.
    pub fn cancel_handle(&self, id: AnimationId) -> Option<CancelHandle> {
        self.active.get(id).map(|entry| CancelHandle {
            flag: Rc::clone(&entry.cancel_flag),
        })
    }

    /// Stop advancing an entry until `resume`. Unknown ids are a no-op.
    pub fn pause(&mut self, id: AnimationId) {
        let stamp = self.last_tick.unwrap_or_default();
        if let Some(entry) = self.active.get_mut(id) {
            entry.paused_at.get_or_insert(stamp);
        }
    }

    /// Resume a paused entry, shifting its time anchors by the paused span
    /// so it continues where it left off. Unknown ids are a no-op.
    pub fn resume(&mut self, id: AnimationId) {
        let now = self.last_tick.unwrap_or_default();
        if let Some(entry) = self.active.get_mut(id) {
            if let Some(paused_at) = entry.paused_at.take() {
                entry.anim.shift(now.duration_since(paused_at));
            }
        }
    }

    /// Typed access to a scheduled animation (e.g. a [`crate::Timeline`]
    /// transport).
    pub fn get<T: Animate>(&self, id: AnimationId) -> Option<&T> {
        self.active
            .get(id)
            .and_then(|entry| entry.anim.as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Animate>(&mut self, id: AnimationId) -> Option<&mut T> {
        self.active
            .get_mut(id)
            .and_then(|entry| entry.anim.as_any_mut().downcast_mut::<T>())
    }

    /// Forcibly empty the active set and stop immediately (no idle grace).
    pub fn clear(&mut self) {
        for (_, entry) in self.active.iter_mut() {
            entry.anim.cancel();
        }
        self.active.clear();
        self.running = false;
        self.idle_since = None;
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advance every active animation to `now`.
    ///
    /// All entries observe the same timestamp; finished and cancelled
    /// entries are collected during the pass and removed after it, so the
    /// iteration never observes its own mutations. A panic escaping one
    /// entry's hooks is caught and logged without aborting the tick for the
    /// others.
    pub fn tick(&mut self, now: AnimationTime) {
        let wall_start = Instant::now();

        if let Some(last) = self.last_tick {
            let delta = now.duration_since(last).as_seconds();
            if delta > 0.0 {
                self.frame_deltas.push_back(delta);
                while self.frame_deltas.len() > self.cfg.fps_window {
                    self.frame_deltas.pop_front();
                }
            }
        }
        self.last_tick = Some(now);

        let keys: Vec<AnimationId> = self.active.keys().collect();
        let mut retired: Vec<AnimationId> = Vec::new();
        for key in keys {
            let Some(entry) = self.active.get_mut(key) else {
                continue;
            };
            if entry.cancel_flag.get() {
                entry.anim.cancel();
                retired.push(key);
                continue;
            }
            if entry.paused_at.is_some() {
                continue;
            }
            let sink = self.sink.as_mut();
            let outcome = catch_unwind(AssertUnwindSafe(|| entry.anim.advance(now, sink)));
            match outcome {
                Ok(Advance::Finished) => retired.push(key),
                Ok(_) => {
                    // A hook fired during this advance may have cancelled
                    // the entry; honor it before the next tick.
                    if entry.cancel_flag.get() {
                        entry.anim.cancel();
                        retired.push(key);
                    }
                }
                Err(_) => {
                    log::warn!("animation {key:?}: hook panicked during tick; entry kept active");
                }
            }
        }

        for key in retired {
            if self.active.remove(key).is_some() {
                log::debug!("animation {key:?} retired");
            }
        }

        if self.active.is_empty() {
            match self.idle_since {
                None => self.idle_since = Some(now),
                Some(since) if now.duration_since(since) >= self.cfg.idle_grace => {
                    if self.running {
                        self.running = false;
                        log::debug!("engine stopped after idle grace");
                    }
                }
                Some(_) => {}
            }
        } else {
            self.idle_since = None;
            self.running = true;
        }

        let spent_ms = wall_start.elapsed().as_secs_f64() * 1000.0;
        if spent_ms > self.cfg.frame_budget_ms {
            self.budget_overruns += 1;
            log::warn!(
                "tick exceeded frame budget: {spent_ms:.2}ms > {:.2}ms ({} active)",
                self.cfg.frame_budget_ms,
                self.active.len()
            );
        }
    }

    /// Read-only snapshot of the scheduler state.
    pub fn stats(&self) -> EngineStats {
        let fps = if self.frame_deltas.is_empty() {
            0.0
        } else {
            self.frame_deltas.len() as f64 / self.frame_deltas.iter().sum::<f64>()
        };
        EngineStats {
            active_count: self.active.len(),
            fps,
            is_running: self.running,
            frame_budget_ms: self.cfg.frame_budget_ms,
            budget_overruns: self.budget_overruns,
        }
    }
}
