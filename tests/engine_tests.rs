use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use motus::{
    AnimationTime, CancelHandle, Engine, EngineConfig, ManualClock, PropertySpec, PropertyValue,
    SharedSink, Spring, SpringOptions, Timeline, TimelinePosition, Tween, TweenOptions,
};

fn secs(s: f64) -> AnimationTime {
    AnimationTime::from_seconds(s).unwrap()
}

fn millis(ms: f64) -> AnimationTime {
    AnimationTime::from_millis(ms).unwrap()
}

fn x_tween(target: &str, duration_s: f64) -> Tween {
    Tween::new(
        target,
        vec![PropertySpec::from_to(
            "x",
            PropertyValue::number(0.0),
            PropertyValue::number(100.0),
        )],
        TweenOptions {
            duration: secs(duration_s),
            ..Default::default()
        },
    )
    .unwrap()
}

fn engine_with_sink() -> (Engine, SharedSink) {
    let sink = SharedSink::new();
    (Engine::new(EngineConfig::default(), sink.clone()), sink)
}

fn number_at(sink: &SharedSink, target: &str, property: &str) -> f32 {
    sink.value(target, property)
        .and_then(|v| v.as_number())
        .unwrap_or_else(|| panic!("no numeric value for {target}.{property}"))
}

/// it should flip is_running on the first add and back off after the idle grace
#[test]
fn running_transitions_with_idle_grace() {
    let mut clock = ManualClock::new();
    let (mut eng, _sink) = engine_with_sink();
    assert!(!eng.is_running());

    eng.add(x_tween("box", 0.1));
    assert!(eng.is_running());

    // Drive until the tween finishes; the active set drains but the engine
    // keeps running through the grace period.
    for _ in 0..12 {
        eng.tick(clock.advance(millis(16.0)));
    }
    assert_eq!(eng.active_count(), 0);
    assert!(eng.is_running());

    // Once the grace period elapses it stops.
    clock.advance(secs(1.0));
    eng.tick(clock.advance(millis(16.0)));
    eng.tick(clock.advance(millis(16.0)));
    assert!(!eng.is_running());
}

/// it should keep advancing healthy animations when a sibling's hook panics
#[test]
fn hook_panic_does_not_poison_the_tick() {
    let mut clock = ManualClock::new();
    let (mut eng, sink) = engine_with_sink();

    let panicking = x_tween("bad", 1.0).on_update(|_| panic!("hook failure"));
    let id_bad = eng.add(panicking);
    eng.add(x_tween("good", 1.0));

    eng.tick(clock.advance(millis(0.0)));
    eng.tick(clock.advance(millis(250.0)));

    // The healthy tween advanced despite the sibling panicking every tick.
    assert_abs_diff_eq!(number_at(&sink, "good", "x"), 25.0, epsilon = 1e-3);
    assert_eq!(eng.active_count(), 2);

    eng.cancel(id_bad);
    assert_eq!(eng.active_count(), 1);
}

/// it should honor a cancel requested from inside a hook before the next tick
#[test]
fn cancel_from_hook_applies_before_next_tick() {
    let mut clock = ManualClock::new();
    let (mut eng, _sink) = engine_with_sink();

    let handle_slot: Rc<RefCell<Option<CancelHandle>>> = Rc::new(RefCell::new(None));
    let updates = Rc::new(Cell::new(0u32));

    let handle_probe = Rc::clone(&handle_slot);
    let updates_probe = Rc::clone(&updates);
    let tween = Tween::new(
        "box",
        vec![PropertySpec::from_to(
            "x",
            PropertyValue::number(0.0),
            PropertyValue::number(100.0),
        )],
        TweenOptions {
            duration: secs(1.0),
            repeat: -1, // would run forever without the cancel
            ..Default::default()
        },
    )
    .unwrap()
    .on_update(move |_| {
        updates_probe.set(updates_probe.get() + 1);
        if let Some(handle) = handle_probe.borrow().as_ref() {
            handle.cancel();
        }
    });

    let id = eng.add(tween);
    *handle_slot.borrow_mut() = Some(eng.cancel_handle(id).unwrap());

    eng.tick(clock.advance(millis(16.0)));
    // The hook ran once and cancelled; the entry is gone before this tick.
    assert_eq!(eng.active_count(), 0);
    eng.tick(clock.advance(millis(16.0)));
    assert_eq!(updates.get(), 1);
}

/// it should pause and resume an entry without a time jump
#[test]
fn pause_resume_shifts_anchors() {
    let mut clock = ManualClock::new();
    let (mut eng, sink) = engine_with_sink();
    let id = eng.add(x_tween("box", 1.0));

    eng.tick(clock.advance(millis(0.0)));
    eng.tick(clock.advance(millis(250.0)));
    assert_abs_diff_eq!(number_at(&sink, "box", "x"), 25.0, epsilon = 1e-3);

    eng.pause(id);
    eng.tick(clock.advance(millis(250.0)));
    eng.tick(clock.advance(millis(250.0)));
    assert_abs_diff_eq!(number_at(&sink, "box", "x"), 25.0, epsilon = 1e-3);

    eng.resume(id);
    eng.tick(clock.advance(millis(250.0)));
    // 0.25s before the pause plus 0.25s after it: halfway.
    assert_abs_diff_eq!(number_at(&sink, "box", "x"), 50.0, epsilon = 1e-3);
}

/// it should drive tweens and solvers in the same active set
#[test]
fn mixed_active_set_runs_to_completion() {
    let mut clock = ManualClock::new();
    let (mut eng, sink) = engine_with_sink();

    eng.add(x_tween("box", 0.5));
    let spring = Spring::new("knob", "value", 0.0, 10.0, SpringOptions::default()).unwrap();
    eng.add(spring);
    assert_eq!(eng.active_count(), 2);

    for _ in 0..600 {
        eng.tick(clock.advance(millis(16.0)));
        if eng.active_count() == 0 {
            break;
        }
    }
    assert_eq!(eng.active_count(), 0);
    assert_abs_diff_eq!(number_at(&sink, "box", "x"), 100.0, epsilon = 1e-4);
    assert_abs_diff_eq!(number_at(&sink, "knob", "value"), 10.0, epsilon = 1e-4);
}

/// it should give typed access to a scheduled timeline's transport
#[test]
fn typed_access_reaches_timeline_transport() {
    let mut clock = ManualClock::new();
    let (mut eng, sink) = engine_with_sink();

    let mut tl = Timeline::new();
    tl.to(
        "box",
        vec![PropertySpec::from_to(
            "x",
            PropertyValue::number(0.0),
            PropertyValue::number(100.0),
        )],
        TweenOptions {
            duration: secs(1.0),
            ..Default::default()
        },
        TimelinePosition::default(),
    )
    .unwrap();

    let id = eng.add(tl);
    // Idle timelines just wait in the set.
    eng.tick(clock.advance(millis(16.0)));
    assert_eq!(eng.active_count(), 1);
    assert!(sink.value("box", "x").is_none());

    eng.get_mut::<Timeline>(id).unwrap().play();
    eng.tick(clock.advance(millis(16.0)));
    assert!(eng.get::<Timeline>(id).unwrap().transport().is_playing());
    assert!(sink.value("box", "x").is_some());

    // Typed access with the wrong type misses.
    assert!(eng.get::<Tween>(id).is_none());
}

/// it should estimate FPS from the sliding frame-delta window
#[test]
fn stats_report_fps() {
    let mut clock = ManualClock::new();
    let (mut eng, _sink) = engine_with_sink();
    eng.add(x_tween("box", 10.0));

    for _ in 0..30 {
        eng.tick(clock.advance(millis(16.0)));
    }
    let stats = eng.stats();
    assert!(stats.is_running);
    assert_eq!(stats.active_count, 1);
    assert_abs_diff_eq!(stats.fps, 62.5, epsilon = 0.5);

    let json = serde_json::to_string(&stats).unwrap();
    assert!(json.contains("active_count"));
}

/// it should empty the set and stop immediately on clear
#[test]
fn clear_stops_immediately() {
    let mut clock = ManualClock::new();
    let (mut eng, _sink) = engine_with_sink();
    eng.add(x_tween("a", 1.0));
    eng.add(x_tween("b", 1.0));
    eng.tick(clock.advance(millis(16.0)));

    eng.clear();
    assert_eq!(eng.active_count(), 0);
    assert!(!eng.is_running());
}

/// it should expose a per-thread default engine as a convenience
#[test]
fn default_engine_convenience() {
    let id = Engine::with_default(|eng| eng.add(x_tween("box", 0.2)));
    Engine::with_default(|eng| {
        assert!(eng.is_running());
        assert!(eng.cancel(id));
        eng.clear();
    });
}
