use std::cell::Cell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use motus::{
    Advance, Animate, AnimationTime, Inertia, InertiaOptions, MemorySink, PropertyValue, Spring,
    SpringOptions, Unit,
};

fn millis(ms: f64) -> AnimationTime {
    AnimationTime::from_millis(ms).unwrap()
}

fn number_at(sink: &MemorySink, target: &str, property: &str) -> f32 {
    sink.value(target, property)
        .and_then(|v| v.as_number())
        .unwrap_or_else(|| panic!("no numeric value for {target}.{property}"))
}

/// Drive a solver at a fixed cadence until it reports Finished.
fn run_to_rest(anim: &mut dyn Animate, sink: &mut MemorySink, step_ms: f64, max_ticks: u32) -> u32 {
    let mut now = AnimationTime::zero();
    for tick in 0..max_ticks {
        if anim.advance(now, sink) == Advance::Finished {
            return tick;
        }
        now += millis(step_ms);
    }
    panic!("solver did not settle within {max_ticks} ticks");
}

/// it should converge to the target and snap exactly onto it at rest
#[test]
fn spring_converges_and_snaps() {
    let completed = Rc::new(Cell::new(0u32));
    let completed_probe = Rc::clone(&completed);

    let mut sink = MemorySink::new();
    let mut spring = Spring::new("box", "x", 0.0, 100.0, SpringOptions::default())
        .unwrap()
        .on_complete(move || completed_probe.set(completed_probe.get() + 1));

    let ticks = run_to_rest(&mut spring, &mut sink, 16.0, 2000);
    assert!(ticks > 1, "a spring cannot settle instantly from 100 away");
    assert_eq!(number_at(&sink, "box", "x"), 100.0);
    assert_eq!(spring.position(), 100.0);
    assert_eq!(spring.velocity(), 0.0);
    assert_eq!(completed.get(), 1);
}

/// it should approach monotonically when critically damped
#[test]
fn spring_critically_damped_does_not_overshoot() {
    let peak = Rc::new(Cell::new(f32::MIN));
    let peak_probe = Rc::clone(&peak);

    let mut sink = MemorySink::new();
    // damping = 2 * sqrt(stiffness * mass): damping ratio exactly 1.
    let mut spring = Spring::new(
        "box",
        "x",
        0.0,
        100.0,
        SpringOptions {
            stiffness: 100.0,
            damping: 20.0,
            mass: 1.0,
            ..Default::default()
        },
    )
    .unwrap()
    .on_update(move |position| {
        if position > peak_probe.get() {
            peak_probe.set(position);
        }
    });

    run_to_rest(&mut spring, &mut sink, 16.0, 2000);
    assert!(
        peak.get() <= 100.0 + 1e-3,
        "critically damped spring overshot to {}",
        peak.get()
    );
}

/// it should carry initial velocity and a unit through to the sink
#[test]
fn spring_initial_velocity_and_unit() {
    let mut sink = MemorySink::new();
    let mut spring = Spring::new(
        "box",
        "x",
        0.0,
        50.0,
        SpringOptions {
            velocity: 500.0,
            ..Default::default()
        },
    )
    .unwrap()
    .with_unit(Unit::Px);

    spring.advance(AnimationTime::zero(), &mut sink);
    assert_eq!(
        sink.value("box", "x"),
        Some(&PropertyValue::with_unit(0.0, Unit::Px))
    );

    run_to_rest(&mut spring, &mut sink, 16.0, 2000);
    assert_eq!(
        sink.value("box", "x"),
        Some(&PropertyValue::with_unit(50.0, Unit::Px))
    );
}

/// it should clamp oversized frame gaps to the max integration step
#[test]
fn spring_survives_a_huge_frame_gap() {
    let mut sink = MemorySink::new();
    let mut spring = Spring::new("box", "x", 0.0, 100.0, SpringOptions::default()).unwrap();

    spring.advance(AnimationTime::zero(), &mut sink);
    // A five-second stall: integrated as one clamped 64ms step, so the
    // position stays finite and between the endpoints' neighborhood.
    spring.advance(AnimationTime::from_seconds(5.0).unwrap(), &mut sink);
    let x = number_at(&sink, "box", "x");
    assert!(x.is_finite());
    assert!(x.abs() < 200.0, "unstable step produced {x}");
}

/// it should reflect velocity at a bound scaled by bounce
#[test]
fn inertia_bounce_reflects_velocity() {
    let mut sink = MemorySink::new();
    // No decay, so the pre-collision velocity is exactly the initial one.
    let mut inertia = Inertia::new(
        "list",
        "scroll",
        0.0,
        InertiaOptions {
            velocity: 1000.0,
            friction: 1.0,
            min: Some(0.0),
            max: Some(100.0),
            bounce: 0.5,
            ..Default::default()
        },
    )
    .unwrap();

    let mut now = AnimationTime::zero();
    let mut bounced = false;
    for _ in 0..64 {
        inertia.advance(now, &mut sink);
        if inertia.velocity() < 0.0 {
            bounced = true;
            // Post-collision velocity is exactly -bounce * pre-collision.
            assert_eq!(inertia.velocity(), -500.0);
            // Position clamped onto the bound at the collision tick.
            assert_eq!(number_at(&sink, "list", "scroll"), 100.0);
            break;
        }
        now += millis(16.0);
    }
    assert!(bounced, "inertia never reached the bound");
}

/// it should decay to rest under friction and stop
#[test]
fn inertia_decays_to_rest() {
    let completed = Rc::new(Cell::new(0u32));
    let completed_probe = Rc::clone(&completed);

    let mut sink = MemorySink::new();
    let mut inertia = Inertia::new(
        "list",
        "scroll",
        0.0,
        InertiaOptions {
            velocity: 500.0,
            friction: 0.9,
            ..Default::default()
        },
    )
    .unwrap()
    .on_complete(move || completed_probe.set(completed_probe.get() + 1));

    run_to_rest(&mut inertia, &mut sink, 16.0, 5000);
    assert_eq!(completed.get(), 1);
    assert_eq!(inertia.velocity(), 0.0);
    // It coasted forward and came to rest at a stable position.
    let final_x = number_at(&sink, "list", "scroll");
    assert!(final_x > 0.0);
}

/// it should keep bouncing between bounds until the rest speed is reached
#[test]
fn inertia_bounces_until_rest() {
    let mut sink = MemorySink::new();
    let mut inertia = Inertia::new(
        "list",
        "scroll",
        50.0,
        InertiaOptions {
            velocity: 2000.0,
            friction: 1.0, // only bounces dissipate energy
            min: Some(0.0),
            max: Some(100.0),
            bounce: 0.5,
            rest_speed: 10.0,
            ..Default::default()
        },
    )
    .unwrap();

    run_to_rest(&mut inertia, &mut sink, 16.0, 5000);
    let final_x = number_at(&sink, "list", "scroll");
    assert!((0.0..=100.0).contains(&final_x));
}

/// it should behave identically under different tick cadences (normalized decay)
#[test]
fn inertia_decay_is_frame_rate_normalized() {
    let opts = InertiaOptions {
        velocity: 1000.0,
        friction: 0.9,
        ..Default::default()
    };

    let mut sink_a = MemorySink::new();
    let mut fast = Inertia::new("a", "x", 0.0, opts).unwrap();
    let mut now = AnimationTime::zero();
    for _ in 0..120 {
        fast.advance(now, &mut sink_a);
        now += millis(8.0);
    }

    let mut sink_b = MemorySink::new();
    let mut slow = Inertia::new("b", "x", 0.0, opts).unwrap();
    let mut now = AnimationTime::zero();
    for _ in 0..30 {
        slow.advance(now, &mut sink_b);
        now += millis(32.0);
    }

    // Same elapsed time (~1s) at 8ms vs 32ms cadence: velocities should
    // agree closely because the decay is normalized per second.
    let dv = (fast.velocity() - slow.velocity()).abs();
    assert!(
        dv < 0.15 * 1000.0,
        "cadence changed the felt deceleration: {} vs {}",
        fast.velocity(),
        slow.velocity()
    );
}
