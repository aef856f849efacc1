use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use motus::{
    AnimationTime, Easing, Engine, EngineConfig, MemorySink, PropertySpec, PropertyValue, Tween,
    TweenOptions,
};

fn populated_engine(tweens: usize) -> Engine {
    let mut engine = Engine::new(EngineConfig::default(), MemorySink::new());
    for i in 0..tweens {
        let tween = Tween::new(
            format!("node-{i}"),
            vec![PropertySpec::from_to(
                "x",
                PropertyValue::number(0.0),
                PropertyValue::number(100.0),
            )],
            TweenOptions {
                duration: AnimationTime::from_seconds(10.0).unwrap(),
                easing: Easing::CubicInOut,
                repeat: -1,
                ..Default::default()
            },
        )
        .unwrap();
        engine.add(tween);
    }
    engine
}

fn bench_engine_tick(c: &mut Criterion) {
    for count in [10usize, 100, 1000] {
        c.bench_function(&format!("tick_{count}_tweens"), |b| {
            let mut engine = populated_engine(count);
            let mut now = AnimationTime::zero();
            let step = AnimationTime::from_millis(16.0).unwrap();
            b.iter(|| {
                now += step;
                engine.tick(black_box(now));
            });
        });
    }
}

criterion_group!(benches, bench_engine_tick);
criterion_main!(benches);
