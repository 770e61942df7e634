use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smokewatch_types::{Reading, Window};

/// Benchmark observe on a full window (evicts on every call)
fn bench_observe_full(c: &mut Criterion) {
    let mut window = Window::new();
    for _ in 0..20 {
        window.observe(150.0);
    }

    c.bench_function("observe_full", |b| {
        b.iter(|| {
            let state = window.observe(black_box(150.3));
            black_box(state.is_stalled())
        });
    });
}

/// Benchmark decode followed by observe (the per-message hot path)
fn bench_decode_and_observe(c: &mut Criterion) {
    let mut window = Window::new();
    let payload = b"05/29/24 14:00:00, 150.2";

    c.bench_function("decode_and_observe", |b| {
        b.iter(|| {
            let reading = Reading::decode(black_box(payload)).unwrap();
            black_box(window.observe(reading.temperature))
        });
    });
}

criterion_group!(benches, bench_observe_full, bench_decode_and_observe);
criterion_main!(benches);
