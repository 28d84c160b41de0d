use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use urbanflow_core::{classify, HistoryBook, Reading, RollingHistory};

/// Benchmark classification (hot path, once per reading)
fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| classify(black_box(1.37)));
    });
}

/// Benchmark pushing into a full rolling buffer
fn bench_rolling_push(c: &mut Criterion) {
    let mut history = RollingHistory::new(20);
    for i in 0..20 {
        history.push(i as f64);
    }

    c.bench_function("rolling_push_full", |b| {
        b.iter(|| history.push(black_box(42.0)));
    });
}

/// Benchmark recording a reading with varying sensor counts
fn bench_history_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_record");

    for sensors in [6usize, 100, 1000].iter() {
        let readings: Vec<Reading> = (0..*sensors)
            .map(|i| Reading {
                sensor_id: format!("S{:04}", i),
                timestamp: Utc::now(),
                avg_speed: 50.0,
                vehicle_count: 12,
                congestion_index: 0.6,
                speed_limit: 80.0,
            })
            .collect();
        let mut book = HistoryBook::default();

        group.bench_with_input(BenchmarkId::from_parameter(sensors), &readings, |b, readings| {
            b.iter(|| {
                for reading in readings {
                    black_box(book.record(reading));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_rolling_push, bench_history_record);
criterion_main!(benches);
