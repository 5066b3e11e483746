//! Performance benchmarks for report classification and dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gpsd_watch::{decode, peek_class, FilterRegistry, TpvReport};

const TPV: &[u8] = br#"{"class":"TPV","device":"/dev/ttyUSB0","mode":3,"time":"2024-03-01T12:00:00.000Z","ept":0.005,"lat":45.81,"lon":15.98,"alt":124.5,"epx":3.2,"epy":4.1,"epv":9.8,"track":10.3,"speed":0.091,"climb":-0.085}"#;

fn sky_line(satellites: usize) -> Vec<u8> {
    let sats: Vec<String> = (0..satellites)
        .map(|i| format!(r#"{{"PRN":{},"el":{},"az":{},"ss":{},"used":{}}}"#, i + 1, i * 3 % 90, i * 17 % 360, 20 + i % 30, i % 2 == 0))
        .collect();
    format!(
        r#"{{"class":"SKY","device":"/dev/ttyUSB0","hdop":0.9,"pdop":1.6,"satellites":[{}]}}"#,
        sats.join(",")
    )
    .into_bytes()
}

/// Benchmark the class-only peek against a full decode
fn bench_peek_vs_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("tpv");

    group.bench_function("peek_class", |b| {
        b.iter(|| black_box(peek_class(black_box(TPV)).unwrap()));
    });

    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode("TPV", black_box(TPV)).unwrap()));
    });

    group.finish();
}

/// Benchmark SKY decoding with growing satellite lists
fn bench_sky_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sky_decode");

    for satellites in [4, 12, 32] {
        let line = sky_line(satellites);
        group.bench_with_input(BenchmarkId::new("satellites", satellites), &line, |b, line| {
            b.iter(|| black_box(decode("SKY", black_box(line)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark dispatch fan-out
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let report = decode("TPV", TPV).unwrap();

    for filters in [1, 8, 64] {
        let registry = FilterRegistry::new();
        for _ in 0..filters {
            registry.add_report_filter(|tpv: &TpvReport| {
                black_box(tpv.lat);
            });
        }

        group.bench_with_input(BenchmarkId::new("filters", filters), &registry, |b, registry| {
            b.iter(|| black_box(registry.dispatch("TPV", &report)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_peek_vs_decode, bench_sky_decode, bench_dispatch);
criterion_main!(benches);
