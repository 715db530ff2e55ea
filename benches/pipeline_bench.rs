// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Benchmarks for the ingestion hot path.
//!
//! Measures:
//! - Line decoding for both record layouts
//! - Decode plus sector accumulation over a full sweep
//! - PCD frame parsing at typical LiDAR frame sizes
//! - Queue push/drain under overflow
//!
//! Run with: cargo bench --bench pipeline_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use edgefirst_radarstream::{
    decoder::{RecordFormat, decode_line},
    lidar::Points,
    pcd::{encode_frame, parse_frame},
    queue::{OverflowPolicy, bounded},
    sector::SectorAccumulator,
};
use std::hint::black_box;

/// One sweep of CSV lines, `spokes` returns of `samples` each.
fn generate_sweep(spokes: usize, samples: usize) -> Vec<String> {
    (0..spokes)
        .map(|i| {
            let azimuth = i as f32 * 360.0 / spokes as f32;
            let mut line = format!("{:.4},1852.0,{}", azimuth, 1_737_687_682_000i64 + i as i64);
            for s in 0..samples {
                line.push(',');
                line.push_str(&((s * 7 + i) % 256).to_string());
            }
            line
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_line");

    for &samples in &[256, 1024] {
        let csv = generate_sweep(1, samples).remove(0);
        let whitespace = csv.replace(',', " ");

        group.throughput(Throughput::Bytes(csv.len() as u64));
        group.bench_with_input(BenchmarkId::new("csv", samples), &csv, |b, line| {
            b.iter(|| decode_line(black_box(line), RecordFormat::Csv))
        });
        group.bench_with_input(
            BenchmarkId::new("whitespace", samples),
            &whitespace,
            |b, line| b.iter(|| decode_line(black_box(line), RecordFormat::Whitespace)),
        );
    }

    group.finish();
}

/// Full sweep: decode every line and accumulate into sectors.
fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    // Spokes per rotation for typical marine radar configurations
    for &spokes in &[1024, 2048, 4096] {
        let lines = generate_sweep(spokes, 512);

        group.throughput(Throughput::Elements(spokes as u64));
        group.bench_with_input(BenchmarkId::new("spokes", spokes), &lines, |b, lines| {
            let mut acc = SectorAccumulator::new();
            b.iter(|| {
                let mut frames = 0;
                for line in lines {
                    if let Ok(Some(ret)) = decode_line(line, RecordFormat::Csv) {
                        if acc.push(ret).is_some() {
                            frames += 1;
                        }
                    }
                }
                if acc.finish().is_some() {
                    frames += 1;
                }
                frames
            });
        });
    }

    group.finish();
}

fn bench_pcd(c: &mut Criterion) {
    let mut group = c.benchmark_group("pcd_parse");

    // Small scene, E1R typical, Ouster 1024x64
    for &n_points in &[10_000, 26_000, 65_536] {
        let mut points = Points::with_capacity(n_points);
        for i in 0..n_points {
            let f = i as f32;
            points.push((f * 0.01).sin() * 10.0, (f * 0.02).cos() * 10.0, (f * 0.005) % 5.0, f % 256.0);
        }
        let bytes = encode_frame(&points);

        group.throughput(Throughput::Elements(n_points as u64));
        group.bench_with_input(BenchmarkId::new("points", n_points), &bytes, |b, bytes| {
            b.iter(|| parse_frame(black_box(bytes), 0))
        });
    }

    group.finish();
}

/// Producer far ahead of the consumer: most pushes overflow.
fn bench_queue_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    for policy in [OverflowPolicy::DropNewest, OverflowPolicy::DropOldest] {
        group.bench_function(policy.to_string(), |b| {
            let (tx, rx) = bounded::<u64>("bench", 36, policy).unwrap();
            b.iter(|| {
                for i in 0..360 {
                    tx.push(black_box(i));
                }
                rx.drain().len()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_sweep,
    bench_pcd,
    bench_queue_overflow,
);
criterion_main!(benches);
