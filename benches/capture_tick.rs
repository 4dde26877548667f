//! Scalability benchmarks for the capture engine
//!
//! Verifies the tick stays cheap with many simultaneous zones, sessions, and
//! a loaded spawn queue.
//!
//! Run with: cargo bench --bench capture_tick

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use territory_server::capture::coordinator::CaptureEngine;
use territory_server::notify::LogSink;
use territory_server::reinforcement::spawner::RecordingSpawner;
use territory_server::util::vec3::Vec3;
use territory_server::zone::constants::paths;
use territory_server::zone::owner::{OwnerKind, StaticOwnerDirectory};
use territory_server::zone::point::{CapturePoint, ZoneShape};

const WORLD: &str = "overworld";

/// Engine with `count` zones, each under an active capture with a live
/// spawn backlog.
fn engine_with_sessions(count: usize) -> CaptureEngine {
    let mut directory = StaticOwnerDirectory::new();
    let actors: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
    for (i, actor) in actors.iter().enumerate() {
        directory.assign(*actor, OwnerKind::Group, format!("Clan{}", i));
    }

    let mut engine = CaptureEngine::new(
        Arc::new(directory),
        Arc::new(RecordingSpawner::new()),
        Arc::new(LogSink),
    );

    for (i, actor) in actors.iter().enumerate() {
        let zone = format!("zone-{}", i);
        let center = Vec3::new(i as f64 * 1000.0, 64.0, i as f64 * 1000.0);
        engine
            .create_point(CapturePoint::new(
                zone.clone(),
                zone.clone(),
                ZoneShape::circle(WORLD, center, 2),
            ))
            .unwrap();
        engine.settings_mut().set_zone_value(&zone, paths::PREPARATION_MINUTES, json!(0));
        // long enough that no session completes mid-benchmark
        engine.settings_mut().set_zone_value(&zone, paths::CAPTURE_MINUTES, json!(1440));
        engine.settings_mut().set_zone_value(&zone, paths::BASE_MOBS_PER_WAVE, json!(6));

        engine.handle_movement(*actor, WORLD, center);
        engine.start_capture(&zone, *actor).unwrap();
    }

    engine
}

fn bench_engine_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_tick");

    for &count in &[10usize, 50, 200] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("sessions", count), &count, |b, &count| {
            let mut engine = engine_with_sessions(count);
            b.iter(|| {
                engine.tick();
                black_box(engine.live_unit_count());
            });
        });
    }

    group.finish();
}

fn bench_movement_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement");

    let mut engine = engine_with_sessions(100);
    let wanderer = Uuid::new_v4();
    let mut step = 0u64;

    group.bench_function("handle_movement_100_zones", |b| {
        b.iter(|| {
            step = step.wrapping_add(17);
            let pos = Vec3::new((step % 100_000) as f64, 64.0, (step % 100_000) as f64);
            engine.handle_movement(black_box(wanderer), WORLD, pos);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_engine_tick, bench_movement_events);
criterion_main!(benches);
