//! Grid snapping and throw dispatch throughput.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blast_arena::{
    quantize, ActionReplicator, ActorId, Character, CharacterConfig, GridConfig, Role, Vec3,
};

fn bench_quantize(c: &mut Criterion) {
    let inputs: Vec<f32> = (0..1024).map(|i| (i as f32 - 512.0) * 13.7).collect();

    c.bench_function("quantize_1024", |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for &a in &inputs {
                acc += quantize(black_box(a)) as i64;
            }
            acc
        })
    });

    let grid = GridConfig::default();
    c.bench_function("spawn_point", |b| {
        b.iter(|| grid.spawn_point(black_box(Vec3::new(149.0, -250.0, 96.0)), 60.0))
    });
}

fn bench_trigger(c: &mut Criterion) {
    let replicator = ActionReplicator::default();
    let character = match Character::new(ActorId::new([1; 16]), Vec3::new(320.0, 480.0, 60.0), &CharacterConfig::default()) {
        Ok(character) => character,
        Err(e) => panic!("default roster rejected: {}", e),
    };

    c.bench_function("trigger_authoritative", |b| {
        b.iter(|| replicator.trigger(black_box(Role::Authoritative), &character))
    });
    c.bench_function("trigger_remote", |b| {
        b.iter(|| replicator.trigger(black_box(Role::Remote), &character))
    });
}

criterion_group!(benches, bench_quantize, bench_trigger);
criterion_main!(benches);
