//! Placement ring benchmarks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strand_rt::ring::HashRing;
use strand_rt::util::SiloId;

fn bench_ring_lookup(c: &mut Criterion) {
    let ring = HashRing::new();
    for i in 0..10 {
        ring.add_node(&SiloId::new(format!("silo-{i}")));
    }
    let ids: Vec<String> = (0..1024).map(|i| format!("actor-{i}")).collect();

    c.bench_function("ring_lookup_10_silos", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % ids.len();
            ring.get_node(black_box("Counter"), black_box(&ids[i]))
        })
    });
}

fn bench_ring_membership_change(c: &mut Criterion) {
    c.bench_function("ring_add_remove_silo", |b| {
        let ring = HashRing::new();
        for i in 0..10 {
            ring.add_node(&SiloId::new(format!("silo-{i}")));
        }
        let joiner = SiloId::new("silo-joiner");
        b.iter(|| {
            ring.add_node(black_box(&joiner));
            ring.remove_node(black_box(&joiner));
        })
    });
}

criterion_group!(benches, bench_ring_lookup, bench_ring_membership_change);
criterion_main!(benches);
