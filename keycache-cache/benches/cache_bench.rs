//! Criterion benchmarks for the key cache hit path under both strategies.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use keycache_cache::KeyCache;
use keycache_core::{CacheStrategy, KeyEntry, KeyMaterial, KeyType};

const KEYS: usize = 1024;

fn seeded(strategy: CacheStrategy) -> KeyCache {
    let cache = KeyCache::with_strategy(strategy);
    for i in 0..KEYS {
        let name = format!("key-{}", i);
        let entry = KeyEntry::new(
            name.clone(),
            KeyType::Aes256Gcm96,
            KeyMaterial::from_bytes(&[0u8; 32]),
        );
        cache.put(name, Arc::new(entry));
    }
    cache
}

fn bench_get_hit(c: &mut Criterion) {
    let names: Vec<String> = (0..KEYS).map(|i| format!("key-{}", i)).collect();
    let syncmap = seeded(CacheStrategy::Unbounded);
    let lru = seeded(CacheStrategy::bounded(KEYS).unwrap());

    let mut g = c.benchmark_group("get_hit");
    g.throughput(Throughput::Elements(1));
    g.bench_function("syncmap", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(syncmap.get(&names[i]))
        });
    });
    g.bench_function("lru", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(lru.get(&names[i]))
        });
    });
    g.finish();
}

fn bench_switch(c: &mut Criterion) {
    let cache = KeyCache::new();
    let mut g = c.benchmark_group("switch");
    g.bench_function("switch_strategy", |b| {
        b.iter(|| cache.switch_strategy(black_box(CacheStrategy::Unbounded)));
    });
    g.finish();
}

criterion_group!(benches, bench_get_hit, bench_switch);
criterion_main!(benches);
