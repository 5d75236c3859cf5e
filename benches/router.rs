use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use learned_router::{Interpolation, LearnedRouter, LeafStore, RouterConfig, StoreConfig, make_key};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const KEY_SPACE: u64 = 1_000_000;

// Store preloaded with sequential keys plus a router trained over its leaves
fn setup(keys: u64, leaf_capacity: usize) -> (LeafStore, LearnedRouter<learned_router::LeafId>) {
    let mut store = LeafStore::new(StoreConfig {
        leaf_capacity,
        ..Default::default()
    })
    .expect("valid store config");
    for i in 0..keys {
        store.insert(make_key(i).as_bytes(), b"value").expect("insert");
    }

    let mut router = LearnedRouter::new(RouterConfig::default());
    router.harvest(&store);
    router.train();
    (store, router)
}

fn random_keys(n: usize, max: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| make_key(rng.gen_range(0..max))).collect()
}

// Raw model cost: interpolation against binary search
fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");
    group.measurement_time(Duration::from_secs(5));

    for leaves in [1_000usize, 100_000] {
        let mut rng = StdRng::seed_from_u64(7);
        let spacing = KEY_SPACE / leaves as u64;

        for (name, interpolation) in [("anchored", Interpolation::Anchored), ("proportional", Interpolation::Proportional)] {
            let mut router = LearnedRouter::new(RouterConfig {
                interpolation,
                ..Default::default()
            });
            for i in 0..leaves {
                router.add_leaf(i as u64 * spacing, i);
            }
            router.train();

            group.bench_with_input(BenchmarkId::new(name, leaves), &leaves, |b, _| {
                b.iter(|| {
                    let q = rng.gen_range(0..KEY_SPACE);
                    black_box(router.predict_leaf(black_box(q)))
                })
            });
        }

        let mut router = LearnedRouter::new(RouterConfig::default());
        for i in 0..leaves {
            router.add_leaf(i as u64 * spacing, i);
        }
        router.train();
        group.bench_with_input(BenchmarkId::new("interval_hit", leaves), &leaves, |b, _| {
            b.iter(|| {
                let q = rng.gen_range(0..KEY_SPACE);
                black_box(router.interval_hit(black_box(q)))
            })
        });
    }

    group.finish();
}

// End-to-end point lookups through the store
fn bench_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookups");
    group.measurement_time(Duration::from_secs(5));

    for preload in [10_000u64, 200_000] {
        let (store, router) = setup(preload, 15);
        let keys = random_keys(10_000, preload);

        group.bench_with_input(BenchmarkId::new("baseline_get", preload), &keys, |b, keys| {
            b.iter(|| {
                let mut found = 0usize;
                for key in keys {
                    found += store.get(key.as_bytes()).is_some() as usize;
                }
                black_box(found)
            })
        });

        group.bench_with_input(BenchmarkId::new("learned_get", preload), &keys, |b, keys| {
            b.iter(|| {
                let mut found = 0usize;
                for key in keys {
                    let hint = router.predict_key(key.as_bytes());
                    found += store.get_hinted(key.as_bytes(), hint).value.is_some() as usize;
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

// Harvest plus training over a populated store
fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(20);

    for preload in [10_000u64, 100_000] {
        let (store, _) = setup(preload, 15);
        group.bench_with_input(BenchmarkId::new("harvest_train", preload), &store, |b, store| {
            b.iter(|| {
                let mut router = LearnedRouter::new(RouterConfig::default());
                router.harvest(store);
                router.train();
                black_box(router.num_samples())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_prediction, bench_lookups, bench_training);
criterion_main!(benches);
