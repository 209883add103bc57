use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use larder::app::{app_persist_config, app_store_builder, AppPatch};
use larder::persist::{MemoryStorage, StateStorage};
use larder::store::DevtoolsConfig;
use larder::{AppConfig, AppState, AppStore, BuildMode, State, Store, Update};

#[derive(Clone, Debug)]
struct Counter {
    counter: usize,
}

impl State for Counter {
    type Patch = usize;

    fn merge(&mut self, counter: usize) {
        self.counter = counter;
    }
}

fn counter_store() -> Store<Counter> {
    Store::builder(|_| Counter { counter: 0 })
        .devtools(DevtoolsConfig::default().enabled(false))
        .build()
}

fn store_update_benchmark(c: &mut Criterion) {
    let store = counter_store();

    c.bench_function("store_update", |b| {
        let mut i = 0;
        b.iter(|| {
            store.update(|state| {
                state.counter = black_box(i);
            });
            i += 1;
        });
    });
}

fn store_merge_benchmark(c: &mut Criterion) {
    let store = counter_store();

    c.bench_function("store_merge", |b| {
        let mut i = 0;
        b.iter(|| {
            store.set_state(Update::merge(black_box(i)));
            i += 1;
        });
    });
}

fn store_subscribe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_subscribe");

    for subscriber_count in [1, 10, 100].iter() {
        let store = counter_store();

        for _ in 0..*subscriber_count {
            store
                .subscribe(|state: &Counter| state.counter, |_, _| {
                    // Empty subscriber
                })
                .detach();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            subscriber_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    store.update(|state| state.counter = black_box(i));
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn persisted_update_benchmark(c: &mut Criterion) {
    let storage: Arc<dyn StateStorage> = Arc::new(MemoryStorage::new());
    let config = AppConfig::new("bench").unwrap().mode(BuildMode::Production);
    let restorer = Arc::new(|_: &AppStore| {});
    let store = app_store_builder(&config, restorer.clone())
        .persist(app_persist_config(&config, restorer).storage(storage))
        .build();

    c.bench_function("persisted_update", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set_state(Update::merge(AppPatch {
                username: Some(Some(format!("user-{}", black_box(i)))),
                ..AppPatch::default()
            }));
            i += 1;
        });
    });

    black_box(store.get_state() == AppState::default());
}

criterion_group!(
    benches,
    store_update_benchmark,
    store_merge_benchmark,
    store_subscribe_benchmark,
    persisted_update_benchmark,
);
criterion_main!(benches);
