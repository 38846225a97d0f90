use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use memorydb_storage::{Db, StoreConfig, Value};

fn bench_set_get_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_get_sequential_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                for i in 0..10_000 {
                    let key = format!("key:{i}");
                    db.set(key.clone(), Value::Text(format!("value:{i}")), None);
                    black_box(db.get(&key).unwrap());
                }
            });
        })
    });
}

fn bench_set_concurrent(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_concurrent_4_tasks_10k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                let mut handles = Vec::new();

                for t in 0..4 {
                    let db = db.clone();
                    handles.push(tokio::spawn(async move {
                        for i in 0..2_500 {
                            db.set(format!("key:{t}:{i}"), Value::from("v"), None);
                        }
                    }));
                }

                for h in handles {
                    h.await.unwrap();
                }
            });
        })
    });
}

fn bench_list_operations(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("push_pop_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let db = Db::new();
                db.set("list".into(), Value::List(Vec::new()), None);
                for i in 0..1_000 {
                    db.push("list", format!("item:{i}"), None).unwrap();
                }
                for _ in 0..1_000 {
                    black_box(db.pop("list").unwrap());
                }
            });
        })
    });
}

fn bench_set_persisted(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("set_persisted_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let dir = tempfile::tempdir().unwrap();
                let config = StoreConfig::default()
                    .with_cleanup_interval(Duration::from_secs(60))
                    .with_persistence_dir(dir.path());
                let db = Db::open(config).await.unwrap();
                for i in 0..1_000 {
                    db.set(format!("key:{i}"), Value::from("v"), None);
                }
                db.close();
            });
        })
    });
}

criterion_group!(
    benches,
    bench_set_get_sequential,
    bench_set_concurrent,
    bench_list_operations,
    bench_set_persisted,
);
criterion_main!(benches);
