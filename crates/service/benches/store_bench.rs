use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

use service::open_store;

fn bench_add_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dir = std::env::temp_dir().join(format!("store_bench_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let urls = [
        ("memory", "memory://".to_string()),
        ("json", dir.join("services.json").to_string_lossy().into_owned()),
        ("sqlite", dir.join("services.db").to_string_lossy().into_owned()),
        ("parquet", dir.join("services.parquet").to_string_lossy().into_owned()),
    ];

    for (name, url) in urls {
        let store = rt.block_on(open_store(&url)).unwrap();
        // 预置 100 条记录，模拟非空快照的读写成本
        for i in 0..100 {
            rt.block_on(store.add("seed", json!({"title": format!("seed-{i}")}))).unwrap();
        }

        c.bench_function(&format!("store_add_update_{name}"), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let id = store.add("bench", json!({"title": "bench", "enabled": true})).await.unwrap();
                    store.update("bench", &id, json!({"enabled": false})).await.unwrap();
                })
            });
        });
    }

    let _ = std::fs::remove_dir_all(&dir);
}

criterion_group!(benches, bench_add_update);
criterion_main!(benches);
