use colcalc::{CellKey, ColumnEngine, FnError, Value, DEFAULT_TIMEOUT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn engine_is_send_and_sync() {
    assert_send_sync::<ColumnEngine>();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_engine_serves_concurrent_tasks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut engine = ColumnEngine::new();
    let counter = calls.clone();
    engine
        .register_sync("mul", move |args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, FnError>(Value::from(args.iter().map(Value::to_number).product::<f64>()))
        })
        .unwrap();

    // Wrap the engine in an Arc to share it across tasks.
    let shared = Arc::new(engine);
    let mut handles = vec![];

    for i in 0..10 {
        let engine = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            let cell = CellKey::new(format!("r{i}"), "product");
            let args = vec![Value::from(i), Value::from(2)];
            for _ in 0..100 {
                let out = engine.execute("mul", args.clone(), DEFAULT_TIMEOUT, Some(&cell)).await;
                assert_eq!(out.result(), Some(&Value::from(i * 2)));
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    // concurrent misses may race, but each distinct key is computed at least once
    assert!(calls.load(Ordering::SeqCst) >= 10);
    assert_eq!(shared.stats().result_entries, 10);
}
