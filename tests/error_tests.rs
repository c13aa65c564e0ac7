use colcalc::{ColumnEngine, EngineConfig, ExecError, ExecutionPath, FailureLogging, FnError, FnResult, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn timeout_fails_and_is_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut engine = ColumnEngine::new();
    let counter = calls.clone();
    engine
        .register_async("never", move |_args| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<FnResult>()
        })
        .unwrap();

    let first = engine.execute("never", vec![Value::from(1)], TIMEOUT, None).await;
    match first.error() {
        Some(ExecError::Timeout { function, timeout }) => {
            assert_eq!(function, "never");
            assert_eq!(*timeout, TIMEOUT);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert!(first.execution_time >= TIMEOUT);

    let second = engine.execute("never", vec![Value::from(1)], TIMEOUT, None).await;
    assert!(matches!(second.error(), Some(ExecError::Timeout { .. })));
    assert_eq!(second.path, ExecutionPath::Computed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = engine.stats();
    assert_eq!(stats.result_entries, 0);
    assert_eq!(stats.timeouts, 2);
    assert_eq!(stats.failures, 2);
    assert_eq!(stats.invocations, 2);
}

#[tokio::test(start_paused = true)]
async fn async_function_finishing_in_time_succeeds() {
    let mut engine = ColumnEngine::new();
    engine
        .register_async("lookup_rate", |args: Vec<Value>| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, FnError>(Value::from(args[0].to_number() * 1.1))
        })
        .unwrap();

    let out = engine.execute("lookup_rate", vec![Value::from(10)], TIMEOUT, None).await;
    assert!(out.is_success(), "{:?}", out.error());
    assert!((out.result().and_then(Value::as_f64).unwrap() - 11.0).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_function_is_reported() {
    let engine = ColumnEngine::new();
    let out = engine.execute("no_such_fn", vec![], TIMEOUT, None).await;
    // nothing ran
    assert_eq!(engine.stats().invocations, 0);
    assert_eq!(engine.stats().failures, 1);
    assert_eq!(
        out.error(),
        Some(&ExecError::FunctionNotFound { function: "no_such_fn".into() })
    );
    assert_eq!(out.error_message().as_deref(), Some("function not found: no_such_fn"));
}

#[tokio::test]
async fn declared_function_is_not_callable() {
    let mut engine = ColumnEngine::new();
    engine.declare("payment_plan").unwrap();
    let out = engine.execute("payment_plan", vec![], TIMEOUT, None).await;
    assert_eq!(out.error(), Some(&ExecError::NotCallable { function: "payment_plan".into() }));
}

#[tokio::test]
async fn thrown_errors_carry_the_message_and_are_retried() {
    let _ = env_logger::builder().is_test(true).try_init();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut engine =
        ColumnEngine::with_config(EngineConfig::default().with_failure_logging(FailureLogging::Verbose));
    let counter = calls.clone();
    engine
        .register_sync("fx", move |_args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(FnError::from("exchange rate not loaded"))
        })
        .unwrap();

    let first = engine.execute("fx", vec![Value::from("EUR")], TIMEOUT, None).await;
    assert_eq!(first.error_message().as_deref(), Some("exchange rate not loaded"));
    assert_eq!(first.error().map(ExecError::function), Some("fx"));

    engine.execute("fx", vec![Value::from("EUR")], TIMEOUT, None).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(engine.stats().result_entries, 0);
}

#[tokio::test]
async fn panics_become_failures() {
    let mut engine = ColumnEngine::new();
    engine
        .register_sync("boom", |_args| -> FnResult { panic!("boom: bad row") })
        .unwrap();
    engine
        .register_async("async_boom", |_args: Vec<Value>| async move {
            if true {
                panic!("async boom");
            }
            Ok::<_, FnError>(Value::Null)
        })
        .unwrap();

    let sync = engine.execute("boom", vec![], TIMEOUT, None).await;
    assert!(matches!(sync.error(), Some(ExecError::Threw { message, .. }) if message.contains("bad row")));

    let not_async = engine.execute("async_boom", vec![], TIMEOUT, None).await;
    assert!(matches!(not_async.error(), Some(ExecError::Threw { message, .. }) if message == "async boom"));
}

#[test]
fn error_display() {
    let err = ExecError::Timeout { function: "slow".into(), timeout: Duration::from_millis(250) };
    assert_eq!(err.to_string(), "function slow timed out after 250ms");
    let err = ExecError::Threw { function: "f".into(), message: "nope".into() };
    assert_eq!(err.to_string(), "nope");

    let err = FnError::new(format_args!("rate {} missing", "EUR"));
    assert_eq!(err.to_string(), "rate EUR missing");
    assert_eq!(err.message(), "rate EUR missing");
    let boxed: Box<dyn std::error::Error> = Box::new(FnError::from("x"));
    assert_eq!(boxed.to_string(), "x");
}
