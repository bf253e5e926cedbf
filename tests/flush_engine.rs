mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use varanus::{Engine, Level, LevelFilter, MonitorError, Options, Settings};

use common::{at, ms, names, RecordingSink};

// ─── Delivery / recovery ─────────────────────────────────────────

#[test]
fn test_no_loss_when_sink_fails_synchronously() {
    let sink = RecordingSink::failing_first(1);
    let engine = Engine::new();
    engine.configure(Options::new(sink.clone())).unwrap();
    let monitor = engine.new_monitor("svc");

    monitor.log_time(Level::Info, "a", at(0), at(42));
    engine.flush();
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.attempt(0).len(), 1);
    assert_eq!(engine.pending(), 1);

    monitor.log_time(Level::Info, "b", at(0), at(50));
    engine.flush();
    assert_eq!(sink.calls(), 2);
    let batch = sink.attempt(1);
    assert_eq!(names(&batch), vec!["a", "b"]);
    assert_eq!(batch[0].time, ms(42));
    assert_eq!(batch[1].time, ms(50));
    assert_eq!(engine.pending(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_loss_when_pending_delivery_rejects() {
    let sink = RecordingSink::failing_first(1).asynchronous();
    let engine = Engine::new();
    engine.configure(Options::new(sink.clone())).unwrap();
    let monitor = engine.new_monitor("svc");

    monitor.log_time(Level::Info, "a", at(0), at(42));
    engine.flush();
    assert_eq!(sink.calls(), 1);

    monitor.log_time(Level::Info, "b", at(0), at(50));
    // Let the rejected delivery settle and re-buffer
    tokio::time::sleep(ms(1)).await;
    assert_eq!(engine.pending(), 2);

    engine.flush();
    tokio::time::sleep(ms(1)).await;
    assert_eq!(sink.calls(), 2);
    assert_eq!(names(&sink.attempt(1)), vec!["a", "b"]);
    assert_eq!(names(&sink.delivered()), vec!["a", "b"]);
    assert_eq!(engine.pending(), 0);
}

#[test]
fn test_every_record_delivered_once_in_order() {
    for seed in [1u64, 7, 42, 1234] {
        let mut rng = StdRng::seed_from_u64(seed);
        let sink = RecordingSink::new();
        let engine = Engine::new();
        engine.configure(Options::new(sink.clone())).unwrap();
        let monitor = engine.new_monitor("svc");

        let mut pushed = Vec::new();
        for i in 0..500 {
            if rng.gen_bool(0.8) {
                let name = format!("op{i}");
                monitor.log_time(Level::Info, &name, at(0), at(1));
                pushed.push(name);
            } else {
                sink.set_failing(rng.gen_bool(0.5));
                engine.flush();
            }
        }
        sink.set_failing(false);
        engine.flush();

        assert_eq!(names(&sink.delivered()), pushed, "seed {seed}");
        assert_eq!(engine.pending(), 0);
    }
}

// ─── Size-triggered flush ────────────────────────────────────────

#[test]
fn test_below_threshold_does_not_flush() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).max_buffer_size(2))
        .unwrap();

    engine
        .new_monitor("svc")
        .log_time(Level::Info, "testService1", at(0), at(42));
    assert_eq!(sink.calls(), 0);
}

#[test]
fn test_reaching_threshold_flushes_once() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).max_buffer_size(2))
        .unwrap();
    let monitor = engine.new_monitor("svc");

    monitor.log_time(Level::Info, "testService1", at(0), at(42));
    monitor.log_time(Level::Info, "testService2", at(0), at(50));
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.attempt(0).len(), 2);
}

// ─── Levels ──────────────────────────────────────────────────────

#[test]
fn test_log_time_below_threshold_is_dropped() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).level(LevelFilter::Debug))
        .unwrap();
    let monitor = engine.new_monitor("svc");

    monitor.log_time(Level::Trace, "testService1", at(0), at(42));
    monitor.log_time(Level::Debug, "testService2", at(0), at(43));
    monitor.log_time(Level::Info, "testService3", at(0), at(44));
    engine.flush();

    assert_eq!(sink.calls(), 1);
    assert_eq!(names(&sink.attempt(0)), vec!["testService2", "testService3"]);
}

fn fn1() {}
fn fn2() {}
fn fn3() {}

#[test]
fn test_wrapped_calls_below_threshold_are_dropped() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).level(LevelFilter::Debug))
        .unwrap();
    let monitor = engine.new_monitor("svc");

    let fn1 = monitor.trace(fn1);
    let fn2 = monitor.debug(fn2);
    let fn3 = monitor.info(fn3);
    fn1.call(());
    fn2.call(());
    fn3.call(());
    engine.flush();

    assert_eq!(sink.calls(), 1);
    assert_eq!(names(&sink.attempt(0)), vec!["fn2", "fn3"]);
}

#[test]
fn test_disabled_wrapper_is_transparent() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).level(LevelFilter::Off))
        .unwrap();

    let foo_sync = engine.new_monitor("svc").info(|| "blah");
    assert_eq!(foo_sync.call(()), "blah");
    engine.flush();
    assert_eq!(sink.calls(), 0);
}

#[test]
fn test_level_changes_apply_immediately() {
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::new(sink.clone()).level(LevelFilter::Off))
        .unwrap();
    let monitor = engine.new_monitor("fooService");

    monitor.log_time(Level::Info, "testFn", at(0), at(42));
    engine.flush();
    assert_eq!(sink.calls(), 0);

    engine.set_level("info").unwrap();
    monitor.log_time(Level::Info, "testFn", at(0), at(42));
    engine.flush();
    assert_eq!(sink.calls(), 1);

    engine.set_level("off").unwrap();
    monitor.log_time(Level::Info, "testFn", at(0), at(42));
    engine.flush();
    assert_eq!(sink.calls(), 1);
}

#[test]
fn test_invalid_level_label_is_rejected() {
    let engine = Engine::new();
    let err = engine.set_level("chatty").unwrap_err();
    assert!(matches!(err, MonitorError::InvalidLevel(_)));
    assert_eq!(engine.level(), LevelFilter::Info);
}

// ─── Lifecycle ───────────────────────────────────────────────────

#[test]
fn test_records_before_configure_are_kept() {
    let engine = Engine::new();
    let monitor = engine.new_monitor("early");
    monitor.log_time(Level::Info, "boot", at(0), at(5));

    engine.flush(); // not configured: warns, keeps the record
    assert_eq!(engine.pending(), 1);

    let sink = RecordingSink::new();
    engine.configure(Options::new(sink.clone())).unwrap();
    engine.flush();
    assert_eq!(names(&sink.delivered()), vec!["boot"]);
}

#[test]
fn test_configure_without_sink_fails() {
    let engine = Engine::new();
    let err = engine.configure(Options::default()).unwrap_err();
    assert!(matches!(err, MonitorError::Configuration(_)));
}

#[test]
fn test_configure_from_json_settings() {
    let settings =
        Settings::from_json(r#"{"level": "debug", "max_buffer_size": 2, "capture_errors": false}"#)
            .unwrap();
    let sink = RecordingSink::new();
    let engine = Engine::new();
    engine
        .configure(Options::from_settings(settings).sink(sink.clone()))
        .unwrap();
    assert_eq!(engine.level(), LevelFilter::Debug);

    let monitor = engine.new_monitor("svc");
    monitor.log_time(Level::Trace, "hidden", at(0), at(1));
    monitor.log_time(Level::Debug, "a", at(0), at(1));
    assert_eq!(sink.calls(), 0);
    monitor.log_time(Level::Debug, "b", at(0), at(1));
    assert_eq!(sink.calls(), 1);
    assert_eq!(names(&sink.attempt(0)), vec!["a", "b"]);
}
