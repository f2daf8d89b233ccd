//! Integration tests for BoundedDispatcher.

mod common;

use common::{ActivityProbe, init_tracing};
use memopool_core::{
    BoundedDispatcher, DispatchConfig, DispatchError, FailurePolicy, MemopoolConfig, TaskError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_outputs_follow_input_order() {
    init_tracing();
    let dispatcher = BoundedDispatcher::new(2).unwrap();

    let out = dispatcher
        .run_all(vec![3_u64, 1, 2], |x| async move {
            // Larger inputs finish later.
            tokio::time::sleep(Duration::from_millis(x * 15)).await;
            Ok::<_, String>(x * 10)
        })
        .await
        .unwrap();

    assert_eq!(out, vec![30, 10, 20]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_pool_size() {
    init_tracing();
    let probe = ActivityProbe::new();
    let dispatcher = BoundedDispatcher::new(3).unwrap();

    let work_probe = Arc::clone(&probe);
    let out = dispatcher
        .run_all((0..20_usize).collect(), move |i| {
            let probe = Arc::clone(&work_probe);
            async move {
                probe.hold(Duration::from_millis(10)).await;
                Ok::<_, String>(i)
            }
        })
        .await
        .unwrap();

    assert_eq!(out, (0..20).collect::<Vec<_>>());
    assert_eq!(probe.started(), 20);
    assert!(probe.peak() <= 3, "peak {} exceeded pool size", probe.peak());
    assert!(probe.peak() >= 2, "work never overlapped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_settled_report_peak_within_bound() {
    let dispatcher = BoundedDispatcher::new(4).unwrap();

    let report = dispatcher
        .run_settled((0..16_u64).collect(), |i| async move {
            tokio::time::sleep(Duration::from_millis(5 + i % 3)).await;
            Ok::<_, String>(i)
        })
        .await;

    assert!(report.is_complete_success());
    assert!(report.peak_active <= 4);
    assert!(report.peak_active >= 1);
}

#[tokio::test]
async fn test_empty_input_never_invokes_work() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = BoundedDispatcher::new(4).unwrap();

    let counter = Arc::clone(&calls);
    let out = dispatcher
        .run_all(Vec::<u32>::new(), move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, String>(x) }
        })
        .await
        .unwrap();

    assert!(out.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let report = dispatcher
        .run_settled(Vec::<u32>::new(), |x| async move { Ok::<_, String>(x) })
        .await;
    assert_eq!(report.total_items(), 0);
}

#[tokio::test]
async fn test_fail_fast_returns_bad_input() {
    init_tracing();
    let dispatcher = BoundedDispatcher::new(2).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.run_all(vec!["1", "2", "bad", "4"], |s| async move {
            s.parse::<i32>().map_err(|e| e.to_string())
        }),
    )
    .await
    .expect("fail-fast dispatch hung");

    match result {
        Err(DispatchError::TaskFailed(failure)) => {
            assert_eq!(failure.index, 2);
            assert_eq!(failure.input, "bad");
            assert_eq!(
                failure.error,
                TaskError::Failed("invalid digit found in string".to_string())
            );
        }
        other => panic!("expected TaskFailed for \"bad\", got {other:?}"),
    }
}

#[tokio::test]
async fn test_fail_fast_with_single_slot_skips_queued_inputs() {
    let started = Arc::new(AtomicUsize::new(0));
    let dispatcher = BoundedDispatcher::new(1).unwrap().with_policy(FailurePolicy::FailFast);

    let counter = Arc::clone(&started);
    let err = dispatcher
        .run_all(vec![1, 2, 3, 4, 5], move |x: u32| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if x == 2 { Err(format!("{x} rejected")) } else { Ok(x) }
            }
        })
        .await
        .unwrap_err();

    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].input, 2);
    assert_eq!(err.to_string(), "task 1 failed for input 2: 2 rejected");
}

#[tokio::test]
async fn test_settled_ignores_fail_fast_policy() {
    let dispatcher = BoundedDispatcher::new(1).unwrap();

    let report = dispatcher
        .run_settled(vec![1_u32, 2, 3], |x| async move {
            if x == 1 { Err("first") } else { Ok(x) }
        })
        .await;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.results[1], Ok(2));
    assert_eq!(report.results[2], Ok(3));
    assert_eq!(report.failures().next().map(|f| f.input), Some(1));
}

#[tokio::test]
async fn test_collect_all_reports_every_failure_in_order() {
    let dispatcher = BoundedDispatcher::new(3).unwrap().with_policy(FailurePolicy::CollectAll);
    let inputs = vec!["10", "x", "30", "y", "50", "z"];
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    let err = dispatcher
        .run_all(inputs, move |s| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                // Stagger completion so it differs from input order.
                tokio::time::sleep(Duration::from_millis(u64::from(s.as_bytes()[0] % 7) * 3)).await;
                s.parse::<u32>().map_err(|e| e.to_string())
            }
        })
        .await
        .unwrap_err();

    assert_eq!(ran.load(Ordering::SeqCst), 6);
    match err {
        DispatchError::TasksFailed { failures, total } => {
            assert_eq!(total, 6);
            let seen: Vec<_> = failures.iter().map(|f| (f.index, f.input)).collect();
            assert_eq!(seen, vec![(1, "x"), (3, "y"), (5, "z")]);
            assert!(failures.iter().all(|f| f.error.as_failed().is_some()));
        }
        other => panic!("expected TasksFailed, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_work_is_reported_and_batch_continues() {
    let dispatcher = BoundedDispatcher::new(2).unwrap().with_policy(FailurePolicy::CollectAll);

    let report = dispatcher
        .run_settled(vec![0_u32, 1, 2, 3], |x| async move {
            if x == 2 {
                panic!("worker {x} crashed");
            }
            Ok::<_, String>(x + 100)
        })
        .await;

    assert_eq!(report.succeeded(), 3);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.index, 2);
    assert_eq!(failure.error, TaskError::Panicked("worker 2 crashed".to_string()));
}

#[tokio::test]
async fn test_dispatcher_from_loaded_config() {
    let config = MemopoolConfig::from_toml_str(
        "[dispatch]\npool_size = 2\nfailure_policy = \"collect-all\"\n",
    )
    .unwrap();
    assert_eq!(
        config.dispatch,
        DispatchConfig { pool_size: 2, failure_policy: FailurePolicy::CollectAll }
    );

    let dispatcher = BoundedDispatcher::from_config(&config.dispatch).unwrap();
    let err = dispatcher
        .run_all(vec![1, 2, 3, 4], |x: i32| async move {
            if x % 2 == 0 { Err(x) } else { Ok(x) }
        })
        .await
        .unwrap_err();
    assert_eq!(err.failures().len(), 2);
}

#[tokio::test]
async fn test_blocking_work_respects_bound() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let dispatcher = BoundedDispatcher::new(2).unwrap();

    let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
    let out = dispatcher
        .run_all_blocking((1..=6_u64).collect(), move |x| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, String>(x * 2)
        })
        .await
        .unwrap();

    assert_eq!(out, vec![2, 4, 6, 8, 10, 12]);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_freed_slot_goes_to_next_unclaimed_input() {
    // One slow input and four fast ones over two slots: the fast inputs should
    // all run on the second slot while the slow one holds the first.
    let finished = Arc::new(std::sync::Mutex::new(Vec::new()));
    let dispatcher = BoundedDispatcher::new(2).unwrap();

    let log = Arc::clone(&finished);
    let start = std::time::Instant::now();
    let out = dispatcher
        .run_all(vec![300_u64, 20, 20, 20, 20], move |ms| {
            let log = Arc::clone(&log);
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                log.lock().unwrap().push(ms);
                Ok::<_, String>(ms)
            }
        })
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(out, vec![300, 20, 20, 20, 20]);
    assert_eq!(*finished.lock().unwrap(), vec![20, 20, 20, 20, 300]);
    assert!(elapsed < Duration::from_millis(500), "batch took {elapsed:?}");
}

#[tokio::test]
async fn test_configured_pool_size_beyond_semaphore_limit() {
    let config =
        MemopoolConfig::from_toml_str("[dispatch]\npool_size = 2305843009213693952\n").unwrap();
    let dispatcher = BoundedDispatcher::from_config(&config.dispatch).unwrap();

    let out = dispatcher
        .run_all(vec![1, 2], |x: u32| async move { Ok::<_, String>(x * 2) })
        .await
        .unwrap();

    assert_eq!(out, vec![2, 4]);
}
