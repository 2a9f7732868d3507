//! End-to-end behavior of the coalescing cache against scripted loaders.

use parking_lot::Mutex;
use rangecache::prelude::*;
use rangecache::{CacheStats, Interval};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Calls = Arc<Mutex<Vec<(i64, i64)>>>;

/// Contiguous integers, the values a well-behaved loader returns for `[start, end]`.
fn contiguous(start: i64, end: i64) -> Vec<i64> {
    (start..=end).collect()
}

fn order() -> PointOrder<i64> {
    PointOrder::new(|a: &i64, b: &i64| a - b)
}

fn int_cache<K, L>(loader: L) -> RangeCache<i64, i64, K>
where
    K: Clone + Hash + Eq + Debug + Send + Sync + 'static,
    L: Loader<i64, i64, K> + 'static,
{
    RangeCache::new(order(), |v: &i64| *v, loader)
}

fn sorted(calls: &Calls) -> Vec<(i64, i64)> {
    let mut calls = calls.lock().clone();
    calls.sort();
    calls
}

// =============================================================================
// Idempotence and coalescing
// =============================================================================

#[tokio::test]
async fn test_identical_requests_share_handle() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _ctx: LoadContext| {
        log.lock().push((start, end));
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    let first = cache.read(1, 4, "k");
    let second = cache.read(1, 4, "k");
    assert!(first.is_pending());
    assert!(second.is_pending());
    assert_eq!(cache.stats().records, 1);

    let (a, b) = tokio::join!(first.into_result(), second.into_result());
    assert_eq!(a.unwrap(), b.unwrap());

    // Settled: served from the record without another loader call
    let again = cache.read_async(1, 4, "k").await.unwrap();
    assert_eq!(again.values(), &[1, 2, 3, 4]);
    assert_eq!(sorted(&calls), vec![(1, 4)]);
}

#[tokio::test]
async fn test_overlapping_requests_split_loads() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _ctx: LoadContext| {
        log.lock().push((start, end));
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    let first = cache.read_async(1, 4, "k");
    let second = cache.read_async(2, 5, "k");
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap().to_vec(), contiguous(1, 4));
    assert_eq!(second.unwrap().to_vec(), contiguous(2, 5));
    assert_eq!(sorted(&calls), vec![(1, 4), (4, 5)]);
    assert_eq!(cache.intervals("k").loaded, vec![Interval::new(1, 5)]);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, key: i64, _ctx: LoadContext| {
        log.lock().push((start, end));
        async move { Ok::<_, LoadError>(contiguous(start + key, end + key)) }
    });

    // Values outside the requested range are kept but not returned
    let zero = cache.read_async(0, 3, 0).await.unwrap();
    let hundred = cache.read_async(0, 3, 100).await.unwrap();
    assert_eq!(zero.to_vec(), contiguous(0, 3));
    assert!(hundred.is_empty());
    assert_eq!(calls.lock().len(), 2);
}

#[tokio::test]
async fn test_gap_between_loaded_ranges_is_only_fetch() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: (), _ctx: LoadContext| {
        log.lock().push((start, end));
        async move { Ok::<_, LoadError>(contiguous(start, end)) }
    });

    cache.read_async(0, 10, ()).await.unwrap();
    cache.read_async(20, 30, ()).await.unwrap();
    let all = cache.read_async(0, 30, ()).await.unwrap();

    assert_eq!(all.to_vec(), contiguous(0, 30));
    assert_eq!(sorted(&calls), vec![(0, 10), (10, 20), (20, 30)]);
}

// =============================================================================
// Partial results
// =============================================================================

#[tokio::test]
async fn test_partial_shrinks_when_narrower_load_completes() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, ctx: LoadContext| {
        let first = {
            let mut calls = log.lock();
            calls.push((start, end));
            calls.len() == 1
        };
        async move {
            let values = contiguous(start, end);
            if first {
                // Pretend a size cap truncated the answer
                return Ok::<_, LoadError>(ctx.partial(values));
            }
            Ok(values)
        }
    });

    let wide = cache.read_async(1, 8, "k").await.unwrap();
    assert!(is_partial_result(&wide));
    assert_eq!(cache.intervals("k").partial, vec![Interval::new(1, 8)]);

    let narrow = cache.read_async(4, 6, "k").await.unwrap();
    assert!(!narrow.is_partial());
    assert_eq!(narrow.to_vec(), contiguous(4, 6));

    let intervals = cache.intervals("k");
    assert_eq!(intervals.partial, vec![Interval::new(1, 4), Interval::new(6, 8)]);
    assert_eq!(intervals.loaded, vec![Interval::new(1, 8)]);

    // The narrowed residual is fetched again, the complete middle is not
    let again = cache.read_async(1, 8, "k").await.unwrap();
    assert!(!again.is_partial());
    assert_eq!(again.to_vec(), contiguous(1, 8));
    assert_eq!(sorted(&calls), vec![(1, 4), (1, 8), (4, 6), (6, 8)]);
    assert!(cache.intervals("k").partial.is_empty());
}

#[tokio::test]
async fn test_identical_partial_request_is_trusted() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: (), ctx: LoadContext| {
        log.lock().push((start, end));
        async move {
            ctx.mark_partial();
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    cache.read_async(1, 8, ()).await.unwrap();
    let cached = cache.get_value(1, 8, ()).unwrap();
    assert!(cached.is_partial());
    assert_eq!(cache.status(1, 8, ()), Status::Resolved);
    assert_eq!(calls.lock().len(), 1);
}

// =============================================================================
// Abort and eviction
// =============================================================================

#[tokio::test]
async fn test_abort_discards_pending_and_allows_retry() {
    let calls: Calls = Arc::default();
    let hang = Arc::new(AtomicBool::new(true));
    let log = Arc::clone(&calls);
    let gate = Arc::clone(&hang);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _ctx: LoadContext| {
        log.lock().push((start, end));
        let hang = gate.load(Ordering::SeqCst);
        async move {
            if hang {
                // Ignores the token; abort has to win the race on its own
                futures::future::pending::<()>().await;
            }
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    let outcome = cache.read(1, 4, "k");
    let LoadOutcome::Pending(handle) = outcome else {
        panic!("expected a pending request");
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(calls.lock().len(), 1);
    assert_eq!(cache.status(1, 4, "k"), Status::Pending);

    assert!(cache.abort("k"));
    assert!(matches!(handle.await, Err(CacheError::Aborted)));
    assert!(cache.intervals("k").pending.is_empty());
    assert_eq!(cache.stats().records, 0);
    assert_eq!(cache.status(1, 4, "k"), Status::NotFound);
    assert!(!cache.abort("k"));

    hang.store(false, Ordering::SeqCst);
    let retried = cache.read_async(1, 4, "k").await.unwrap();
    assert_eq!(retried.to_vec(), contiguous(1, 4));
    assert_eq!(calls.lock().len(), 2);
}

#[tokio::test]
async fn test_loader_sees_cancellation() {
    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);
    let cache = int_cache(move |_start: i64, _end: i64, _key: (), ctx: LoadContext| {
        let flag = Arc::clone(&flag);
        async move {
            ctx.token().cancelled().await;
            flag.store(true, Ordering::SeqCst);
            Err::<Vec<i64>, _>(LoadError::msg("cancelled"))
        }
    });

    let pending = cache.read_async(0, 10, ());
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.evict(());

    assert!(matches!(pending.await, Err(CacheError::Aborted)));
    assert!(observed.load(Ordering::SeqCst));
    // A cancelled load never records a failure
    assert!(cache.intervals(()).failed.is_empty());
    let expected = CacheStats {
        loader_calls: 1,
        ..Default::default()
    };
    assert_eq!(cache.stats(), expected);
}

// =============================================================================
// Failures and poisoned ranges
// =============================================================================

#[tokio::test]
async fn test_failed_range_poisons_until_evicted() {
    let calls: Calls = Arc::default();
    let failing = Arc::new(AtomicBool::new(true));
    let log = Arc::clone(&calls);
    let gate = Arc::clone(&failing);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _ctx: LoadContext| {
        log.lock().push((start, end));
        let fail = gate.load(Ordering::SeqCst);
        async move {
            if fail {
                return Err(LoadError::msg("backend unavailable"));
            }
            Ok(contiguous(start, end))
        }
    });

    let err = cache.read_async(2, 4, "k").await.unwrap_err();
    assert!(err.is_loader_error());
    assert_eq!(err.to_string(), "loader failed: backend unavailable");
    assert_eq!(cache.intervals("k").failed, vec![Interval::new(2, 4)]);
    assert_eq!(cache.status(3, 9, "k"), Status::Rejected);

    failing.store(false, Ordering::SeqCst);

    // Covering the failed range rejects without calling the loader
    assert!(matches!(cache.read(1, 6, "k"), LoadOutcome::Rejected(CacheError::Poisoned { .. })));
    // So does a request strictly inside it
    assert!(matches!(cache.read_async(2, 3, "k").await, Err(CacheError::Poisoned { .. })));
    assert_eq!(calls.lock().len(), 1);

    cache.evict_all();
    let recovered = cache.read_async(2, 3, "k").await.unwrap();
    assert_eq!(recovered.to_vec(), contiguous(2, 3));
    assert_eq!(sorted(&calls), vec![(2, 3), (2, 4)]);
}

#[tokio::test]
async fn test_sibling_success_survives_aggregate_failure() {
    let cache = int_cache(|start: i64, end: i64, _key: (), _ctx: LoadContext| async move {
        if start >= 10 {
            return Err(LoadError::msg("shard offline"));
        }
        Ok(contiguous(start, end))
    });

    cache.read_async(4, 10, ()).await.unwrap();

    // Needs [0, 4] and [10, 15]; the second fails
    let err = cache.read_async(0, 15, ()).await.unwrap_err();
    assert!(err.is_loader_error());

    let intervals = cache.intervals(());
    assert_eq!(intervals.loaded, vec![Interval::new(0, 10)]);
    assert_eq!(intervals.failed, vec![Interval::new(10, 15)]);
    assert_eq!(cache.get_value(0, 9, ()).unwrap().to_vec(), contiguous(0, 9));
    assert!(matches!(cache.get_value(8, 12, ()), Err(CacheError::Poisoned { .. })));
    assert_eq!(cache.status(0, 15, ()), Status::Rejected);
}

// =============================================================================
// Subscriptions
// =============================================================================

#[tokio::test]
async fn test_subscribers_follow_lifecycle() {
    let cache = int_cache(|start: i64, end: i64, _key: &'static str, _: LoadContext| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, LoadError>(contiguous(start, end))
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = cache.subscribe_to_status(move |status| sink.lock().push(status), 2, 3, "k");

    let untouched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&untouched);
    let _elsewhere = cache.subscribe_to_status(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        50,
        60,
        "k",
    );

    cache.read_async(0, 10, "k").await.unwrap();
    cache.evict("k");

    let mut statuses = seen.lock().clone();
    statuses.dedup();
    assert_eq!(
        statuses,
        vec![Status::NotFound, Status::Pending, Status::Resolved, Status::NotFound]
    );

    // Initial replay, then the eviction broadcast
    assert_eq!(untouched.load(Ordering::SeqCst), 2);

    subscription.unsubscribe();
    let before = seen.lock().len();
    cache.read_async(0, 10, "k").await.unwrap();
    assert_eq!(seen.lock().len(), before);
}

type Seen = Arc<Mutex<Vec<Status>>>;

fn recorder() -> (Seen, impl Fn(Status) + Send + Sync + 'static) {
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    (seen, move |status| sink.lock().push(status))
}

#[tokio::test]
async fn test_evict_all_broadcasts_not_found() {
    let cache = int_cache(|start: i64, end: i64, _key: &'static str, _: LoadContext| async move {
        Ok::<_, LoadError>(contiguous(start, end))
    });

    let (seen_a, on_a) = recorder();
    let (seen_b, on_b) = recorder();
    let (seen_idle, on_idle) = recorder();
    let _a = cache.subscribe_to_status(on_a, 1, 4, "a");
    let _b = cache.subscribe_to_status(on_b, 0, 2, "b");
    let _idle = cache.subscribe_to_status(on_idle, 0, 9, "idle");

    cache.read_async(1, 4, "a").await.unwrap();
    cache.read_async(0, 2, "b").await.unwrap();
    cache.evict_all();

    use Status::*;
    assert_eq!(*seen_a.lock(), vec![NotFound, Pending, Resolved, Resolved, NotFound]);
    assert_eq!(*seen_b.lock(), vec![NotFound, Pending, Resolved, Resolved, NotFound]);
    // Subscribed keys without state still hear the broadcast
    assert_eq!(*seen_idle.lock(), vec![NotFound, NotFound]);
    assert_eq!(cache.stats().keys, 0);
}

// =============================================================================
// Parallel callers
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_subscriber_ends_on_current_status() {
    let cache = int_cache(|start: i64, end: i64, _key: &'static str, _: LoadContext| async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, LoadError>(contiguous(start, end))
    });

    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    let _subscription = cache.subscribe_to_status(
        move |status| {
            // Settlement lands on another worker while this delivery blocks
            if status == Status::Pending {
                std::thread::sleep(Duration::from_millis(200));
            }
            sink.lock().push(status);
        },
        1,
        4,
        "k",
    );

    cache.read(1, 4, "k").into_result().await.unwrap();

    let current = cache.status(1, 4, "k");
    assert_eq!(current, Status::Resolved);
    assert_eq!(seen.lock().last().copied(), Some(current));

    use Status::*;
    assert_eq!(*seen.lock(), vec![NotFound, Pending, Resolved, Resolved]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_parallel_pair_splits_at_shared_boundary() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _: LoadContext| {
        log.lock().push((start, end));
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    let left = tokio::spawn({
        let cache = cache.clone();
        async move { cache.read_async(1, 4, "k").await }
    });
    let right = tokio::spawn({
        let cache = cache.clone();
        async move { cache.read_async(2, 5, "k").await }
    });

    assert_eq!(left.await.unwrap().unwrap().to_vec(), contiguous(1, 4));
    assert_eq!(right.await.unwrap().unwrap().to_vec(), contiguous(2, 5));

    // Whichever request wins the lock loads whole; the other fetches only its remainder
    let calls = sorted(&calls);
    assert!(
        calls == vec![(1, 4), (4, 5)] || calls == vec![(1, 2), (2, 5)],
        "unexpected loads {:?}",
        calls
    );
    assert_eq!(cache.intervals("k").loaded, vec![Interval::new(1, 5)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_sliding_reads_load_each_span_once() {
    let calls: Calls = Arc::default();
    let log = Arc::clone(&calls);
    let cache = int_cache(move |start: i64, end: i64, _key: &'static str, _: LoadContext| {
        log.lock().push((start, end));
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, LoadError>(contiguous(start, end))
        }
    });

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.read_async(i, i + 4, "k").await })
        })
        .collect();
    for (i, task) in (0..16).zip(tasks) {
        let slice = task.await.unwrap().unwrap();
        assert_eq!(slice.to_vec(), contiguous(i, i + 4));
    }

    let calls = sorted(&calls);
    for pair in calls.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "loads {:?} overlap", pair);
    }
    let fetched: i64 = calls.iter().map(|(start, end)| end - start).sum();
    assert_eq!(fetched, 19);
    assert_eq!(cache.intervals("k").loaded, vec![Interval::new(0, 19)]);
    assert_eq!(cache.stats().loader_calls, calls.len() as u64);
}

// =============================================================================
// Non-numeric points
// =============================================================================

#[tokio::test]
async fn test_string_points() {
    const WORDS: [&str; 8] = [
        "apple", "banana", "cherry", "date", "elder", "fig", "grape", "kiwi",
    ];

    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&calls);
    let cache = RangeCache::new(
        PointOrder::natural(),
        |word: &String| word.clone(),
        move |start: String, end: String, _key: (), _ctx: LoadContext| {
            log.lock().push((start.clone(), end.clone()));
            async move {
                let words = WORDS
                    .iter()
                    .filter(|w| start.as_str() <= **w && **w <= end.as_str())
                    .map(|w| w.to_string())
                    .collect();
                Ok::<_, LoadError>(words)
            }
        },
    );

    let first = cache.read_async("b".to_string(), "d".to_string(), ()).await.unwrap();
    assert_eq!(first.to_vec(), vec!["banana", "cherry"]);

    let second = cache.read_async("c".to_string(), "g".to_string(), ()).await.unwrap();
    assert_eq!(second.to_vec(), vec!["cherry", "date", "elder", "fig"]);

    assert_eq!(
        *calls.lock(),
        vec![("b".to_string(), "d".to_string()), ("d".to_string(), "g".to_string())]
    );
}
