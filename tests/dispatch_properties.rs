//! End-to-end checks of dispatch, retry, counter and dry-run behaviour
//! through the public library API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use push_gateway::config::{StorageConfig, StorageEngine};
use push_gateway::dispatch::{sender_fn, DispatchOutcome, Dispatcher, RetryPolicy, TokenSender};
use push_gateway::providers::{ProviderRegistry, PushProvider, SendOptions, SendRequest};
use push_gateway::stats::MetricValues;
use push_gateway::store::{open_store, SetSemantics};
use push_gateway::{AppError, AppResult, Gateway, Metric, Platform, Stats};

fn memory_stats() -> Stats {
    Stats::new(open_store(&StorageConfig::default()).unwrap())
}

fn tokens(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("token-{i}")).collect()
}

#[tokio::test]
async fn test_all_success_counts_once_per_token() {
    for n in [0usize, 1, 7, 250] {
        let stats = memory_stats();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let sender = sender_fn(move |_token: String| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok(DispatchOutcome::success(None)) }
        });

        let report = Dispatcher::new(16)
            .with_stats(stats.clone())
            .dispatch(Platform::Oppo, sender, &tokens(n), &RetryPolicy::new(3, 1))
            .await;

        assert!(report.into_result().is_ok(), "n = {n}");
        assert_eq!(calls.load(Ordering::SeqCst), n);
        assert_eq!(stats.get(Platform::Oppo, Metric::Total), n as i64);
        assert_eq!(stats.get(Platform::Oppo, Metric::Success), n as i64);
        assert_eq!(stats.get(Platform::Oppo, Metric::Failed), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_every_attempt_fails() {
    const MESSAGES: [&str; 3] = ["quota exceeded", "bad gateway", "token expired"];

    for retry in [0u32, 1, 4] {
        let calls = Arc::new(Mutex::new(Vec::<String>::new()));
        let seen = Arc::clone(&calls);
        let sender = sender_fn(move |token: String| {
            let attempt = {
                let mut seen = seen.lock();
                seen.push(token);
                seen.len()
            };
            async move { Err(AppError::provider(MESSAGES[attempt % MESSAGES.len()])) }
        });

        let token_list = tokens(3);
        let report = Dispatcher::new(2)
            .dispatch(Platform::Vivo, sender, &token_list, &RetryPolicy::new(retry, 1))
            .await;

        let calls = calls.lock();
        for token in &token_list {
            let per_token = calls.iter().filter(|t| *t == token).count();
            assert_eq!(per_token, retry as usize + 1, "retry = {retry}");
        }

        let message = report.aggregate_error().unwrap().to_string();
        let distinct: std::collections::HashSet<_> = (1..=calls.len())
            .map(|attempt| MESSAGES[attempt % MESSAGES.len()])
            .collect();
        for expected in distinct {
            assert_eq!(message.matches(expected).count(), 1, "{message}");
        }
    }
}

/// Fails `failures` times per token, then succeeds; records attempt times
fn flaky_sender(failures: usize, stamps: Arc<Mutex<Vec<Instant>>>) -> Arc<dyn TokenSender> {
    sender_fn(move |_token: String| {
        let attempt = {
            let mut stamps = stamps.lock();
            stamps.push(Instant::now());
            stamps.len()
        };
        async move {
            if attempt <= failures {
                Err(AppError::provider("temporarily unavailable"))
            } else {
                Ok(DispatchOutcome::success(None))
            }
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_first_retry_is_immediate() {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let report = Dispatcher::default()
        .dispatch(
            Platform::Ios,
            flaky_sender(1, Arc::clone(&stamps)),
            &tokens(1),
            &RetryPolicy::new(2, 5),
        )
        .await;

    assert!(report.is_success());
    let stamps = stamps.lock();
    assert_eq!(stamps.len(), 2);
    assert_eq!(stamps[1] - stamps[0], Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_later_retries_wait_the_interval() {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let report = Dispatcher::default()
        .dispatch(
            Platform::Ios,
            flaky_sender(2, Arc::clone(&stamps)),
            &tokens(1),
            &RetryPolicy::new(2, 2),
        )
        .await;

    assert!(report.is_success());
    let stamps = stamps.lock();
    assert_eq!(stamps.len(), 3);
    assert!(stamps[2] - stamps[1] >= Duration::from_secs(2));
}

#[tokio::test]
async fn test_in_flight_never_exceeds_limit() {
    const LIMIT: usize = 5;

    let gate = Arc::new(Semaphore::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let sender = {
        let gate = Arc::clone(&gate);
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        sender_fn(move |_token: String| {
            let gate = Arc::clone(&gate);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                gate.acquire().await.unwrap().forget();
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(DispatchOutcome::success(None))
            }
        })
    };

    let handle = tokio::spawn(async move {
        Dispatcher::new(LIMIT)
            .dispatch(Platform::Honor, sender, &tokens(60), &RetryPolicy::no_retry())
            .await
    });

    while in_flight.load(Ordering::SeqCst) < LIMIT {
        tokio::task::yield_now().await;
    }
    // Give the dispatcher every chance to overshoot while all senders block
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
    assert_eq!(in_flight.load(Ordering::SeqCst), LIMIT);

    gate.add_permits(60);
    let report = handle.await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.total(), 60);
    assert!(peak.load(Ordering::SeqCst) <= LIMIT);
}

#[tokio::test]
async fn test_concurrent_adds_lose_nothing() {
    let stats = memory_stats();
    let store = Arc::clone(stats.store());

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..1000 {
        let store = Arc::clone(&store);
        tasks.spawn(async move { store.add("hipush-ios-click", 1) });
    }
    while tasks.join_next().await.is_some() {}

    assert_eq!(store.get("hipush-ios-click"), 1000);
    store.set("hipush-ios-click", 5);
    assert_eq!(store.get("hipush-ios-click"), 5);
    store.add("hipush-ios-click", 3);
    assert_eq!(store.get("hipush-ios-click"), 8);
}

fn file_config(dir: &TempDir, set_semantics: SetSemantics) -> StorageConfig {
    StorageConfig {
        engine: StorageEngine::File,
        path: Some(dir.path().join("counters.json")),
        flush_interval_secs: 60,
        set_semantics,
    }
}

#[test]
fn test_file_store_set_semantics_after_reload() {
    for (semantics, expected) in [(SetSemantics::Assign, 7), (SetSemantics::Additive, 12)] {
        let dir = TempDir::new().unwrap();

        let store = open_store(&file_config(&dir, semantics)).unwrap();
        store.add("hipush-oppo-total", 5);
        store.close().unwrap();

        let store = open_store(&file_config(&dir, semantics)).unwrap();
        store.set("hipush-oppo-total", 7);
        store.close().unwrap();

        let store = open_store(&file_config(&dir, semantics)).unwrap();
        assert_eq!(store.get("hipush-oppo-total"), expected, "{semantics:?}");
        store.close().unwrap();
    }
}

/// Succeeds for every token except `t2`, counting sends
struct ScenarioProvider {
    sends: Arc<AtomicUsize>,
}

impl PushProvider for ScenarioProvider {
    fn platform(&self) -> Platform {
        Platform::Huawei
    }

    fn prepare(&self, request: &SendRequest) -> AppResult<Arc<dyn TokenSender>> {
        let sends = Arc::clone(&self.sends);
        let title = request.title.clone();
        Ok(sender_fn(move |token: String| {
            sends.fetch_add(1, Ordering::SeqCst);
            let title = title.clone();
            async move {
                if token == "t2" {
                    Err(AppError::provider_status(80300007, "invalid token"))
                } else {
                    Ok(DispatchOutcome::success(Some(json!({ "task_id": title }))))
                }
            }
        }))
    }
}

fn scenario_gateway(stats: Stats) -> (Gateway, Arc<AtomicUsize>) {
    let sends = Arc::new(AtomicUsize::new(0));
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(ScenarioProvider {
        sends: Arc::clone(&sends),
    }));
    let gateway = Gateway::new(
        registry,
        Dispatcher::new(8).with_stats(stats),
        RetryPolicy::no_retry(),
    );
    (gateway, sends)
}

#[tokio::test]
async fn test_dry_run_sends_nothing_and_counts_nothing() {
    let stats = memory_stats();
    let (gateway, sends) = scenario_gateway(stats.clone());

    let response = gateway
        .send(
            "hms",
            &SendRequest::new(["t1", "t2", "t3"], "Title", "Body"),
            &SendOptions::dry_run(),
        )
        .await
        .unwrap();

    assert!(response.task_id.is_none());
    assert_eq!(sends.load(Ordering::SeqCst), 0);
    assert_eq!(stats.report().totals, MetricValues::default());
}

#[tokio::test(start_paused = true)]
async fn test_partial_failure_through_file_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&file_config(&dir, SetSemantics::Assign)).unwrap();
    let (gateway, sends) = scenario_gateway(Stats::new(Arc::clone(&store)));

    let err = gateway
        .send(
            "huawei",
            &SendRequest::new(["t1", "t2", "t3"], "Title", "Body"),
            &SendOptions::default().with_retry(2, 1),
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Provider returned status 80300007: invalid token");
    assert_eq!(sends.load(Ordering::SeqCst), 5);
    store.close().unwrap();

    let reloaded = Stats::new(open_store(&file_config(&dir, SetSemantics::Assign)).unwrap());
    assert_eq!(reloaded.get(Platform::Huawei, Metric::Total), 3);
    assert_eq!(reloaded.get(Platform::Huawei, Metric::Success), 2);
    assert_eq!(reloaded.get(Platform::Huawei, Metric::Failed), 1);
    reloaded.store().close().unwrap();
}
