//! Collection-loop scenarios driven by scripted samplers.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::MonitorConfig;
use crate::engine::{MonitorEngine, NameFilter};
use crate::tests::mocks::{MockControl, MockSampler, sample};
use crate::types::Snapshot;

const MB: u64 = 1024 * 1024;

fn fast_config() -> MonitorConfig {
    MonitorConfig::with_interval(Duration::from_millis(100))
}

async fn next_publish(
    rx: &mut tokio::sync::broadcast::Receiver<Arc<Snapshot>>,
) -> Arc<Snapshot> {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for publish")
        .expect("publish channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publishes_carry_increasing_sequences() {
    let sampler = MockSampler::returning(vec![sample(10, "worker", 0, MB)]);
    let engine = MonitorEngine::spawn(
        fast_config(),
        sampler,
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();

    let store = engine.store();
    let mut publishes = store.subscribe();
    let mut last = None;
    for _ in 0..3 {
        let snapshot = next_publish(&mut publishes).await;
        if let Some(prev) = last {
            assert_eq!(snapshot.sequence, prev + 1);
        }
        last = Some(snapshot.sequence);
    }
    // A polling reader never observes the sequence going backward.
    assert!(store.read().map(|s| s.sequence) >= last);

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_first_cycle_runs_immediately() {
    let sampler = MockSampler::returning(vec![sample(10, "worker", 0, MB)]);
    let engine = MonitorEngine::spawn(
        MonitorConfig::with_interval(Duration::from_secs(60)),
        sampler,
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();

    // The first tick does not wait a full interval: with a 60s cadence,
    // any snapshot visible within 5s must come from the immediate cycle.
    let store = engine.store();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let snapshot = loop {
        if let Some(snapshot) = store.read() {
            break snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "first cycle did not run promptly"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    };
    assert_eq!(snapshot.sequence, 0);
    assert_eq!(snapshot.pid_count(), 1);

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_overlapping_cycles() {
    let sampler = MockSampler::returning(vec![sample(10, "worker", 0, MB)]);
    // Each collect takes 2.5 intervals.
    sampler.set_delay(Duration::from_millis(250));

    let engine = MonitorEngine::spawn(
        fast_config(),
        sampler.clone(),
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(900)).await;
    engine.shutdown().await.unwrap();

    assert_eq!(sampler.max_in_flight(), 1, "cycles overlapped");
    // Total cycles in time T stays within ceil(T / interval).
    assert!(sampler.collect_count() <= 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_cycle_keeps_previous_snapshot() {
    let sampler = MockSampler::returning(vec![sample(10, "worker", 0, MB)]);
    sampler.push_ok(vec![sample(10, "worker", 0, MB)]);
    sampler.push_err("proc table unavailable");
    // Keep the first cycle in flight long enough for the subscriptions
    // below to exist before anything is published.
    sampler.set_delay(Duration::from_millis(50));

    let engine = MonitorEngine::spawn(
        fast_config(),
        sampler,
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();
    let store = engine.store();
    let mut publishes = store.subscribe();
    let mut errors = engine.subscribe_errors();

    let first = next_publish(&mut publishes).await;
    assert_eq!(first.sequence, 0);

    // The failing cycle reports to the error observer without publishing.
    let failure = timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("timed out waiting for cycle failure")
        .expect("error channel closed");
    assert!(failure.message.contains("proc table unavailable"));
    assert_eq!(store.read().map(|s| s.sequence), Some(0));

    // The loop recovers on the next tick.
    let next = next_publish(&mut publishes).await;
    assert_eq!(next.sequence, 1);
    assert!(engine.metrics().cycles_failed() >= 1);

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_partial_sample_set_is_not_a_cycle_error() {
    // The sampler already absorbed one unreadable process: 2 of 3 returned.
    let sampler = MockSampler::returning(vec![
        sample(10, "worker", 0, MB),
        sample(11, "worker", 0, MB),
    ]);
    let engine = MonitorEngine::spawn(
        fast_config(),
        sampler,
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();
    let mut errors = engine.subscribe_errors();

    let mut publishes = engine.store().subscribe();
    let snapshot = next_publish(&mut publishes).await;
    assert_eq!(snapshot.pid_count(), 2);
    assert!(errors.try_recv().is_err(), "no CycleError expected");

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_name_filter_excludes_processes() {
    let sampler = MockSampler::returning(vec![
        sample(10, "worker", 0, MB),
        sample(11, "noise", 0, MB),
    ]);
    let filter: NameFilter = Arc::new(|name: &str| name != "noise");
    let engine = MonitorEngine::spawn_filtered(
        fast_config(),
        sampler,
        Arc::new(MockControl::succeeding()),
        Some(filter),
    )
    .unwrap();

    let mut publishes = engine.store().subscribe();
    let snapshot = next_publish(&mut publishes).await;
    assert!(snapshot.row("worker").is_some());
    assert!(snapshot.row("noise").is_none());
    assert_eq!(snapshot.pid_count(), 1);

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_drains_in_flight_cycle() {
    let sampler = MockSampler::returning(vec![sample(10, "worker", 0, MB)]);
    sampler.set_delay(Duration::from_millis(300));

    let engine = MonitorEngine::spawn(
        fast_config(),
        sampler.clone(),
        Arc::new(MockControl::succeeding()),
    )
    .unwrap();

    // Let the first cycle get in flight, then stop.
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.shutdown().await.unwrap();

    assert_eq!(sampler.in_flight(), 0, "in-flight cycle was not drained");
    assert!(sampler.collect_count() >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_controller_end_to_end() {
    let sampler = MockSampler::returning(vec![
        sample(10, "worker", 0, 100 * MB),
        sample(11, "worker", 0, 150 * MB),
    ]);
    let control = Arc::new(MockControl::succeeding());
    let engine = MonitorEngine::spawn(fast_config(), sampler, Arc::clone(&control) as Arc<dyn crate::sampler::ProcessControl>).unwrap();

    let mut publishes = engine.store().subscribe();
    let _ = next_publish(&mut publishes).await;

    let controller = engine.controller();
    let instances = controller.instances_of("worker");
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].pid, 10);
    assert_eq!(instances[1].pid, 11);

    controller.terminate(11).unwrap();
    assert_eq!(control.killed(), vec![11]);

    engine.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_rejects_invalid_config() {
    let sampler = MockSampler::returning(vec![]);
    let result = MonitorEngine::spawn(
        MonitorConfig::with_interval(Duration::from_millis(1)),
        sampler,
        Arc::new(MockControl::succeeding()),
    );
    assert!(result.is_err());
}
