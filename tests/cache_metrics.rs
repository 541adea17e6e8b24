mod support;

use std::collections::HashSet;
use std::time::Duration;

use chirp::cache::CacheConfig;
use chirp::infra::telemetry::COUNTERS;
use metrics_util::debugging::DebuggingRecorder;

use support::HarnessBuilder;

#[tokio::test(start_paused = true)]
async fn read_and_write_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let h = HarnessBuilder::default()
        .cache(CacheConfig {
            max_entries: 1,
            ..Default::default()
        })
        .rate_limit(1, Duration::from_secs(60))
        .build();
    h.posts.insert_direct("alice", "hello").await;

    // miss, fill, hit
    h.service.list_all().await.expect("list all");
    h.service.list_all().await.expect("list all");

    // Capacity 1: filling the author feed evicts the global one.
    h.service.list_by_author("alice").await.expect("list alice");

    tokio::time::advance(Duration::from_secs(11)).await;
    h.service.list_by_author("alice").await.expect("expired refill");

    h.service.create_post("bob", "allowed").await.expect("create");
    h.service
        .create_post("bob", "denied")
        .await
        .expect_err("second write in window is limited");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for (metric, _) in COUNTERS {
        assert!(names.contains(*metric), "missing metric: {metric}");
    }
}
