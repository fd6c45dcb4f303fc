//! Full detection cycles against a stub upstream.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{Behavior, Upstream};
use relayscope::{
    report, DetectionResult, Detector, DetectorConfig, LatestView, Monitor, ProbeKind,
    BODY_PREVIEW_LIMIT,
};
use std::sync::Arc;

const KEY: &str = "sk-test-123";

fn config(upstream: &Upstream) -> DetectorConfig {
    DetectorConfig::new(upstream.url.clone(), KEY)
}

async fn detect(settings: DetectorConfig) -> (Detector, DetectionResult) {
    let detector = Detector::new(settings).unwrap();
    let result = detector.detect_once().await;
    (detector, result)
}

#[tokio::test]
async fn genuine_endpoint_passes_every_probe() {
    let upstream = Upstream::start(Behavior::Genuine).await;
    let (detector, result) = detect(config(&upstream)).await;

    assert!(result.is_real_api, "{result:?}");
    assert!(result.max_tokens_ok);
    assert!(result.logprobs_ok);
    assert!(result.multiple_ok);
    assert!(result.stop_sequence_ok);
    assert!(result.error.is_none());
    assert_eq!(result.api_token_count, 10);
    assert_eq!(result.api_total_tokens, 30);
    assert!(result.local_token_count > 0);
    assert_eq!(result.endpoint, upstream.url);
    assert_eq!(detector.history().len(), 1);
}

#[tokio::test]
async fn loose_json_from_genuine_endpoint_still_passes() {
    let upstream = Upstream::start(Behavior::LooseGenuine).await;
    let (_, result) = detect(config(&upstream)).await;

    assert!(result.is_real_api, "{result:?}");
    assert!(result.error.is_none());
    assert_eq!(result.api_token_count, 10);
    assert_eq!(result.api_total_tokens, 30);
}

#[tokio::test]
async fn every_request_carries_bearer_key() {
    let upstream = Upstream::start(Behavior::Genuine).await;
    detect(config(&upstream)).await;

    let headers = upstream.auth_headers();
    assert_eq!(headers.len(), 4, "one request per probe");
    assert!(headers.iter().all(|h| h == &format!("Bearer {KEY}")));
}

#[tokio::test]
async fn relay_fails_every_probe_without_errors() {
    let upstream = Upstream::start(Behavior::Relay).await;
    let (_, result) = detect(config(&upstream)).await;

    assert!(!result.is_real_api);
    assert!(!result.max_tokens_ok);
    assert!(!result.logprobs_ok);
    assert!(!result.multiple_ok);
    assert!(!result.stop_sequence_ok);
    assert!(result.error.is_none(), "all checks completed");
    assert_eq!(result.api_token_count, 150);
    assert_eq!(result.api_total_tokens, 170);
}

#[tokio::test]
async fn server_error_is_folded_into_summary() {
    let upstream = Upstream::start(Behavior::ServerError).await;
    let (_, result) = detect(config(&upstream)).await;

    assert!(!result.is_real_api);
    assert_eq!(upstream.request_count(), 4, "no short-circuit after the first error");
    let error = result.error.unwrap();
    assert_eq!(error.matches("probe error: API returned status 500").count(), 4);
    for outcome in &result.probes {
        let text = outcome.error.as_ref().unwrap();
        assert!(text.len() < BODY_PREVIEW_LIMIT + 100, "body must be truncated");
        assert!(text.ends_with("..."));
    }
    assert_eq!(result.api_token_count, 0);
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let upstream = Upstream::start(Behavior::Garbage).await;
    let (_, result) = detect(config(&upstream)).await;

    assert!(!result.is_real_api);
    let error = result.error.unwrap();
    assert!(error.contains("failed to decode response"));
    assert!(error.contains("<html>not json</html>"));
}

#[tokio::test]
async fn empty_object_is_a_probe_logic_error() {
    let upstream = Upstream::start(Behavior::EmptyObject).await;
    let (_, result) = detect(config(&upstream)).await;

    assert!(!result.is_real_api);
    for kind in ProbeKind::ALL {
        let outcome = result.probe(kind).unwrap();
        assert!(!outcome.passed);
        assert!(outcome.error.is_some(), "{kind} should not complete");
    }
}

#[tokio::test]
async fn raw_response_follows_setting() {
    let upstream = Upstream::start(Behavior::Genuine).await;

    let (_, kept) = detect(config(&upstream)).await;
    let raw = kept.raw_response.unwrap();
    let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["id"], "chatcmpl-genuine");

    let (_, dropped) = detect(config(&upstream).with_save_raw_response(false)).await;
    assert!(dropped.raw_response.is_none());
}

#[tokio::test]
async fn history_is_bounded_and_ordered() {
    let upstream = Upstream::start(Behavior::Genuine).await;
    let detector = Detector::new(config(&upstream).with_max_history(2)).unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(detector.detect_once().await.id);
    }

    let stored: Vec<_> = detector.history().all().into_iter().map(|r| r.id).collect();
    assert_eq!(stored, ids[1..].to_vec());
    assert_eq!(detector.latest().unwrap().id, ids[2]);
}

#[tokio::test]
async fn config_update_applies_to_next_cycle() {
    let genuine = Upstream::start(Behavior::Genuine).await;
    let relay = Upstream::start(Behavior::Relay).await;
    let monitor = Monitor::new(Detector::new(config(&genuine)).unwrap());

    assert!(monitor.run_detection_cycle().await.is_real_api);
    monitor.update_configuration(config(&relay));
    let second = monitor.run_detection_cycle().await;

    assert!(!second.is_real_api);
    assert_eq!(second.endpoint, relay.url);
    assert_eq!(monitor.history().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_append_in_start_order() {
    let upstream = Upstream::start(Behavior::Genuine).await;
    let detector = Arc::new(Detector::new(config(&upstream)).unwrap());

    let handles: Vec<_> = (0..5).map(|_| detector.detect_now()).collect();

    let reader = {
        let detector = Arc::clone(&detector);
        tokio::spawn(async move {
            for _ in 0..50 {
                for result in detector.history().all() {
                    assert_eq!(result.probes.len(), 4, "never a partial result");
                }
                tokio::task::yield_now().await;
            }
        })
    };

    for handle in handles {
        handle.await.unwrap();
    }
    reader.await.unwrap();

    let history = detector.history().all();
    assert_eq!(history.len(), 5);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(upstream.request_count(), 20);
}

#[tokio::test]
async fn latest_view_reports_ready_after_cycle() {
    let upstream = Upstream::start(Behavior::Relay).await;
    let monitor = Monitor::new(Detector::new(config(&upstream)).unwrap());
    assert_eq!(monitor.latest_view(), LatestView::Empty);

    let result = monitor.run_detection_cycle().await;
    match monitor.latest_view() {
        LatestView::Ready { result: latest } => assert_eq!(latest.id, result.id),
        other => panic!("unexpected view {other:?}"),
    }
}

#[tokio::test]
async fn markdown_report_lists_history() {
    let upstream = Upstream::start(Behavior::Genuine).await;
    let (detector, _) = detect(config(&upstream)).await;
    upstream.set_behavior(Behavior::Relay);
    detector.detect_once().await;

    let table = report::to_markdown_table(&detector.history().all());
    assert!(table.contains("| genuine |"));
    assert!(table.contains("| relay |"));
}
