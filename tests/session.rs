mod common;

use common::{MockRegistry, NoopSink};
use gst_linkage::domain::Pan;
use gst_linkage::registry::{Envelope, PanLinkage};
use gst_linkage::resolver::{LinkageResolver, ResolverOptions};
use gst_linkage::session::{Commit, SessionPhase, SharedSession};

const SLOW_PAN: &str = "AAAAA1111A";
const FAST_PAN: &str = "BBBBB2222B";

#[tokio::test]
async fn late_result_does_not_overwrite_newer_search() {
    let registry = MockRegistry::default()
        .with_pan(
            SLOW_PAN,
            120,
            Envelope::success(PanLinkage::new(SLOW_PAN, &[])),
        )
        .with_pan(
            FAST_PAN,
            0,
            Envelope::success(PanLinkage::new(FAST_PAN, &[])),
        );
    let resolver = LinkageResolver::new(registry, ResolverOptions::default());
    let session = SharedSession::new();
    let slow: Pan = SLOW_PAN.parse().unwrap();
    let fast: Pan = FAST_PAN.parse().unwrap();

    let (first, second) = tokio::join!(
        resolver.resolve_into(&session, &slow, &NoopSink),
        resolver.resolve_into(&session, &fast, &NoopSink),
    );

    assert_eq!(first, Commit::Stale);
    assert_eq!(second, Commit::Committed);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase(), SessionPhase::Succeeded);
    assert_eq!(snapshot.result().unwrap().pan_number.as_str(), FAST_PAN);
}

#[tokio::test]
async fn late_failure_is_dropped_too() {
    let registry = MockRegistry::default()
        .with_pan(SLOW_PAN, 80, Envelope::error("rate limited"))
        .with_pan(
            FAST_PAN,
            0,
            Envelope::success(PanLinkage::new(FAST_PAN, &[])),
        );
    let resolver = LinkageResolver::new(registry, ResolverOptions::default());
    let session = SharedSession::new();
    let slow: Pan = SLOW_PAN.parse().unwrap();
    let fast: Pan = FAST_PAN.parse().unwrap();

    let (first, _) = tokio::join!(
        resolver.resolve_into(&session, &slow, &NoopSink),
        resolver.resolve_into(&session, &fast, &NoopSink),
    );

    assert_eq!(first, Commit::Stale);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase(), SessionPhase::Succeeded);
    assert!(snapshot.error_message().is_none());
}

#[tokio::test]
async fn any_error_ends_in_failed_never_pending() {
    let resolver = LinkageResolver::new(MockRegistry::default(), ResolverOptions::default());
    let session = SharedSession::new();
    let pan: Pan = SLOW_PAN.parse().unwrap();

    let commit = resolver.resolve_into(&session, &pan, &NoopSink).await;

    assert_eq!(commit, Commit::Committed);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase(), SessionPhase::Failed);
    assert!(!snapshot.error_message().unwrap().is_empty());
    assert!(snapshot.result().is_none());
}

#[tokio::test]
async fn sequential_searches_replace_each_other() {
    let registry = MockRegistry::default()
        .with_pan(SLOW_PAN, 0, Envelope::error("Invalid PAN"))
        .with_pan(
            FAST_PAN,
            0,
            Envelope::success(PanLinkage::new(FAST_PAN, &[])),
        );
    let resolver = LinkageResolver::new(registry, ResolverOptions::default());
    let session = SharedSession::new();
    let slow: Pan = SLOW_PAN.parse().unwrap();
    let fast: Pan = FAST_PAN.parse().unwrap();

    resolver.resolve_into(&session, &slow, &NoopSink).await;
    assert_eq!(session.snapshot().phase(), SessionPhase::Failed);

    resolver.resolve_into(&session, &fast, &NoopSink).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase(), SessionPhase::Succeeded);
    assert!(snapshot.error_message().is_none());
}
