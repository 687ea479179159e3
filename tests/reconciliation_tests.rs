//! End-to-end tests for the bootstrap-then-watch pipeline
//!
//! The orchestrator runs against an in-memory certificate source and secret resolver,
//! writing into a temporary backup directory.

mod common;

use cert_backup_operator::controller::{
    CertificateEvent, DiscoveryError, Observation, ReconcileOutcome, StatusCondition,
};
use common::{
    backup_files, orchestrator, ready_record, record_with_conditions, tls_material,
    wait_until_watching, FakeResolver, FakeSource,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_bootstrap_writes_certificate_and_key() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(vec![ready_record("prod", "api")]);
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    assert_eq!(orchestrator.bootstrap().await, 1);

    assert_eq!(
        backup_files(dir.path()),
        vec![
            "prod_api_20240102_030405.crt".to_string(),
            "prod_api_20240102_030405.key".to_string(),
        ]
    );
    let cert = std::fs::read(dir.path().join("prod_api_20240102_030405.crt")).unwrap();
    let key = std::fs::read(dir.path().join("prod_api_20240102_030405.key")).unwrap();
    assert_eq!(cert, b"CERT");
    assert_eq!(key, b"KEY");
    drop(events);
}

#[tokio::test]
async fn test_redelivered_certificate_performs_no_writes() {
    let dir = TempDir::new().unwrap();
    let record = ready_record("prod", "api");
    let (source, events) = FakeSource::new(vec![record.clone()]);
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    orchestrator.bootstrap().await;
    let outcome = orchestrator.reconcile(&record, Observation::Modified).await;
    assert_eq!(outcome, ReconcileOutcome::Complete { files_written: 0 });

    // Same certificate through the watch path
    events
        .unbounded_send(Ok(CertificateEvent::Modified(record.clone())))
        .unwrap();
    drop(events);
    let session = orchestrator.subscribe().await.unwrap();
    let result = orchestrator.watch(session).await;
    assert!(matches!(result, Err(DiscoveryError::StreamEnded)));

    assert_eq!(backup_files(dir.path()).len(), 2);
    let cert = std::fs::read(dir.path().join("prod_api_20240102_030405.crt")).unwrap();
    assert_eq!(cert, b"CERT");
}

#[tokio::test]
async fn test_certificate_without_conditions_never_reaches_resolver() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(vec![record_with_conditions("prod", "api", vec![])]);
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    events
        .unbounded_send(Ok(CertificateEvent::Added(record_with_conditions(
            "prod",
            "api",
            vec![],
        ))))
        .unwrap();
    drop(events);

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(DiscoveryError::StreamEnded)));
    assert!(calls.lock().unwrap().is_empty());
    assert!(backup_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_not_ready_first_condition_is_skipped() {
    let dir = TempDir::new().unwrap();
    let record = record_with_conditions(
        "prod",
        "api",
        vec![
            StatusCondition::new("Issuing", "True"),
            StatusCondition::new("Ready", "True"),
        ],
    );
    let (source, _events) = FakeSource::new(Vec::new());
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    let outcome = orchestrator.reconcile(&record, Observation::Added).await;

    assert_eq!(outcome, ReconcileOutcome::NotReady);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_shutdown_while_idle_releases_subscription() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(Vec::new());
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let shutdown = CancellationToken::new();
    let watching = Arc::new(AtomicBool::new(false));
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        shutdown.clone(),
        watching.clone(),
    );

    let worker = tokio::spawn(async move { orchestrator.run().await });
    wait_until_watching(&watching).await;
    assert!(!events.is_closed());

    shutdown.cancel();
    let result = worker.await.unwrap();

    assert!(result.is_ok());
    assert!(events.is_closed());
    assert!(events
        .unbounded_send(Ok(CertificateEvent::Added(ready_record("prod", "api"))))
        .is_err());
    assert!(calls.lock().unwrap().is_empty());
    assert!(backup_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_resolve_error_does_not_block_later_certificates() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(vec![
        ready_record("prod", "missing"),
        ready_record("prod", "flaky"),
        ready_record("prod", "api"),
    ]);
    let resolver = FakeResolver::new()
        .with_failure("prod", "flaky")
        .with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    assert_eq!(orchestrator.bootstrap().await, 3);

    assert_eq!(
        *calls.lock().unwrap(),
        vec!["prod/missing", "prod/flaky", "prod/api"]
    );
    assert_eq!(
        backup_files(dir.path()),
        vec![
            "prod_api_20240102_030405.crt".to_string(),
            "prod_api_20240102_030405.key".to_string(),
        ]
    );
    drop(events);
}

#[tokio::test]
async fn test_resolve_failure_is_reported_per_certificate() {
    let dir = TempDir::new().unwrap();
    let (source, _events) = FakeSource::new(Vec::new());
    let orchestrator = orchestrator(
        source,
        FakeResolver::new(),
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    let outcome = orchestrator
        .reconcile(&ready_record("prod", "api"), Observation::Added)
        .await;

    assert_eq!(outcome, ReconcileOutcome::ResolveFailed);
}

#[tokio::test]
async fn test_secret_without_private_key_leaves_pair_incomplete() {
    let dir = TempDir::new().unwrap();
    let record = ready_record("prod", "api");
    let (source, _events) = FakeSource::new(Vec::new());
    let resolver = FakeResolver::new().with_secret(
        "prod",
        "api",
        cert_backup_operator::controller::SecretMaterial::new(Some(b"CERT".to_vec()), None),
    );
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    let outcome = orchestrator.reconcile(&record, Observation::Added).await;

    assert_eq!(outcome, ReconcileOutcome::Incomplete { files_written: 1 });
    assert_eq!(
        backup_files(dir.path()),
        vec!["prod_api_20240102_030405.crt".to_string()]
    );
}

#[tokio::test]
async fn test_watch_events_are_processed_in_order() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(Vec::new());
    let resolver = FakeResolver::new()
        .with_secret("prod", "api", tls_material(b"CERT", b"KEY"))
        .with_secret("dev", "web", tls_material(b"WEB-CERT", b"WEB-KEY"));
    let calls = resolver.calls();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    events
        .unbounded_send(Ok(CertificateEvent::Added(ready_record("prod", "api"))))
        .unwrap();
    events.unbounded_send(Ok(CertificateEvent::Other)).unwrap();
    events
        .unbounded_send(Ok(CertificateEvent::Modified(ready_record("dev", "web"))))
        .unwrap();
    drop(events);

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(DiscoveryError::StreamEnded)));
    assert_eq!(*calls.lock().unwrap(), vec!["prod/api", "dev/web"]);
    assert_eq!(backup_files(dir.path()).len(), 4);
    let web_key = std::fs::read(dir.path().join("dev_web_20240102_030405.key")).unwrap();
    assert_eq!(web_key, b"WEB-KEY");
}

#[tokio::test]
async fn test_other_events_never_touch_backups() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(vec![ready_record("prod", "api")]);
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    events.unbounded_send(Ok(CertificateEvent::Other)).unwrap();
    drop(events);

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(DiscoveryError::StreamEnded)));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(backup_files(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_stream_error_is_returned() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(Vec::new());
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let watching = Arc::new(AtomicBool::new(false));
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        watching.clone(),
    );

    events
        .unbounded_send(Err(DiscoveryError::Watch("connection reset by peer".into())))
        .unwrap();
    events
        .unbounded_send(Ok(CertificateEvent::Added(ready_record("prod", "api"))))
        .unwrap();

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(DiscoveryError::Watch(_))));
    assert!(calls.lock().unwrap().is_empty());
    assert!(!orchestrator.is_watching());
    assert!(events.is_closed());
}

#[tokio::test]
async fn test_snapshot_failure_still_starts_watch() {
    let dir = TempDir::new().unwrap();
    let (source, events) =
        FakeSource::with_snapshot(Err(DiscoveryError::List("forbidden".into())));
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    events
        .unbounded_send(Ok(CertificateEvent::Added(ready_record("prod", "api"))))
        .unwrap();
    drop(events);

    let result = orchestrator.run().await;

    assert!(matches!(result, Err(DiscoveryError::StreamEnded)));
    assert_eq!(backup_files(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_shutdown_before_watch_skips_subscription() {
    let dir = TempDir::new().unwrap();
    let (source, events) = FakeSource::new(vec![ready_record("prod", "api")]);
    let resolver = FakeResolver::new().with_secret("prod", "api", tls_material(b"CERT", b"KEY"));
    let calls = resolver.calls();
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let orchestrator = orchestrator(
        source,
        resolver,
        dir.path(),
        shutdown,
        Arc::new(AtomicBool::new(false)),
    );

    let result = orchestrator.run().await;

    assert!(result.is_ok());
    assert!(calls.lock().unwrap().is_empty());
    // Receiver still owned by the source: the watch was never opened
    assert!(!events.is_closed());
}

#[tokio::test]
async fn test_refused_subscription_is_returned() {
    let dir = TempDir::new().unwrap();
    let (source, _events) = FakeSource::new(Vec::new());
    let orchestrator = orchestrator(
        source,
        FakeResolver::new(),
        dir.path(),
        CancellationToken::new(),
        Arc::new(AtomicBool::new(false)),
    );

    let first = orchestrator.subscribe().await;
    let second = orchestrator.subscribe().await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(DiscoveryError::AlreadySubscribed)));
    assert!(!orchestrator.is_watching());
}
