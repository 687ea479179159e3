//! Shared test doubles for the orchestrator integration tests.
//!
//! - `FakeSource` serves a fixed snapshot and an event stream fed through a channel
//! - `FakeResolver` serves secrets from a map and records every lookup

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use async_trait::async_trait;
use cert_backup_operator::controller::{
    BackupWriter, CertificateEvent, CertificateEventStream, CertificateRecord, CertificateSource,
    DiscoveryError, Orchestrator, ResolveError, SecretMaterial, SecretResolver, StatusCondition,
};
use chrono::{TimeZone, Utc};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type EventSender = UnboundedSender<Result<CertificateEvent, DiscoveryError>>;

/// A ready certificate created at 2024-01-02T03:04:05Z
pub fn ready_record(namespace: &str, name: &str) -> CertificateRecord {
    CertificateRecord::new(
        namespace,
        name,
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        vec![StatusCondition::new("Ready", "True")],
    )
}

pub fn record_with_conditions(
    namespace: &str,
    name: &str,
    conditions: Vec<StatusCondition>,
) -> CertificateRecord {
    CertificateRecord {
        conditions,
        ..ready_record(namespace, name)
    }
}

pub fn tls_material(cert: &[u8], key: &[u8]) -> SecretMaterial {
    SecretMaterial::new(Some(cert.to_vec()), Some(key.to_vec()))
}

pub struct FakeSource {
    snapshot: Mutex<Option<Result<Vec<CertificateRecord>, DiscoveryError>>>,
    events: Mutex<Option<UnboundedReceiver<Result<CertificateEvent, DiscoveryError>>>>,
}

impl FakeSource {
    pub fn new(snapshot: Vec<CertificateRecord>) -> (Self, EventSender) {
        Self::with_snapshot(Ok(snapshot))
    }

    pub fn with_snapshot(
        snapshot: Result<Vec<CertificateRecord>, DiscoveryError>,
    ) -> (Self, EventSender) {
        let (tx, rx) = unbounded();
        (
            Self {
                snapshot: Mutex::new(Some(snapshot)),
                events: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl CertificateSource for FakeSource {
    async fn snapshot(&self) -> Result<Vec<CertificateRecord>, DiscoveryError> {
        self.snapshot
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn subscribe(&self) -> Result<CertificateEventStream, DiscoveryError> {
        self.events
            .lock()
            .unwrap()
            .take()
            .map(StreamExt::boxed)
            .ok_or(DiscoveryError::AlreadySubscribed)
    }
}

#[derive(Default)]
pub struct FakeResolver {
    secrets: HashMap<(String, String), SecretMaterial>,
    failing: HashSet<(String, String)>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, namespace: &str, name: &str, material: SecretMaterial) -> Self {
        self.secrets
            .insert((namespace.to_string(), name.to_string()), material);
        self
    }

    /// Lookups for this secret fail with an API error instead of NotFound
    #[must_use]
    pub fn with_failure(mut self, namespace: &str, name: &str) -> Self {
        self.failing
            .insert((namespace.to_string(), name.to_string()));
        self
    }

    /// Handle to the `namespace/name` lookups performed so far
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl SecretResolver for FakeResolver {
    async fn resolve(&self, namespace: &str, name: &str) -> Result<SecretMaterial, ResolveError> {
        self.calls.lock().unwrap().push(format!("{namespace}/{name}"));
        let key = (namespace.to_string(), name.to_string());
        if self.failing.contains(&key) {
            return Err(ResolveError::Api {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source: "etcdserver: request timed out".into(),
            });
        }
        self.secrets
            .get(&key)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

pub fn orchestrator(
    source: FakeSource,
    resolver: FakeResolver,
    backup_dir: &Path,
    shutdown: CancellationToken,
    watching: Arc<AtomicBool>,
) -> Orchestrator<FakeSource, FakeResolver> {
    Orchestrator::new(source, resolver, BackupWriter::new(backup_dir), shutdown)
        .with_watch_flag(watching)
}

/// Wait until the orchestrator reports an open watch subscription
pub async fn wait_until_watching(watching: &AtomicBool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !watching.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("orchestrator did not start watching");
}

/// Names of the files in `dir`, sorted
pub fn backup_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
