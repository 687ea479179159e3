//! # Reconciliation Orchestrator
//!
//! Drives the backup pipeline (readiness gate, secret resolution, backup write) for every
//! observed certificate.
//!
//! ## Lifecycle
//!
//! 1. **Bootstrapping** - drain the snapshot. A failed listing counts as an empty snapshot.
//! 2. **Watching** - subscribe once and process notifications in delivery order until the
//!    shutdown token fires. The stream ending or failing first is returned as an error.
//!
//! Cancellation is cooperative: an item being processed always completes, and the token is
//! checked before the next notification is pulled.

use crate::controller::error::DiscoveryError;
use crate::controller::readiness::is_ready;
use crate::controller::resolver::SecretResolver;
use crate::controller::source::{CertificateEventStream, CertificateSource};
use crate::controller::types::{BackupKind, CertificateEvent, CertificateRecord, Observation};
use crate::controller::writer::BackupWriter;
use crate::observability::metrics;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What happened to a single observed certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Not eligible for backup
    NotReady,
    /// Secret could not be fetched
    ResolveFailed,
    /// Both backup files are on disk
    Complete { files_written: usize },
    /// At least one half is missing or failed to write
    Incomplete { files_written: usize },
}

/// Open watch subscription plus the token that ends it
pub struct ReconciliationSession {
    events: CertificateEventStream,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ReconciliationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationSession")
            .field("shutdown_requested", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

enum SessionStep {
    Event(Result<CertificateEvent, DiscoveryError>),
    Ended,
    Shutdown,
}

impl ReconciliationSession {
    pub fn new(events: CertificateEventStream, shutdown: CancellationToken) -> Self {
        Self { events, shutdown }
    }

    async fn next(&mut self) -> SessionStep {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => SessionStep::Shutdown,
            item = self.events.next() => match item {
                Some(item) => SessionStep::Event(item),
                None => SessionStep::Ended,
            },
        }
    }

    /// Drop the stream, closing the underlying watch
    fn release(self) {
        drop(self.events);
        info!("Certificate watch subscription released");
    }
}

/// Composes discovery, gating, resolution and writing
pub struct Orchestrator<S, R> {
    source: S,
    resolver: R,
    writer: BackupWriter,
    shutdown: CancellationToken,
    watching: Arc<AtomicBool>,
}

impl<S, R> std::fmt::Debug for Orchestrator<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("writer", &self.writer)
            .field("watching", &self.watching.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S, R> Orchestrator<S, R>
where
    S: CertificateSource,
    R: SecretResolver,
{
    pub fn new(source: S, resolver: R, writer: BackupWriter, shutdown: CancellationToken) -> Self {
        Self {
            source,
            resolver,
            writer,
            shutdown,
            watching: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that is set while the watch subscription is open (readiness probe)
    #[must_use]
    pub fn with_watch_flag(mut self, watching: Arc<AtomicBool>) -> Self {
        self.watching = watching;
        self
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Relaxed)
    }

    /// Bootstrap, then watch until shutdown.
    ///
    /// # Errors
    ///
    /// Returns the [`DiscoveryError`] that ended the watch before shutdown was requested.
    pub async fn run(&self) -> Result<(), DiscoveryError> {
        self.bootstrap().await;

        if self.shutdown.is_cancelled() {
            info!("Shutdown requested during bootstrap, not starting certificate watch");
            return Ok(());
        }

        let session = self.subscribe().await?;
        self.watch(session).await
    }

    /// Drain the initial snapshot through the pipeline. Returns the number of records seen.
    pub async fn bootstrap(&self) -> usize {
        info!("Listing certificates...");
        let records = match self.source.snapshot().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Unable to list certificates, continuing with the watch");
                Vec::new()
            }
        };

        info!("Found {} existing certificates", records.len());
        let mut seen = 0;
        for record in &records {
            if self.shutdown.is_cancelled() {
                info!(
                    remaining = records.len() - seen,
                    "Shutdown requested, stopping bootstrap"
                );
                break;
            }
            self.reconcile(record, Observation::Snapshot).await;
            seen += 1;
        }
        seen
    }

    /// Open the watch subscription
    ///
    /// # Errors
    ///
    /// Fails when the source refuses or cannot establish the subscription.
    pub async fn subscribe(&self) -> Result<ReconciliationSession, DiscoveryError> {
        info!("Start watching certificates...");
        let events = self.source.subscribe().await?;
        Ok(ReconciliationSession::new(events, self.shutdown.clone()))
    }

    /// Process notifications until shutdown or stream failure
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::StreamEnded`] when the stream closes first, or the error it yielded.
    pub async fn watch(&self, mut session: ReconciliationSession) -> Result<(), DiscoveryError> {
        self.watching.store(true, Ordering::Relaxed);

        let result = loop {
            match session.next().await {
                SessionStep::Shutdown => break Ok(()),
                SessionStep::Ended => break Err(DiscoveryError::StreamEnded),
                SessionStep::Event(Err(e)) => break Err(e),
                SessionStep::Event(Ok(event)) => match event {
                    CertificateEvent::Added(record) => {
                        self.reconcile(&record, Observation::Added).await;
                    }
                    CertificateEvent::Modified(record) => {
                        self.reconcile(&record, Observation::Modified).await;
                    }
                    CertificateEvent::Other => {
                        debug!("Ignoring certificate event that is neither an addition nor a modification");
                    }
                },
            }
        };

        self.watching.store(false, Ordering::Relaxed);
        session.release();
        result
    }

    /// Run one certificate through gate, resolve and write. Never fails: problems are logged
    /// and the certificate is dropped until it is observed again.
    pub async fn reconcile(
        &self,
        record: &CertificateRecord,
        observation: Observation,
    ) -> ReconcileOutcome {
        let span = info_span!(
            "certificate.reconcile",
            namespace = %record.namespace,
            name = %record.name,
            observation = observation.as_str()
        );
        self.reconcile_inner(record, observation)
            .instrument(span)
            .await
    }

    async fn reconcile_inner(
        &self,
        record: &CertificateRecord,
        observation: Observation,
    ) -> ReconcileOutcome {
        metrics::increment_certificates_observed(observation);

        if record.conditions.is_empty() {
            info!(
                "Certificate '{}' from namespace {} doesn't have conditions. Ignoring...",
                record.name, record.namespace
            );
            metrics::increment_not_ready();
            return ReconcileOutcome::NotReady;
        }
        if !is_ready(record) {
            debug!(
                first_condition = %record.conditions[0].r#type,
                "Certificate is not ready, skipping"
            );
            metrics::increment_not_ready();
            return ReconcileOutcome::NotReady;
        }

        let material = match self
            .resolver
            .resolve(&record.namespace, &record.name)
            .await
        {
            Ok(material) => material,
            Err(e) => {
                error!(
                    error = %e,
                    "Unable to get certificate content for {} in namespace {}",
                    record.name, record.namespace
                );
                metrics::increment_resolve_errors();
                return ReconcileOutcome::ResolveFailed;
            }
        };

        let report = self.writer.write(record, &material).await;
        for kind in BackupKind::ALL {
            if let Ok(outcome) = report.outcome(kind) {
                metrics::record_backup_file(kind, *outcome);
            }
        }
        for e in report.errors() {
            error!(
                error = %e,
                kind = e.kind.as_str(),
                path = %e.path.display(),
                "Error while backing up certificate '{}' from namespace {}",
                record.name, record.namespace
            );
            metrics::increment_write_errors(e.kind);
        }

        let files_written = report.files_written();
        if report.is_complete() {
            ReconcileOutcome::Complete { files_written }
        } else {
            warn!(
                certificate_ok = report.certificate.is_ok(),
                private_key_ok = report.private_key.is_ok(),
                "Backup pair for {}/{} is incomplete",
                record.namespace, record.name
            );
            metrics::increment_incomplete_pairs();
            ReconcileOutcome::Incomplete { files_written }
        }
    }
}
