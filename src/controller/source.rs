//! # Certificate Source
//!
//! List-then-watch discovery of cert-manager Certificates across all namespaces.
//!
//! The snapshot is advisory: a failed listing is survivable because the watch replays every
//! live Certificate when it starts. The watch is subscribed once per source and its stream is
//! expected to live until shutdown. Any watcher error, a 410 Gone resource version expiry
//! included, is yielded as a [`DiscoveryError::Watch`] item and is fatal to the process.

use crate::controller::error::DiscoveryError;
use crate::controller::types::{CertificateEvent, CertificateRecord};
use crate::crd::Certificate;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::ListParams;
use kube::{Api, Client};
use kube_runtime::watcher;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Ordered stream of certificate notifications
pub type CertificateEventStream = BoxStream<'static, Result<CertificateEvent, DiscoveryError>>;

/// Discovery protocol for Certificates
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Enumerate all current Certificates
    async fn snapshot(&self) -> Result<Vec<CertificateRecord>, DiscoveryError>;

    /// Open the long-lived notification stream. Callable once per source.
    async fn subscribe(&self) -> Result<CertificateEventStream, DiscoveryError>;
}

/// Certificate source backed by the Kubernetes API
pub struct KubeCertificateSource {
    api: Api<Certificate>,
    subscribed: AtomicBool,
}

impl std::fmt::Debug for KubeCertificateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCertificateSource")
            .field("subscribed", &self.subscribed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl KubeCertificateSource {
    /// Watch Certificates in all namespaces
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
            subscribed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl CertificateSource for KubeCertificateSource {
    async fn snapshot(&self) -> Result<Vec<CertificateRecord>, DiscoveryError> {
        let list = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| DiscoveryError::List(Box::new(e)))?;

        Ok(list.items.iter().filter_map(record_or_warn).collect())
    }

    async fn subscribe(&self) -> Result<CertificateEventStream, DiscoveryError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(DiscoveryError::AlreadySubscribed);
        }

        // The watcher resumes from the last resource version when the API server closes a
        // watch on timeout. Every error it yields ends the session, including a 410 Gone for
        // an expired resource version: the process exits and the restarted operator re-lists.
        let stream = watcher(self.api.clone(), watcher::Config::default())
            .filter_map(|item| async move { map_watch_item(item) })
            .boxed();

        Ok(stream)
    }
}

/// Translate one watcher stream item. Every watcher error becomes a fatal [`DiscoveryError::Watch`].
pub fn map_watch_item(
    item: Result<watcher::Event<Certificate>, watcher::Error>,
) -> Option<Result<CertificateEvent, DiscoveryError>> {
    match item {
        Ok(event) => map_watch_event(event).map(Ok),
        Err(e) => Some(Err(DiscoveryError::Watch(Box::new(e)))),
    }
}

/// Translate a raw watcher event into a typed notification.
///
/// The watcher folds ADDED and MODIFIED into `Apply`; objects replayed during the initial
/// listing arrive as `InitApply` and are reported as additions. Returns `None` for objects that
/// cannot be mapped to a record.
pub fn map_watch_event(event: watcher::Event<Certificate>) -> Option<CertificateEvent> {
    match event {
        watcher::Event::InitApply(certificate) => {
            record_or_warn(&certificate).map(CertificateEvent::Added)
        }
        watcher::Event::Apply(certificate) => {
            record_or_warn(&certificate).map(CertificateEvent::Modified)
        }
        watcher::Event::Delete(_) | watcher::Event::Init | watcher::Event::InitDone => {
            Some(CertificateEvent::Other)
        }
    }
}

fn record_or_warn(certificate: &Certificate) -> Option<CertificateRecord> {
    match CertificateRecord::try_from(certificate) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(
                name = certificate.metadata.name.as_deref().unwrap_or("unknown"),
                namespace = certificate.metadata.namespace.as_deref().unwrap_or("unknown"),
                error = %e,
                "Ignoring certificate that cannot be backed up"
            );
            None
        }
    }
}
