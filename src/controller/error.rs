//! # Controller Error Types
//!
//! Error taxonomy for the reconciliation pipeline. Discovery errors on the watch path are fatal
//! to the process; resolve and write errors only abandon the current certificate.

use crate::controller::types::BackupKind;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error from the Kubernetes client (or a test double)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to list certificates or to establish/maintain the certificate watch
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Initial listing failed (recoverable, treated as an empty snapshot)
    #[error("failed to list certificates: {0}")]
    List(#[source] BoxError),
    /// Watch could not be established or failed mid-stream
    #[error("certificate watch failed: {0}")]
    Watch(#[source] BoxError),
    /// Watch stream closed although no shutdown was requested
    #[error("certificate watch stream ended before shutdown was requested")]
    StreamEnded,
    /// `subscribe` was called a second time on the same source
    #[error("certificate source has already been subscribed")]
    AlreadySubscribed,
}

/// Failure to fetch the key material Secret of a certificate
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    #[error("failed to fetch secret {namespace}/{name}: {source}")]
    Api {
        namespace: String,
        name: String,
        #[source]
        source: BoxError,
    },
}

/// Filesystem failure while writing one half of a backup pair
#[derive(Debug, Error)]
#[error("failed to write {kind} backup to {}: {source}", path.display())]
pub struct WriteError {
    pub kind: BackupKind,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A Certificate object that cannot be turned into a backup candidate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("certificate object has no {0}")]
    MissingField(&'static str),
    #[error("certificate {namespace}/{name} has an unparseable creation timestamp")]
    InvalidCreationTimestamp { namespace: String, name: String },
}
