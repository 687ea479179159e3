//! # Controller
//!
//! The reconciliation engine and its collaborators.
//!
//! ## Module Structure
//!
//! - `types` - Domain types (records, events, key material)
//! - `error` - Error taxonomy
//! - `source` - List-then-watch certificate discovery
//! - `readiness` - Backup eligibility policy
//! - `resolver` - Secret lookup
//! - `writer` - Idempotent backup file writer
//! - `orchestrator` - Bootstrap-then-watch pipeline
//! - `server` - Metrics and probe endpoints

pub mod error;
pub mod orchestrator;
pub mod readiness;
pub mod resolver;
pub mod server;
pub mod source;
pub mod types;
pub mod writer;

pub use error::{DiscoveryError, RecordError, ResolveError, WriteError};
pub use orchestrator::{Orchestrator, ReconcileOutcome, ReconciliationSession};
pub use readiness::is_ready;
pub use resolver::{KubeSecretResolver, SecretResolver};
pub use source::{CertificateEventStream, CertificateSource, KubeCertificateSource};
pub use types::{
    BackupKind, CertificateEvent, CertificateRecord, Observation, SecretMaterial, StatusCondition,
};
pub use writer::{BackupReport, BackupWriter, FileOutcome};
