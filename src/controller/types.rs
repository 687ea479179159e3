//! # Controller Types
//!
//! Domain types flowing through the reconciliation pipeline.

use crate::constants::{TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY};
use crate::controller::error::RecordError;
use crate::crd::Certificate;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single status condition as reported by the issuing controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCondition {
    pub r#type: String,
    pub status: String,
}

impl StatusCondition {
    pub fn new(r#type: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            status: status.into(),
        }
    }
}

/// Point-in-time view of a Certificate resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub namespace: String,
    pub name: String,
    /// Immutable creation time, truncated to seconds by the API server
    pub creation_timestamp: DateTime<Utc>,
    /// Conditions in reported order
    pub conditions: Vec<StatusCondition>,
}

impl CertificateRecord {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        creation_timestamp: DateTime<Utc>,
        conditions: Vec<StatusCondition>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            creation_timestamp,
            conditions,
        }
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl TryFrom<&Certificate> for CertificateRecord {
    type Error = RecordError;

    fn try_from(certificate: &Certificate) -> Result<Self, Self::Error> {
        let meta = &certificate.metadata;
        let namespace = meta
            .namespace
            .clone()
            .ok_or(RecordError::MissingField("namespace"))?;
        let name = meta.name.clone().ok_or(RecordError::MissingField("name"))?;
        if meta.creation_timestamp.is_none() {
            return Err(RecordError::MissingField("creation timestamp"));
        }
        let Some(creation_timestamp) = creation_timestamp(meta) else {
            return Err(RecordError::InvalidCreationTimestamp { namespace, name });
        };

        let conditions = certificate
            .status
            .as_ref()
            .map(|status| {
                status
                    .conditions
                    .iter()
                    .map(|c| StatusCondition::new(c.r#type.clone(), c.status.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            namespace,
            name,
            creation_timestamp,
            conditions,
        })
    }
}

/// Read `metadata.creationTimestamp` as a UTC datetime.
///
/// `Time` always serializes as an RFC3339 string, which keeps this independent of the datetime
/// crate backing k8s-openapi.
fn creation_timestamp(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    let time = meta.creation_timestamp.as_ref()?;
    let serde_json::Value::String(raw) = serde_json::to_value(time).ok()? else {
        return None;
    };
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Typed watch notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateEvent {
    Added(CertificateRecord),
    Modified(CertificateRecord),
    /// Deletions, bookmarks and protocol markers; never acted upon
    Other,
}

/// Where a record was observed, used for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Snapshot,
    Added,
    Modified,
}

impl Observation {
    pub fn as_str(self) -> &'static str {
        match self {
            Observation::Snapshot => "snapshot",
            Observation::Added => "added",
            Observation::Modified => "modified",
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two halves of a backup pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupKind {
    Certificate,
    PrivateKey,
}

impl BackupKind {
    pub const ALL: [BackupKind; 2] = [BackupKind::Certificate, BackupKind::PrivateKey];

    /// Backup file extension
    pub fn extension(self) -> &'static str {
        match self {
            BackupKind::Certificate => "crt",
            BackupKind::PrivateKey => "key",
        }
    }

    /// Secret data key the bytes are read from
    pub fn secret_key(self) -> &'static str {
        match self {
            BackupKind::Certificate => TLS_CERT_KEY,
            BackupKind::PrivateKey => TLS_PRIVATE_KEY_KEY,
        }
    }

    /// Label value for metrics
    pub fn as_str(self) -> &'static str {
        match self {
            BackupKind::Certificate => "certificate",
            BackupKind::PrivateKey => "private_key",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Certificate => f.write_str("certificate"),
            BackupKind::PrivateKey => f.write_str("private key"),
        }
    }
}

/// Certificate and private key bytes read from a Secret.
///
/// Either half may be missing when cert-manager has not populated the Secret yet.
/// The bytes are zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial {
    certificate: Option<Vec<u8>>,
    private_key: Option<Vec<u8>>,
}

impl SecretMaterial {
    pub fn new(certificate: Option<Vec<u8>>, private_key: Option<Vec<u8>>) -> Self {
        Self {
            certificate,
            private_key,
        }
    }

    pub fn get(&self, kind: BackupKind) -> Option<&[u8]> {
        match kind {
            BackupKind::Certificate => self.certificate.as_deref(),
            BackupKind::PrivateKey => self.private_key.as_deref(),
        }
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("certificate_len", &self.certificate.as_ref().map(Vec::len))
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
