//! # Backup Writer
//!
//! Persists certificate and private key bytes under deterministic file names:
//!
//! ```text
//! {namespace}_{name}_{YYYYMMDD}_{HHMMSS}.crt
//! {namespace}_{name}_{YYYYMMDD}_{HHMMSS}.key
//! ```
//!
//! The timestamp is the certificate's creation time in UTC, so the same certificate instance
//! always maps to the same pair of paths and a re-created certificate maps to a new pair.
//!
//! Each path is written at most once. An existing file is never compared, overwritten or
//! deleted. The two halves are handled independently and there is no rollback: when one half
//! fails the other stays on disk and the [`BackupReport`] says so.

use crate::constants::{BACKUP_FILE_MODE, BACKUP_TIMESTAMP_FORMAT};
use crate::controller::error::WriteError;
use crate::controller::types::{BackupKind, CertificateRecord, SecretMaterial};
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Result of handling one half of a backup pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// File did not exist and was written
    Written,
    /// File already existed and was left untouched
    AlreadyPresent,
    /// The Secret had no bytes for this half; nothing was written
    MissingMaterial,
}

impl FileOutcome {
    /// Whether a backup for this half exists after the write attempt
    pub fn is_on_disk(self) -> bool {
        matches!(self, FileOutcome::Written | FileOutcome::AlreadyPresent)
    }
}

/// Outcome of writing a certificate/key pair
#[derive(Debug)]
pub struct BackupReport {
    pub certificate: Result<FileOutcome, WriteError>,
    pub private_key: Result<FileOutcome, WriteError>,
}

impl BackupReport {
    pub fn outcome(&self, kind: BackupKind) -> &Result<FileOutcome, WriteError> {
        match kind {
            BackupKind::Certificate => &self.certificate,
            BackupKind::PrivateKey => &self.private_key,
        }
    }

    /// Both halves are on disk
    pub fn is_complete(&self) -> bool {
        BackupKind::ALL
            .iter()
            .all(|kind| matches!(self.outcome(*kind), Ok(outcome) if outcome.is_on_disk()))
    }

    /// Number of files created by this call
    pub fn files_written(&self) -> usize {
        BackupKind::ALL
            .iter()
            .filter(|kind| matches!(self.outcome(**kind), Ok(FileOutcome::Written)))
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &WriteError> {
        [&self.certificate, &self.private_key]
            .into_iter()
            .filter_map(|outcome| outcome.as_ref().err())
    }
}

/// File name for one half of a certificate's backup
pub fn backup_file_name(record: &CertificateRecord, kind: BackupKind) -> String {
    format!(
        "{}_{}_{}.{}",
        record.namespace,
        record.name,
        record.creation_timestamp.format(BACKUP_TIMESTAMP_FORMAT),
        kind.extension()
    )
}

/// Writes backup pairs into a single directory
#[derive(Debug, Clone)]
pub struct BackupWriter {
    base_dir: PathBuf,
}

impl BackupWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn backup_path(&self, record: &CertificateRecord, kind: BackupKind) -> PathBuf {
        self.base_dir.join(backup_file_name(record, kind))
    }

    /// Write both halves of the backup pair, skipping any that already exist
    pub async fn write(&self, record: &CertificateRecord, material: &SecretMaterial) -> BackupReport {
        self.write_with(&ExclusiveFileOpener, record, material).await
    }

    async fn write_with<O: SinkOpener>(
        &self,
        opener: &O,
        record: &CertificateRecord,
        material: &SecretMaterial,
    ) -> BackupReport {
        BackupReport {
            certificate: self
                .write_file(opener, record, BackupKind::Certificate, material)
                .await,
            private_key: self
                .write_file(opener, record, BackupKind::PrivateKey, material)
                .await,
        }
    }

    async fn write_file<O: SinkOpener>(
        &self,
        opener: &O,
        record: &CertificateRecord,
        kind: BackupKind,
        material: &SecretMaterial,
    ) -> Result<FileOutcome, WriteError> {
        let path = self.backup_path(record, kind);

        match tokio::fs::try_exists(&path).await {
            Ok(true) => {
                debug!(
                    namespace = %record.namespace,
                    name = %record.name,
                    path = %path.display(),
                    "{} backup already present, skipping", kind
                );
                return Ok(FileOutcome::AlreadyPresent);
            }
            Ok(false) => {}
            Err(source) => return Err(WriteError { kind, path, source }),
        }

        let Some(bytes) = material.get(kind) else {
            warn!(
                namespace = %record.namespace,
                name = %record.name,
                secret_key = kind.secret_key(),
                "Secret has no {} data yet, not writing {}", kind, path.display()
            );
            return Ok(FileOutcome::MissingMaterial);
        };

        info!(
            "Saving {} for {}/{} to {}...",
            kind,
            record.namespace,
            record.name,
            path.display()
        );

        let sink = match opener.open(&path).await {
            Ok(sink) => sink,
            // Lost a race with another writer; the existing file wins
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Ok(FileOutcome::AlreadyPresent)
            }
            Err(source) => return Err(WriteError { kind, path, source }),
        };

        persist(sink, path, kind, bytes).await
    }
}

/// Destination of one backup file's bytes
trait BackupSink: AsyncWrite + Unpin + Send {
    /// Flush the bytes to durable storage
    fn sync(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

impl BackupSink for File {
    async fn sync(&mut self) -> io::Result<()> {
        self.sync_all().await
    }
}

/// Creates the sink for a backup path that does not exist yet
trait SinkOpener: Sync {
    type Sink: BackupSink;

    /// Must fail with [`ErrorKind::AlreadyExists`] when `path` is already present
    fn open(&self, path: &Path) -> impl Future<Output = io::Result<Self::Sink>> + Send;
}

/// Opens backup files exclusively, owner-only
struct ExclusiveFileOpener;

impl SinkOpener for ExclusiveFileOpener {
    type Sink = File;

    async fn open(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(BACKUP_FILE_MODE);
        options.open(path).await
    }
}

/// Write `bytes` to a freshly created backup file. On failure the file is removed so a
/// truncated backup cannot block later attempts for the same path.
async fn persist<W: BackupSink>(
    mut sink: W,
    path: PathBuf,
    kind: BackupKind,
    bytes: &[u8],
) -> Result<FileOutcome, WriteError> {
    let written = async {
        sink.write_all(bytes).await?;
        sink.sync().await
    }
    .await;

    if let Err(source) = written {
        drop(sink);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially written backup"
            );
        }
        return Err(WriteError { kind, path, source });
    }

    Ok(FileOutcome::Written)
}
