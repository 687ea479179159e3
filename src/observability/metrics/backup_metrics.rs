//! # Backup Metrics
//!
//! Metrics for the backup pipeline: observed certificates, readiness skips, backup files and
//! errors.

use crate::controller::types::{BackupKind, Observation};
use crate::controller::writer::FileOutcome;
use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec};
use std::sync::LazyLock;

static CERTIFICATES_OBSERVED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cert_backup_certificates_observed_total",
            "Total number of certificate observations processed",
        ),
        &["observation"],
    )
    .expect("Failed to create CERTIFICATES_OBSERVED_TOTAL metric - this should never happen")
});

static NOT_READY_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_backup_not_ready_total",
        "Total number of observations skipped because the certificate was not ready",
    )
    .expect("Failed to create NOT_READY_TOTAL metric - this should never happen")
});

static BACKUP_FILES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cert_backup_files_total",
            "Backup file handling by kind and outcome (written, already_present, missing_material)",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create BACKUP_FILES_TOTAL metric - this should never happen")
});

static RESOLVE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_backup_resolve_errors_total",
        "Total number of failures fetching certificate secrets",
    )
    .expect("Failed to create RESOLVE_ERRORS_TOTAL metric - this should never happen")
});

static WRITE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cert_backup_write_errors_total",
            "Total number of failures writing backup files",
        ),
        &["kind"],
    )
    .expect("Failed to create WRITE_ERRORS_TOTAL metric - this should never happen")
});

static INCOMPLETE_PAIRS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cert_backup_incomplete_pairs_total",
        "Total number of reconciliations that left a backup pair incomplete",
    )
    .expect("Failed to create INCOMPLETE_PAIRS_TOTAL metric - this should never happen")
});

/// Register backup metrics with the registry
pub(crate) fn register_backup_metrics() -> Result<()> {
    REGISTRY.register(Box::new(CERTIFICATES_OBSERVED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NOT_READY_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BACKUP_FILES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOLVE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WRITE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INCOMPLETE_PAIRS_TOTAL.clone()))?;
    Ok(())
}

fn outcome_label(outcome: FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::Written => "written",
        FileOutcome::AlreadyPresent => "already_present",
        FileOutcome::MissingMaterial => "missing_material",
    }
}

pub fn increment_certificates_observed(observation: Observation) {
    CERTIFICATES_OBSERVED_TOTAL
        .with_label_values(&[observation.as_str()])
        .inc();
}

pub fn increment_not_ready() {
    NOT_READY_TOTAL.inc();
}

pub fn record_backup_file(kind: BackupKind, outcome: FileOutcome) {
    BACKUP_FILES_TOTAL
        .with_label_values(&[kind.as_str(), outcome_label(outcome)])
        .inc();
}

pub fn increment_resolve_errors() {
    RESOLVE_ERRORS_TOTAL.inc();
}

pub fn increment_write_errors(kind: BackupKind) {
    WRITE_ERRORS_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

pub fn increment_incomplete_pairs() {
    INCOMPLETE_PAIRS_TOTAL.inc();
}
