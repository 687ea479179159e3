//! # Readiness Gate
//!
//! Decides whether a certificate is eligible for backup.
//!
//! Only the first reported condition is inspected and only its type is compared. cert-manager
//! does not guarantee condition ordering, so a certificate that lists `Ready` after another
//! condition is treated as not ready. This mirrors the behaviour existing backups were
//! produced with; switching to a scan by type changes which certificates get backed up.

use crate::constants::READY_CONDITION;
use crate::controller::types::CertificateRecord;

/// Returns `true` when the certificate's first condition is of type `Ready`
pub fn is_ready(record: &CertificateRecord) -> bool {
    record
        .conditions
        .first()
        .is_some_and(|condition| condition.r#type == READY_CONDITION)
}
