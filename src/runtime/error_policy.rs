//! # Error Policy
//!
//! Classification and diagnostics for errors that end the certificate watch. These are fatal:
//! the process exits non-zero and relies on its supervisor (Deployment, systemd) to restart it,
//! which re-lists every certificate.

use crate::controller::DiscoveryError;
use kube::core::ErrorResponse;
use tracing::{error, warn};

/// Broad category of a watch failure, used to pick diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchFailureKind {
    /// 401 - credentials rejected
    Unauthorized,
    /// 403 - RBAC does not allow listing/watching certificates
    Forbidden,
    /// 404 - the Certificate CRD is not installed
    CrdMissing,
    /// 410 - the watch resource version expired
    ResourceVersionExpired,
    /// The stream closed without an error
    StreamEnded,
    Other,
}

/// Classify a discovery error by the API status code somewhere in its source chain
pub fn classify_discovery_error(error: &DiscoveryError) -> WatchFailureKind {
    if matches!(error, DiscoveryError::StreamEnded) {
        return WatchFailureKind::StreamEnded;
    }

    match api_status_code(error) {
        Some(401) => WatchFailureKind::Unauthorized,
        Some(403) => WatchFailureKind::Forbidden,
        Some(404) => WatchFailureKind::CrdMissing,
        Some(410) => WatchFailureKind::ResourceVersionExpired,
        _ => WatchFailureKind::Other,
    }
}

/// Status code of the first API server error response in the chain
fn api_status_code(error: &(dyn std::error::Error + 'static)) -> Option<u16> {
    let mut current = Some(error);
    while let Some(cause) = current {
        if let Some(response) = cause.downcast_ref::<ErrorResponse>() {
            return Some(response.code);
        }
        current = cause.source();
    }
    None
}

/// Log a fatal watch error with operator-facing remediation hints
pub fn handle_session_error(error: &DiscoveryError) {
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "operator.watch.error",
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Error watching for certificates: {}", error);

    match classify_discovery_error(error) {
        WatchFailureKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized) - the token or kubeconfig credentials were rejected");
            error!("   Verify the kubeconfig or ServiceAccount token is still valid");
        }
        WatchFailureKind::Forbidden => {
            error!("Watch is not permitted (403 Forbidden) - RBAC is missing or was revoked");
            error!("   The operator needs list/watch on certificates.cert-manager.io and get on secrets:");
            error!("      kubectl auth can-i watch certificates.cert-manager.io --all-namespaces");
            error!("      kubectl auth can-i get secrets --all-namespaces");
        }
        WatchFailureKind::CrdMissing => {
            error!("Certificate resources are not served by the API server. Is cert-manager installed?");
            error!("      kubectl get crd certificates.cert-manager.io");
        }
        WatchFailureKind::ResourceVersionExpired => {
            warn!("Watch resource version expired (410 Gone); exiting so the restarted operator re-lists every certificate");
        }
        WatchFailureKind::StreamEnded => {
            warn!("The API server closed the certificate watch; exiting so the supervisor restarts the operator");
        }
        WatchFailureKind::Other => {}
    }
}
