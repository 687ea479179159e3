//! # Certificate Status
//!
//! Status types reported by cert-manager on a Certificate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the Certificate resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    /// Conditions in the order cert-manager reported them
    #[serde(default)]
    pub conditions: Vec<CertificateCondition>,
    /// Expiry of the currently issued certificate (RFC3339)
    #[serde(default)]
    pub not_after: Option<String>,
    /// Start of validity of the currently issued certificate (RFC3339)
    #[serde(default)]
    pub not_before: Option<String>,
    /// When cert-manager will next attempt renewal (RFC3339)
    #[serde(default)]
    pub renewal_time: Option<String>,
    /// Incremented on every issuance
    #[serde(default)]
    pub revision: Option<i64>,
}

/// Condition represents a condition of a Certificate
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCondition {
    /// Type of condition (Ready, Issuing)
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
    /// Generation the condition was computed for
    #[serde(default)]
    pub observed_generation: Option<i64>,
}
