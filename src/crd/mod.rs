//! # Custom Resource Definitions
//!
//! cert-manager types consumed by the operator. The operator never creates or patches these
//! resources, so only the fields it reads (plus a few useful for logging) are modelled; unknown
//! fields are ignored during deserialization.
//!
//! See <https://cert-manager.io/docs/reference/api-docs/#cert-manager.io/v1.Certificate>.

mod status;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use status::{CertificateCondition, CertificateStatus};

/// cert-manager Certificate
///
/// # Example
///
/// ```yaml
/// apiVersion: cert-manager.io/v1
/// kind: Certificate
/// metadata:
///   name: api
///   namespace: prod
/// spec:
///   secretName: api
///   dnsNames:
///     - api.example.com
///   issuerRef:
///     name: letsencrypt
///     kind: ClusterIssuer
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[kube(
    kind = "Certificate",
    group = "cert-manager.io",
    version = "v1",
    namespaced,
    status = "CertificateStatus",
    shortname = "cert",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Name of the Secret cert-manager stores the issued key pair in
    #[serde(default)]
    pub secret_name: String,
    /// Requested common name
    #[serde(default)]
    pub common_name: Option<String>,
    /// Requested DNS subject alternative names
    #[serde(default)]
    pub dns_names: Vec<String>,
    /// Requested certificate lifetime (Go duration string)
    #[serde(default)]
    pub duration: Option<String>,
    /// How long before expiry cert-manager renews the certificate
    #[serde(default)]
    pub renew_before: Option<String>,
    /// Issuer that signs the certificate
    #[serde(default)]
    pub issuer_ref: Option<IssuerReference>,
}

/// Reference to an Issuer or ClusterIssuer
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerReference {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}
