//! # Secret Resolver
//!
//! Fetches the Secret holding a certificate's key material. The Secret is looked up under the
//! certificate's own namespace and name, and the bytes are read from the `tls.crt` and
//! `tls.key` entries. Missing entries are reported as absent, not as errors.

use crate::controller::error::ResolveError;
use crate::controller::types::{BackupKind, SecretMaterial};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

/// Looks up certificate key material by certificate identity
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Fetch the certificate and private key bytes for `namespace/name`.
    ///
    /// Performs a single lookup with no retry.
    async fn resolve(&self, namespace: &str, name: &str) -> Result<SecretMaterial, ResolveError>;
}

/// Resolver backed by the Kubernetes Secrets API
#[derive(Clone)]
pub struct KubeSecretResolver {
    client: Client,
}

impl std::fmt::Debug for KubeSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretResolver").finish_non_exhaustive()
    }
}

impl KubeSecretResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretResolver for KubeSecretResolver {
    async fn resolve(&self, namespace: &str, name: &str) -> Result<SecretMaterial, ResolveError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        match secrets.get(name).await {
            Ok(secret) => {
                debug!(namespace, name, "Fetched certificate secret");
                Ok(material_from_secret(&secret))
            }
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Err(ResolveError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(ResolveError::Api {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source: Box::new(e),
            }),
        }
    }
}

/// Extract the TLS entries from a Secret's data map
pub fn material_from_secret(secret: &Secret) -> SecretMaterial {
    let read = |kind: BackupKind| {
        secret
            .data
            .as_ref()
            .and_then(|data| data.get(kind.secret_key()))
            .map(|bytes| bytes.0.clone())
    };
    SecretMaterial::new(read(BackupKind::Certificate), read(BackupKind::PrivateKey))
}
