//! # Constants
//!
//! Defaults and well-known names shared across the operator.

/// Default backup directory (a leading `~` is expanded to the home directory)
pub const DEFAULT_BACKUP_DIR: &str = "~/cert-backup";

/// Kubeconfig location relative to the home directory
pub const DEFAULT_KUBECONFIG_PATH: &str = ".kube/config";

/// Environment variable that is only present inside a Kubernetes pod
pub const IN_CLUSTER_ENV_VAR: &str = "KUBERNETES_SERVICE_HOST";

/// Secret data key holding the PEM encoded certificate chain
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret data key holding the PEM encoded private key
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Condition type cert-manager reports once the certificate has been issued
pub const READY_CONDITION: &str = "Ready";

/// Permissions for backup files (owner read/write/execute)
pub const BACKUP_FILE_MODE: u32 = 0o700;

/// Permissions for a backup directory created by the operator
pub const BACKUP_DIR_MODE: u32 = 0o700;

/// Creation timestamp layout embedded in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "cert_backup_operator=info";

/// HTTP server port for metrics and probes (`0` disables the server)
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// How long to wait for the HTTP server to bind before giving up
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Poll interval while waiting for the HTTP server to bind
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
