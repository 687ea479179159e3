//! # Operator Configuration
//!
//! Command-line flags plus environment overrides, resolved once before the controller starts.
//!
//! ```bash
//! cert-backup-operator --certlocation /var/backups/certs --kubeconfig ~/.kube/prod
//! ```
//!
//! A leading `~` in either path is expanded to the current user's home directory.

mod server;

pub use server::ServerConfig;

use crate::constants::{BACKUP_DIR_MODE, DEFAULT_BACKUP_DIR, DEFAULT_KUBECONFIG_PATH};
use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Startup configuration failures (always fatal)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot expand '{path}': home directory is unknown")]
    NoHomeDirectory { path: String },
    #[error("backup location {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("cannot prepare backup location {}: {source}", path.display())]
    BackupDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cert Backup Operator
#[derive(Parser, Debug, Clone)]
#[command(name = "cert-backup-operator", version)]
#[command(about = "Backs up cert-manager certificates and private keys to a local directory", long_about = None)]
pub struct Cli {
    /// Absolute path to the kubeconfig file, used when running outside the cluster
    /// (defaults to ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Absolute path to folder where certificate backups are created
    #[arg(long = "certlocation", default_value = DEFAULT_BACKUP_DIR)]
    pub cert_location: String,

    /// Port for the metrics and probe server, overrides METRICS_PORT (0 disables it)
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Kubeconfig used outside the cluster; `None` when no home directory is known
    pub kubeconfig: Option<PathBuf>,
    /// Directory backups are written to
    pub backup_dir: PathBuf,
    pub server: ServerConfig,
}

impl OperatorConfig {
    /// Resolve flags against the process environment
    ///
    /// # Errors
    ///
    /// Fails when a `~` path needs expanding and no home directory is known.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let home = std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from);
        Self::resolve(cli, home.as_deref(), ServerConfig::from_env())
    }

    /// Resolve flags with an explicit home directory and server defaults
    ///
    /// # Errors
    ///
    /// Fails when a `~` path needs expanding and `home` is `None`.
    pub fn resolve(
        cli: Cli,
        home: Option<&Path>,
        mut server: ServerConfig,
    ) -> Result<Self, ConfigError> {
        let kubeconfig = match cli.kubeconfig {
            Some(path) => Some(expand_home(&path, home)?),
            None => home.map(|home| home.join(DEFAULT_KUBECONFIG_PATH)),
        };
        let backup_dir = expand_home(&cli.cert_location, home)?;
        if let Some(port) = cli.metrics_port {
            server.metrics_port = port;
        }

        Ok(Self {
            kubeconfig,
            backup_dir,
            server,
        })
    }

    pub fn log_summary(&self) {
        info!(
            backup_dir = %self.backup_dir.display(),
            kubeconfig = self
                .kubeconfig
                .as_deref()
                .map_or_else(|| "<none>".to_string(), |p| p.display().to_string()),
            metrics_port = self.server.metrics_port,
            "Resolved configuration"
        );
    }
}

/// Replace a leading `~` (alone or followed by `/`) with `home`
///
/// # Errors
///
/// Fails when the path starts with `~` and `home` is `None`.
pub fn expand_home(path: &str, home: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return Ok(PathBuf::from(path)),
    };
    let home = home.ok_or_else(|| ConfigError::NoHomeDirectory {
        path: path.to_string(),
    })?;
    Ok(if rest.is_empty() {
        home.to_path_buf()
    } else {
        home.join(rest)
    })
}

/// Make sure the backup directory exists, creating it owner-only when missing
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or cannot be created.
pub async fn prepare_backup_dir(path: &Path) -> Result<(), ConfigError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(ConfigError::NotADirectory {
                path: path.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::BackupDirectory {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(BACKUP_DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|source| ConfigError::BackupDirectory {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), "Created backup directory");
    Ok(())
}
