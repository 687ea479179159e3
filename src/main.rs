//! # Cert Backup Operator
//!
//! Keeps an out-of-band copy of every ready cert-manager certificate and its private key.
//!
//! ## Overview
//!
//! 1. **Lists certificates** - every `cert-manager.io/v1` Certificate across all namespaces
//! 2. **Watches certificates** - additions and modifications are processed in order
//! 3. **Gates on readiness** - only certificates whose first condition is `Ready` are copied
//! 4. **Writes backups once** - `{namespace}_{name}_{YYYYMMDD}_{HHMMSS}.crt` and `.key`
//!    are created in the backup directory and never overwritten or deleted
//!
//! Interrupt and termination signals stop the watch after the certificate in flight.
//! A watch that fails or ends on its own exits the process with a non-zero status.
//!
//! ## Usage
//!
//! ```bash
//! cert-backup-operator --certlocation ~/cert-backup --kubeconfig ~/.kube/config
//! ```

use anyhow::Result;
use cert_backup_operator::config::Cli;
use cert_backup_operator::controller::{
    BackupWriter, KubeCertificateSource, KubeSecretResolver, Orchestrator,
};
use cert_backup_operator::runtime::{initialize, run_watch_loop};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the operator runtime
    let init = initialize(cli).await?;

    let orchestrator = Orchestrator::new(
        KubeCertificateSource::new(init.client.clone()),
        KubeSecretResolver::new(init.client.clone()),
        BackupWriter::new(init.config.backup_dir.clone()),
        init.shutdown.clone(),
    )
    .with_watch_flag(init.server_state.is_watching.clone());

    // Run the watch loop until a signal arrives or the watch fails
    run_watch_loop(orchestrator, init.shutdown).await
}
