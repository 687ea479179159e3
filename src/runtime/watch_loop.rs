//! # Watch Loop
//!
//! Runs the orchestrator on a worker task while the calling task waits for a shutdown signal.
//!
//! - A signal cancels the shared token. The worker finishes the certificate it is processing,
//!   releases the watch and returns; the loop then returns `Ok`.
//! - The worker returning first means the watch ended or failed without a shutdown request.
//!   That is fatal and returned as an error.

use crate::controller::{CertificateSource, DiscoveryError, Orchestrator, SecretResolver};
use crate::runtime::error_policy::handle_session_error;
use crate::runtime::shutdown::wait_for_signal;
use anyhow::{anyhow, Context, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run until SIGINT/SIGTERM or a fatal watch error
///
/// # Errors
///
/// Returns the fatal watch error, or a failure to install signal handlers.
pub async fn run_watch_loop<S, R>(
    orchestrator: Orchestrator<S, R>,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: CertificateSource + 'static,
    R: SecretResolver + 'static,
{
    run_until(orchestrator, shutdown, async {
        let signal = wait_for_signal()
            .await
            .context("Unable to install signal handlers")?;
        Ok(signal.to_string())
    })
    .await
}

/// Run the orchestrator until `stop` resolves or the worker ends on its own.
///
/// `stop` yields a description of what requested the shutdown.
///
/// # Errors
///
/// Returns an error if `stop` fails or the worker ends before `stop` resolves.
pub async fn run_until<S, R, F>(
    orchestrator: Orchestrator<S, R>,
    shutdown: CancellationToken,
    stop: F,
) -> Result<()>
where
    S: CertificateSource + 'static,
    R: SecretResolver + 'static,
    F: Future<Output = Result<String>>,
{
    let mut worker = tokio::spawn(async move { orchestrator.run().await });

    tokio::select! {
        reason = stop => {
            let reason = match reason {
                Ok(reason) => reason,
                Err(e) => {
                    shutdown.cancel();
                    return Err(e);
                }
            };
            info!("Received '{}' signal, stopping certificate watch...", reason);
            shutdown.cancel();

            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Certificate watch failed while shutting down"),
                Err(e) => error!(error = %e, "Certificate watch task did not shut down cleanly"),
            }
            info!("Exiting program due to '{}' signal.", reason);
            Ok(())
        }
        result = &mut worker => {
            shutdown.cancel();
            match result {
                Ok(Ok(())) => Err(anyhow!("certificate watch stopped without a shutdown request")),
                Ok(Err(e)) => {
                    handle_session_error(&e);
                    Err(fatal(e))
                }
                Err(e) => Err(anyhow!(e).context("Certificate watch task panicked")),
            }
        }
    }
}

fn fatal(error: DiscoveryError) -> anyhow::Error {
    anyhow::Error::new(error).context("Certificate watch terminated")
}
