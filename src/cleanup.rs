//! Background cleanup of aged staged job directories.
//!
//! After a successful remote sync the local job directory is only a
//! historical artifact; this sweeper removes copies older than the
//! configured TTL. It is an independent task scheduled by the caller, not a
//! side effect of constructing the orchestrator.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::StagingConfig;

/// Remove staged job directories older than `config.cleanup_ttl`.
/// Returns the number of directories removed. Per-directory failures are
/// logged and skipped; a missing staging root is not an error.
pub async fn sweep_once(config: &StagingConfig) -> usize {
    let mut removed = 0;

    let mut users = match tokio::fs::read_dir(&config.root).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    while let Ok(Some(user_entry)) = users.next_entry().await {
        let mut jobs = match tokio::fs::read_dir(user_entry.path()).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        while let Ok(Some(job_entry)) = jobs.next_entry().await {
            let path = job_entry.path();
            if !path.is_dir() {
                continue;
            }
            let age = job_entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.elapsed().ok());
            let Some(age) = age else { continue };

            if age >= config.cleanup_ttl {
                match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        tracing::info!(dir = %path.display(), age_secs = age.as_secs(),
                            "Removed aged staging directory");
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(dir = %path.display(), error = %e,
                            "Failed to remove staging directory");
                    }
                }
            }
        }
    }

    removed
}

/// Periodic sweep loop. Runs until the token is cancelled.
pub async fn run(config: StagingConfig, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Staging sweeper shutting down");
                return;
            }
            _ = ticker.tick() => {
                let removed = sweep_once(&config).await;
                if removed > 0 {
                    tracing::info!(removed, "Staging sweep complete");
                }
            }
        }
    }
}
