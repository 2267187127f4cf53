//! Remote sync of staged job directories to the distributed filesystem.
//!
//! Shells out to the filesystem client under the job owner's identity. The
//! only contract is "succeeds or returns an error"; stdout/stderr are
//! captured for diagnostics.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Environment variable through which the filesystem client impersonates
/// the acting user.
const IMPERSONATION_ENV: &str = "HADOOP_USER_NAME";

#[derive(Debug, Clone)]
pub struct RemoteStorageSync {
    config: StorageConfig,
}

impl RemoteStorageSync {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Remote directory that holds one job's uploaded artifacts.
    pub fn remote_job_parent(&self, username: &str) -> String {
        format!(
            "{}/Container/{}",
            self.config.default_fs_uri.trim_end_matches('/'),
            username
        )
    }

    /// `mkdir -p` on the distributed filesystem.
    pub async fn mkdir_p(&self, remote_path: &str, username: &str) -> Result<()> {
        self.run(&["dfs", "-mkdir", "-p", remote_path], username)
            .await
    }

    /// Recursive upload of a local directory under a remote parent,
    /// overwriting any previous copy.
    pub async fn upload(&self, local_dir: &Path, remote_parent: &str, username: &str) -> Result<()> {
        let local = local_dir.display().to_string();
        self.run(&["dfs", "-put", "-f", &local, remote_parent], username)
            .await
    }

    async fn run(&self, args: &[&str], username: &str) -> Result<()> {
        let rendered = format!("{} {}", self.config.client_command, args.join(" "));
        tracing::debug!(command = %rendered, user = username, "Running filesystem client");

        let output = Command::new(&self.config.client_command)
            .args(args)
            .env(IMPERSONATION_ENV, username)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::RemoteSyncFailure {
                command: rendered.clone(),
                status: "spawn failed".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::error!(command = %rendered, status = ?output.status.code(), stderr = %stderr,
                "Filesystem client failed");
            return Err(Error::RemoteSyncFailure {
                command: rendered,
                status: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            tracing::debug!(command = %rendered, output = %stdout, "Filesystem client output");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_with_command(command: &str) -> RemoteStorageSync {
        RemoteStorageSync::new(StorageConfig {
            default_fs_uri: "hdfs://nn:9000".to_string(),
            client_command: command.to_string(),
        })
    }

    #[test]
    fn remote_job_parent_layout() {
        let sync = sync_with_command("hdfs");
        assert_eq!(
            sync.remote_job_parent("alice"),
            "hdfs://nn:9000/Container/alice"
        );
    }

    #[tokio::test]
    async fn successful_command_is_ok() {
        let sync = sync_with_command("true");
        assert!(sync.mkdir_p("/anywhere", "alice").await.is_ok());
    }

    #[tokio::test]
    async fn failing_command_surfaces_exit_status() {
        let sync = sync_with_command("false");
        let err = sync.mkdir_p("/anywhere", "alice").await.unwrap_err();
        match err {
            Error::RemoteSyncFailure { command, status, .. } => {
                assert!(command.contains("-mkdir -p /anywhere"));
                assert_eq!(status, "1");
            }
            other => panic!("expected RemoteSyncFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failure() {
        let sync = sync_with_command("definitely_not_a_real_binary_7913");
        let err = sync
            .upload(Path::new("/tmp/x"), "/remote", "alice")
            .await
            .unwrap_err();
        match err {
            Error::RemoteSyncFailure { status, .. } => assert_eq!(status, "spawn failed"),
            other => panic!("expected RemoteSyncFailure, got {other:?}"),
        }
    }
}
