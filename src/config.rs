use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the external Framework Launcher REST endpoint.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Base URI of the launcher webservice, e.g. "http://launcher:9086"
    pub webservice_uri: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            webservice_uri: "http://127.0.0.1:9086".to_string(),
        }
    }
}

impl LauncherConfig {
    /// Root of the framework collection on the launcher.
    pub fn frameworks_uri(&self) -> String {
        format!("{}/v1/Frameworks", self.webservice_uri.trim_end_matches('/'))
    }
}

/// Configuration for the distributed filesystem that staged job
/// directories are uploaded to.
///
/// Uploads shell out to the filesystem CLI and impersonate the job owner
/// through the `HADOOP_USER_NAME` environment variable.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root URI of the distributed filesystem, e.g. "hdfs://namenode:9000"
    pub default_fs_uri: String,
    /// Client binary to invoke ("hdfs"). Overridable for tests.
    pub client_command: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_fs_uri: "hdfs://127.0.0.1:9000".to_string(),
            client_command: "hdfs".to_string(),
        }
    }
}

/// Configuration for the local staging area where job artifacts are
/// written before upload.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Local directory under which `{username}/{jobName}` job dirs are staged
    pub root: PathBuf,
    /// Filename of the staged copy of the submitted job spec
    pub job_config_filename: String,
    /// Filename of the staged framework description document
    pub framework_description_filename: String,
    /// Staged directories older than this are eligible for cleanup
    pub cleanup_ttl: Duration,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/tmp/skipper/jobs"),
            job_config_filename: "JobConfig.json".to_string(),
            framework_description_filename: "FrameworkDescription.json".to_string(),
            cleanup_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// Top-level configuration passed into the orchestrator's constructor.
/// There is no module-level mutable state; every component reads from
/// this struct.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub launcher: LauncherConfig,
    pub storage: StorageConfig,
    pub staging: StagingConfig,
}

impl ServiceConfig {
    pub fn new(launcher_uri: String, default_fs_uri: String, staging_root: PathBuf) -> Self {
        Self {
            launcher: LauncherConfig {
                webservice_uri: launcher_uri,
            },
            storage: StorageConfig {
                default_fs_uri,
                ..StorageConfig::default()
            },
            staging: StagingConfig {
                root: staging_root,
                ..StagingConfig::default()
            },
        }
    }

    pub fn with_client_command(mut self, command: impl Into<String>) -> Self {
        self.storage.client_command = command.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_config_default() {
        let cfg = LauncherConfig::default();
        assert_eq!(cfg.webservice_uri, "http://127.0.0.1:9086");
        assert_eq!(cfg.frameworks_uri(), "http://127.0.0.1:9086/v1/Frameworks");
    }

    #[test]
    fn frameworks_uri_strips_trailing_slash() {
        let cfg = LauncherConfig {
            webservice_uri: "http://launcher:9086/".to_string(),
        };
        assert_eq!(cfg.frameworks_uri(), "http://launcher:9086/v1/Frameworks");
    }

    #[test]
    fn storage_config_default() {
        let cfg = StorageConfig::default();
        assert_eq!(cfg.default_fs_uri, "hdfs://127.0.0.1:9000");
        assert_eq!(cfg.client_command, "hdfs");
    }

    #[test]
    fn staging_config_default() {
        let cfg = StagingConfig::default();
        assert_eq!(cfg.root, PathBuf::from("/tmp/skipper/jobs"));
        assert_eq!(cfg.job_config_filename, "JobConfig.json");
        assert_eq!(
            cfg.framework_description_filename,
            "FrameworkDescription.json"
        );
    }

    #[test]
    fn service_config_new() {
        let cfg = ServiceConfig::new(
            "http://launcher:9086".to_string(),
            "hdfs://nn:9000".to_string(),
            PathBuf::from("/var/jobs"),
        )
        .with_client_command("true");
        assert_eq!(cfg.launcher.webservice_uri, "http://launcher:9086");
        assert_eq!(cfg.storage.default_fs_uri, "hdfs://nn:9000");
        assert_eq!(cfg.storage.client_command, "true");
        assert_eq!(cfg.staging.root, PathBuf::from("/var/jobs"));
    }
}
