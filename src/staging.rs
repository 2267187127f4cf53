//! On-disk job directory staging.
//!
//! The stager owns the job directory for the duration of a submission call.
//! The four write groups (subdirectories, per-role scripts, job-config JSON,
//! framework-description JSON) touch disjoint paths and run concurrently; a
//! failure in any group fails the whole staging step.

use std::path::{Path, PathBuf};

use crate::config::StagingConfig;
use crate::descriptor::FrameworkDescription;
use crate::error::{Error, Result};
use crate::scripts::ScriptContext;
use crate::spec::JobSpec;

pub const YARN_SCRIPT_DIR: &str = "YarnContainerScripts";
pub const DOCKER_SCRIPT_DIR: &str = "DockerContainerScripts";

#[derive(Debug, Clone)]
pub struct ArtifactStager {
    config: StagingConfig,
}

impl ArtifactStager {
    pub fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    /// Local staging directory for one job, namespaced by username.
    pub fn job_dir(&self, username: &str, job_name: &str) -> PathBuf {
        self.config.root.join(username).join(job_name)
    }

    /// Write the complete staged artifact tree for a submission and return
    /// the job directory. Nothing is uploaded here.
    pub async fn stage(
        &self,
        spec: &JobSpec,
        username: &str,
        default_fs_uri: &str,
        output_dir: &str,
        description: &FrameworkDescription,
    ) -> Result<PathBuf> {
        let job_dir = self.job_dir(username, &spec.job_name);
        create_dir_all(&job_dir).await?;

        let job_config_path = job_dir.join(&self.config.job_config_filename);
        let description_path = job_dir.join(&self.config.framework_description_filename);

        tokio::try_join!(
            self.ensure_subdirs(&job_dir),
            self.write_scripts(spec, username, default_fs_uri, output_dir, &job_dir),
            write_json(&job_config_path, spec),
            write_json(&description_path, description),
        )?;

        Ok(job_dir)
    }

    async fn ensure_subdirs(&self, job_dir: &Path) -> Result<()> {
        create_dir_all(&job_dir.join("tmp")).await?;
        create_dir_all(&job_dir.join("finished")).await?;
        Ok(())
    }

    /// One YARN script and one Docker script per task role, addressed by the
    /// role's array index.
    async fn write_scripts(
        &self,
        spec: &JobSpec,
        username: &str,
        default_fs_uri: &str,
        output_dir: &str,
        job_dir: &Path,
    ) -> Result<()> {
        let yarn_dir = job_dir.join(YARN_SCRIPT_DIR);
        let docker_dir = job_dir.join(DOCKER_SCRIPT_DIR);
        create_dir_all(&yarn_dir).await?;
        create_dir_all(&docker_dir).await?;

        for role_index in 0..spec.task_roles.len() {
            let context = ScriptContext {
                spec,
                role_index,
                username,
                default_fs_uri,
                output_dir,
            };
            let filename = format!("{role_index}.sh");
            write_file(&yarn_dir.join(&filename), &context.yarn_container_script()?).await?;
            write_file(
                &docker_dir.join(&filename),
                &context.docker_container_script()?,
            )
            .await?;
        }
        Ok(())
    }
}

async fn create_dir_all(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::StagingFailure {
            path: path.display().to_string(),
            source,
        })
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| Error::StagingFailure {
            path: path.display().to_string(),
            source,
        })
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).map_err(|e| Error::StagingFailure {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    write_file(path, &body).await
}
