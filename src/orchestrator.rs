//! The façade coordinating submission, status reads, listing, and deletion.
//! Owns no long-lived state beyond the configuration passed to its
//! constructor; every operation is a fresh composition of the leaf
//! components.

use futures::stream::{self, StreamExt};

use crate::config::ServiceConfig;
use crate::descriptor::FrameworkDescription;
use crate::error::{Error, Result};
use crate::launcher::{ExecutionType, LauncherClient};
use crate::spec::JobSpec;
use crate::staging::ArtifactStager;
use crate::status::{
    task_role_statuses, JobDetail, JobListing, JobOverview, JobStatus, ListFailure,
};
use crate::storage::RemoteStorageSync;

/// Upper bound on concurrent per-job status fetches during a listing.
const LIST_CONCURRENCY: usize = 8;

pub struct JobOrchestrator {
    config: ServiceConfig,
    launcher: LauncherClient,
    stager: ArtifactStager,
    storage: RemoteStorageSync,
}

impl JobOrchestrator {
    pub fn new(config: ServiceConfig) -> Self {
        let launcher = LauncherClient::new(&config.launcher);
        let stager = ArtifactStager::new(config.staging.clone());
        let storage = RemoteStorageSync::new(config.storage.clone());
        Self {
            config,
            launcher,
            stager,
            storage,
        }
    }

    /// Submit a job: validate, stage artifacts locally, sync them to the
    /// distributed filesystem, then hand the framework description to the
    /// launcher.
    ///
    /// Submission is idempotent by job name for the same owner (the
    /// launcher PUT is an update). A name already claimed by another user is
    /// a conflict. A failure after the remote sync but before the launcher
    /// accepts the PUT leaves the staged directory in place with no
    /// scheduler entry; callers should re-query before retrying.
    pub async fn submit(&self, username: &str, spec: &JobSpec) -> Result<()> {
        spec.validate()?;

        if let Some(request) = self.launcher.get_framework_request(&spec.job_name).await? {
            let owner = request
                .framework_descriptor
                .and_then(|d| d.user)
                .and_then(|u| u.name);
            if let Some(owner) = owner {
                if owner != username {
                    return Err(Error::AlreadyExists {
                        name: spec.job_name.clone(),
                        owner,
                    });
                }
                tracing::info!(job = %spec.job_name, user = username, "Updating existing framework");
            }
        }

        let output_dir =
            spec.resolve_output_dir(&self.config.storage.default_fs_uri, username);

        // Best-effort pre-creation of the output directory. The directory is
        // used by the job's own workload, not by submission itself, so a
        // failure here is logged and the submission proceeds.
        if output_dir.starts_with("hdfs://") {
            let storage = self.storage.clone();
            let dir = output_dir.clone();
            let user = username.to_string();
            let job = spec.job_name.clone();
            tokio::spawn(async move {
                if let Err(e) = storage.mkdir_p(&dir, &user).await {
                    tracing::warn!(job = %job, dir = %dir, error = %e,
                        "Output directory pre-creation failed");
                }
            });
        }

        let description = FrameworkDescription::build(spec, username);

        let job_dir = self
            .stager
            .stage(
                spec,
                username,
                &self.config.storage.default_fs_uri,
                &output_dir,
                &description,
            )
            .await?;
        tracing::info!(job = %spec.job_name, dir = %job_dir.display(), "Job artifacts staged");

        // The launcher must be able to dereference sourceLocations as soon
        // as it accepts the framework, so the upload is strictly ordered
        // before the PUT. A sync failure is fatal; the staged directory is
        // left in place for diagnosis.
        let remote_parent = self.storage.remote_job_parent(username);
        self.storage.mkdir_p(&remote_parent, username).await?;
        self.storage.upload(&job_dir, &remote_parent, username).await?;
        tracing::info!(job = %spec.job_name, remote = %remote_parent, "Job artifacts synced");

        self.launcher
            .put_framework(&spec.job_name, &description)
            .await?;
        tracing::info!(job = %spec.job_name, user = username, "Framework submitted");
        Ok(())
    }

    /// Fetch one job's status and task detail.
    ///
    /// A missing framework yields `Error::JobNotFound` carrying a stub
    /// detail with state `JOB_NOT_FOUND`; callers must check the error
    /// rather than assume the returned struct is live.
    pub async fn get(&self, name: &str) -> Result<JobDetail> {
        let info = match self.launcher.get_framework(name).await? {
            Some(info) if info.exception.is_none() => info,
            _ => {
                return Err(Error::JobNotFound {
                    name: name.to_string(),
                    stub: Box::new(JobDetail::not_found(name)),
                })
            }
        };

        let mut status = JobStatus::from_framework(name, &info);
        let task_roles = task_role_statuses(&info);

        // The status payload does not carry the owner; a second fetch of the
        // framework request recovers it.
        if let Some(request) = self.launcher.get_framework_request(name).await? {
            status.username = request
                .framework_descriptor
                .and_then(|d| d.user)
                .and_then(|u| u.name);
        }

        Ok(JobDetail { status, task_roles })
    }

    /// List all jobs known to the launcher, newest first.
    ///
    /// Per-job status fetches run with bounded concurrency; a failure for
    /// one job is collected into `failed` without poisoning its siblings.
    pub async fn list(&self) -> Result<JobListing> {
        let names = self.launcher.list_frameworks().await?;

        let results: Vec<std::result::Result<JobOverview, ListFailure>> =
            stream::iter(names.into_iter().map(|name| {
                let launcher = self.launcher.clone();
                async move {
                    match launcher.get_framework(&name).await {
                        Ok(Some(info)) if info.exception.is_none() => {
                            Ok(JobOverview::from(JobStatus::from_framework(&name, &info)))
                        }
                        Ok(_) => Err(ListFailure {
                            reason: format!("framework {name} not found"),
                            name,
                        }),
                        Err(e) => Err(ListFailure {
                            reason: e.to_string(),
                            name,
                        }),
                    }
                }
            }))
            .buffer_unordered(LIST_CONCURRENCY)
            .collect()
            .await;

        let mut jobs = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(job) => jobs.push(job),
                Err(failure) => failed.push(failure),
            }
        }
        jobs.sort_by(|a, b| b.created_time.cmp(&a.created_time));

        if !failed.is_empty() {
            tracing::warn!(failed = failed.len(), "Some job statuses could not be fetched");
        }
        Ok(JobListing { jobs, failed })
    }

    /// Delete a job. Only the recorded owner or an admin may delete; the
    /// launcher is not contacted unless the authorization check passes.
    pub async fn delete(&self, name: &str, requester: &str, is_admin: bool) -> Result<()> {
        let owner = self
            .launcher
            .get_framework_request(name)
            .await?
            .and_then(|r| r.framework_descriptor)
            .and_then(|d| d.user)
            .and_then(|u| u.name)
            .ok_or_else(|| Error::JobNotFound {
                name: name.to_string(),
                stub: Box::new(JobDetail::not_found(name)),
            })?;

        if requester != owner && !is_admin {
            return Err(Error::Unauthorized {
                name: name.to_string(),
                owner,
                requester: requester.to_string(),
            });
        }

        self.launcher.delete_framework(name).await?;
        tracing::info!(job = name, requester, "Framework deleted");
        Ok(())
    }

    /// Pass a START/STOP execution-type change through to the launcher.
    pub async fn set_execution_type(&self, name: &str, execution: ExecutionType) -> Result<()> {
        self.launcher.put_execution_type(name, execution).await
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
