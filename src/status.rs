use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::launcher::{FrameworkInfo, FrameworkStatus, RawTaskStatus, RetryPolicyState};

/// Public job lifecycle state. Clients see this four-value surface (plus the
/// not-found stub) regardless of how many native states the scheduler has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Waiting,
    Running,
    Succeeded,
    Failed,
    JobNotFound,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Waiting => write!(f, "WAITING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::JobNotFound => write!(f, "JOB_NOT_FOUND"),
        }
    }
}

/// Map a native framework/application state pair to the public job state.
///
/// First match wins. A pair outside the table returns `None` and the caller
/// keeps whatever state it already had. `APPLICATION_COMPLETED` is still
/// reported as RUNNING: the application has finished but the framework has
/// not, and the user-visible job is not done yet.
pub fn convert_job_state(framework_state: &str, exit_type: Option<&str>) -> Option<JobState> {
    match framework_state {
        "FRAMEWORK_WAITING" | "APPLICATION_CREATED" | "APPLICATION_LAUNCHED"
        | "APPLICATION_WAITING" => Some(JobState::Waiting),
        "APPLICATION_RUNNING" | "APPLICATION_RETRIEVING_DIAGNOSTICS" | "APPLICATION_COMPLETED" => {
            Some(JobState::Running)
        }
        "FRAMEWORK_COMPLETED" => {
            if exit_type == Some("SUCCEEDED") {
                Some(JobState::Succeeded)
            } else {
                Some(JobState::Failed)
            }
        }
        _ => None,
    }
}

/// Sum of the four independent native retry counters.
pub fn total_retries(state: &RetryPolicyState) -> u64 {
    u64::from(state.transient_normal_retried_count)
        + u64::from(state.transient_conflict_retried_count)
        + u64::from(state.non_transient_retried_count)
        + u64::from(state.un_known_retried_count)
}

/// Read-side projection of one job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    pub retries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_tracking_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_exit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_exit_diagnostics: Option<String>,
}

impl JobStatus {
    /// Stub returned alongside the not-found error so status queries never
    /// hard-fail on a missing job.
    pub fn not_found(name: &str) -> Self {
        Self {
            name: name.to_string(),
            username: None,
            state: JobState::JobNotFound,
            sub_state: None,
            retries: 0,
            created_time: None,
            completed_time: None,
            app_id: None,
            app_progress: None,
            app_tracking_url: None,
            app_exit_code: None,
            app_exit_type: None,
            app_exit_diagnostics: None,
        }
    }

    /// Project a framework status document onto the public status model.
    /// Starts from WAITING; a native state outside the mapping table leaves
    /// that default untouched.
    pub fn from_framework(name: &str, info: &FrameworkInfo) -> Self {
        let mut status = Self {
            name: name.to_string(),
            username: None,
            state: JobState::Waiting,
            sub_state: None,
            retries: 0,
            created_time: None,
            completed_time: None,
            app_id: None,
            app_progress: None,
            app_tracking_url: None,
            app_exit_code: None,
            app_exit_type: None,
            app_exit_diagnostics: None,
        };

        let framework_status = info
            .aggregated_framework_status
            .as_ref()
            .and_then(|agg| agg.framework_status.as_ref());
        if let Some(fs) = framework_status {
            status.apply(fs);
        }
        status
    }

    fn apply(&mut self, fs: &FrameworkStatus) {
        if let Some(state) = fs.framework_state.as_deref() {
            self.sub_state = Some(state.to_string());
            if let Some(mapped) = convert_job_state(state, fs.application_exit_type.as_deref()) {
                self.state = mapped;
            }
        }
        if let Some(retry_state) = &fs.framework_retry_policy_state {
            self.retries = total_retries(retry_state);
        }
        self.created_time = fs
            .first_request_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        self.completed_time = fs
            .framework_completed_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        self.app_id = fs.application_id.clone();
        self.app_progress = fs.application_progress;
        self.app_tracking_url = fs.application_tracking_url.clone();
        self.app_exit_code = fs.application_exit_code;
        self.app_exit_type = fs.application_exit_type.clone();
        self.app_exit_diagnostics = fs.application_exit_diagnostics.clone();
    }
}

/// Per-container status within a task role. Populated only while the
/// framework has live task data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub task_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_gpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_log_address: Option<String>,
}

impl From<&RawTaskStatus> for TaskStatus {
    fn from(raw: &RawTaskStatus) -> Self {
        Self {
            task_index: raw.task_index,
            container_id: raw.container_id.clone(),
            container_ip: raw.container_ip.clone(),
            container_gpus: raw.container_gpus,
            container_log_address: raw.container_log_http_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRoleStatus {
    pub name: String,
    pub task_statuses: Vec<TaskStatus>,
}

/// Assemble per-role task status from the framework document. Roles are
/// returned sorted by name so the output is stable across polls.
pub fn task_role_statuses(info: &FrameworkInfo) -> Vec<TaskRoleStatus> {
    let Some(aggregated) = &info.aggregated_task_role_statuses else {
        return Vec::new();
    };
    let mut roles: Vec<TaskRoleStatus> = aggregated
        .iter()
        .map(|(name, role)| TaskRoleStatus {
            name: name.clone(),
            task_statuses: role
                .task_statuses
                .as_ref()
                .map(|ts| ts.task_status_array.iter().map(TaskStatus::from).collect())
                .unwrap_or_default(),
        })
        .collect();
    roles.sort_by(|a, b| a.name.cmp(&b.name));
    roles
}

/// Full read-side answer for one job: status plus per-role task detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub status: JobStatus,
    pub task_roles: Vec<TaskRoleStatus>,
}

impl JobDetail {
    pub fn not_found(name: &str) -> Self {
        Self {
            status: JobStatus::not_found(name),
            task_roles: Vec::new(),
        }
    }
}

/// One row of a job listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOverview {
    pub name: String,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_state: Option<String>,
    pub retries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_exit_code: Option<i32>,
}

impl From<JobStatus> for JobOverview {
    fn from(status: JobStatus) -> Self {
        Self {
            name: status.name,
            state: status.state,
            sub_state: status.sub_state,
            retries: status.retries,
            created_time: status.created_time,
            completed_time: status.completed_time,
            app_exit_code: status.app_exit_code,
        }
    }
}

/// A job whose status fetch failed during a listing. Siblings are unaffected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFailure {
    pub name: String,
    pub reason: String,
}

/// Partial-failure-tolerant listing result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub jobs: Vec<JobOverview>,
    pub failed: Vec<ListFailure>,
}
