//! Thin HTTP client for the Framework Launcher REST surface.
//!
//! The launcher is a black box reached over HTTP; this module models its
//! JSON documents as strongly-typed structs with optional leaf fields, so
//! "field absent" and "field present but empty" stay distinguishable.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::LauncherConfig;
use crate::descriptor::FrameworkDescription;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Wire documents (launcher -> client)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkList {
    #[serde(default)]
    pub framework_names: Vec<String>,
}

/// Framework status/task document returned by `GET /v1/Frameworks/{name}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkInfo {
    pub exception: Option<FrameworkException>,
    pub aggregated_framework_status: Option<AggregatedFrameworkStatus>,
    pub aggregated_task_role_statuses: Option<HashMap<String, AggregatedTaskRoleStatus>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkException {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedFrameworkStatus {
    pub framework_status: Option<FrameworkStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkStatus {
    pub framework_state: Option<String>,
    pub framework_retry_policy_state: Option<RetryPolicyState>,
    pub first_request_timestamp: Option<i64>,
    pub framework_completed_timestamp: Option<i64>,
    pub application_id: Option<String>,
    pub application_progress: Option<f64>,
    pub application_tracking_url: Option<String>,
    pub application_exit_code: Option<i32>,
    pub application_exit_type: Option<String>,
    pub application_exit_diagnostics: Option<String>,
}

/// The four native retry counters. `retries` reported to clients is their sum.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicyState {
    #[serde(default)]
    pub transient_normal_retried_count: u32,
    #[serde(default)]
    pub transient_conflict_retried_count: u32,
    #[serde(default)]
    pub non_transient_retried_count: u32,
    #[serde(default)]
    pub un_known_retried_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTaskRoleStatus {
    pub task_statuses: Option<TaskStatuses>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatuses {
    #[serde(default)]
    pub task_status_array: Vec<RawTaskStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTaskStatus {
    #[serde(default)]
    pub task_index: u32,
    pub container_id: Option<String>,
    pub container_ip: Option<String>,
    pub container_gpus: Option<i64>,
    pub container_log_http_address: Option<String>,
}

/// Framework request document returned by
/// `GET /v1/Frameworks/{name}/FrameworkRequest`. The status payload does not
/// carry the owner; this one does.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkRequest {
    pub framework_descriptor: Option<FrameworkRequestDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkRequestDescriptor {
    pub user: Option<FrameworkUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkUser {
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Requests (client -> launcher)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionType {
    Start,
    Stop,
}

impl ExecutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Start => "START",
            ExecutionType::Stop => "STOP",
        }
    }
}

impl std::str::FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "START" => Ok(ExecutionType::Start),
            "STOP" => Ok(ExecutionType::Stop),
            other => Err(format!("unknown execution type {other:?}")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionTypeBody {
    execution_type: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client wrapping the launcher's REST surface. One instance per
/// orchestrator; cheap to clone.
#[derive(Debug, Clone)]
pub struct LauncherClient {
    http: reqwest::Client,
    base: String,
}

impl LauncherClient {
    pub fn new(config: &LauncherConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("reqwest client construction cannot fail with static headers");
        Self {
            http,
            base: config.frameworks_uri(),
        }
    }

    fn framework_uri(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }

    /// `GET /v1/Frameworks` - names of all known frameworks.
    pub async fn list_frameworks(&self) -> Result<Vec<String>> {
        let response = self.http.get(&self.base).send().await?;
        let body: FrameworkList = Self::checked_json(response).await?;
        Ok(body.framework_names)
    }

    /// `GET /v1/Frameworks/{name}` - status/task document. `None` when the
    /// launcher has no framework under that name.
    pub async fn get_framework(&self, name: &str) -> Result<Option<FrameworkInfo>> {
        let response = self.http.get(self.framework_uri(name)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::checked_json(response).await?))
    }

    /// `GET /v1/Frameworks/{name}/FrameworkRequest` - submission-time
    /// descriptor, including the owning user. `None` when absent.
    pub async fn get_framework_request(&self, name: &str) -> Result<Option<FrameworkRequest>> {
        let uri = format!("{}/FrameworkRequest", self.framework_uri(name));
        let response = self.http.get(uri).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::checked_json(response).await?))
    }

    /// `PUT /v1/Frameworks/{name}` - submit or update a framework.
    /// Idempotent by name.
    pub async fn put_framework(&self, name: &str, description: &FrameworkDescription) -> Result<()> {
        let response = self
            .http
            .put(self.framework_uri(name))
            .json(description)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            // The launcher reports an unknown target queue as a bad request.
            if body.to_ascii_lowercase().contains("queue") {
                return Err(Error::InvalidVirtualCluster(body));
            }
            return Err(Error::LauncherUnavailable(format!(
                "launcher returned {status}: {body}"
            )));
        }
        Self::check_status(response).await
    }

    /// `PUT /v1/Frameworks/{name}/ExecutionType` - start or stop a framework.
    pub async fn put_execution_type(&self, name: &str, execution: ExecutionType) -> Result<()> {
        let uri = format!("{}/ExecutionType", self.framework_uri(name));
        let body = ExecutionTypeBody {
            execution_type: execution.as_str().to_string(),
        };
        let response = self.http.put(uri).json(&body).send().await?;
        Self::check_status(response).await
    }

    /// `DELETE /v1/Frameworks/{name}`.
    pub async fn delete_framework(&self, name: &str) -> Result<()> {
        let response = self.http.delete(self.framework_uri(name)).send().await?;
        Self::check_status(response).await
    }

    async fn checked_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LauncherUnavailable(format!(
                "launcher returned {status}: {body}"
            )));
        }
        Ok(response.json().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::LauncherUnavailable(format!(
                "launcher returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_counters_deserialize_from_native_names() {
        let state: RetryPolicyState = serde_json::from_str(
            r#"{
                "transientNormalRetriedCount": 1,
                "transientConflictRetriedCount": 2,
                "nonTransientRetriedCount": 3,
                "unKnownRetriedCount": 4
            }"#,
        )
        .unwrap();
        assert_eq!(state.transient_normal_retried_count, 1);
        assert_eq!(state.transient_conflict_retried_count, 2);
        assert_eq!(state.non_transient_retried_count, 3);
        assert_eq!(state.un_known_retried_count, 4);
    }

    #[test]
    fn absent_framework_status_stays_distinguishable_from_empty() {
        let absent: FrameworkInfo = serde_json::from_str("{}").unwrap();
        assert!(absent.aggregated_framework_status.is_none());

        let empty: FrameworkInfo =
            serde_json::from_str(r#"{"aggregatedFrameworkStatus": {}}"#).unwrap();
        let agg = empty.aggregated_framework_status.unwrap();
        assert!(agg.framework_status.is_none());
    }

    #[test]
    fn execution_type_parses_case_insensitively() {
        assert_eq!("start".parse::<ExecutionType>().unwrap(), ExecutionType::Start);
        assert_eq!("STOP".parse::<ExecutionType>().unwrap(), ExecutionType::Stop);
        assert!("pause".parse::<ExecutionType>().is_err());
    }
}
