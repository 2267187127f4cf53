use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder token submitters may embed in directory URIs; resolved to the
/// configured distributed-filesystem root at submission time.
pub const DEFAULT_FS_PLACEHOLDER: &str = "$PAI_DEFAULT_FS_URI";

fn default_virtual_cluster() -> String {
    "default".to_string()
}

/// A client-submitted job description.
///
/// The JSON shape is the externally documented input contract and stays
/// byte-compatible with existing submitters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub job_name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_dir: Option<String>,
    pub task_roles: Vec<TaskRoleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    #[serde(default = "default_virtual_cluster")]
    pub virtual_cluster: String,
    #[serde(default)]
    pub retry_count: i32,
    #[serde(default)]
    pub kill_all_on_completed_task_number: u32,
}

/// A homogeneous group of identical containers within a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRoleSpec {
    pub name: String,
    pub task_number: u32,
    pub cpu_number: u32,
    #[serde(rename = "memoryMB")]
    pub memory_mb: u32,
    pub gpu_number: u32,
    #[serde(default)]
    pub port_list: Vec<PortRequest>,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortRequest {
    pub label: String,
    pub begin_at: u16,
    pub port_number: u16,
}

impl JobSpec {
    /// Validate the spec. Runs before any staging I/O; a spec that fails
    /// here never touches the filesystem or the launcher.
    pub fn validate(&self) -> Result<()> {
        let job_name_re = Regex::new(r"^[A-Za-z0-9\-._~]+$").expect("job name pattern is valid");
        let role_name_re = Regex::new(r"^[A-Za-z0-9._~]+$").expect("role name pattern is valid");

        if !job_name_re.is_match(&self.job_name) {
            return Err(Error::InvalidSpec(format!(
                "job name {:?} does not match [A-Za-z0-9-._~]+",
                self.job_name
            )));
        }
        if self.image.trim().is_empty() {
            return Err(Error::InvalidSpec("image must not be empty".to_string()));
        }
        if self.task_roles.is_empty() {
            return Err(Error::InvalidSpec(
                "job must declare at least one task role".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for role in &self.task_roles {
            if !role_name_re.is_match(&role.name) {
                return Err(Error::InvalidSpec(format!(
                    "task role name {:?} does not match [A-Za-z0-9._~]+",
                    role.name
                )));
            }
            if !seen.insert(role.name.as_str()) {
                return Err(Error::InvalidSpec(format!(
                    "duplicate task role name {:?}",
                    role.name
                )));
            }
            if role.task_number < 1 {
                return Err(Error::InvalidSpec(format!(
                    "task role {:?} must have at least one instance",
                    role.name
                )));
            }
            if role.command.trim().is_empty() {
                return Err(Error::InvalidSpec(format!(
                    "task role {:?} has an empty command",
                    role.name
                )));
            }
        }

        let total_tasks = self.total_task_number();
        if self.kill_all_on_completed_task_number > total_tasks {
            return Err(Error::InvalidSpec(format!(
                "killAllOnCompletedTaskNumber {} exceeds total task count {}",
                self.kill_all_on_completed_task_number, total_tasks
            )));
        }

        Ok(())
    }

    /// Sum of instance counts across all task roles.
    pub fn total_task_number(&self) -> u32 {
        self.task_roles.iter().map(|r| r.task_number).sum()
    }

    /// Resolve the effective output directory for a submission.
    ///
    /// Blank means the conventional per-user location on the distributed
    /// filesystem; the placeholder token is substituted wherever it appears.
    pub fn resolve_output_dir(&self, default_fs_uri: &str, username: &str) -> String {
        match self.output_dir.as_deref() {
            None | Some("") => format!(
                "{}/Output/{}/{}",
                default_fs_uri.trim_end_matches('/'),
                username,
                self.job_name
            ),
            Some(dir) => dir.replace(DEFAULT_FS_PLACEHOLDER, default_fs_uri.trim_end_matches('/')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_role_spec() -> JobSpec {
        JobSpec {
            job_name: "job1".to_string(),
            image: "busybox".to_string(),
            auth_file: None,
            data_dir: None,
            output_dir: None,
            code_dir: None,
            task_roles: vec![TaskRoleSpec {
                name: "default".to_string(),
                task_number: 1,
                cpu_number: 1,
                memory_mb: 100,
                gpu_number: 0,
                port_list: vec![],
                command: "echo hi".to_string(),
            }],
            gpu_type: None,
            virtual_cluster: "default".to_string(),
            retry_count: 0,
            kill_all_on_completed_task_number: 0,
        }
    }

    #[test]
    fn valid_spec_passes() {
        assert!(one_role_spec().validate().is_ok());
    }

    #[test]
    fn job_name_pattern_enforced() {
        let mut spec = one_role_spec();
        spec.job_name = "job one".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));

        spec.job_name = "job-1.a_b~c".to_string();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn role_name_rejects_dash() {
        // Role names are stricter than job names: no '-'
        let mut spec = one_role_spec();
        spec.task_roles[0].name = "role-a".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn duplicate_role_names_rejected() {
        let mut spec = one_role_spec();
        let mut dup = spec.task_roles[0].clone();
        dup.task_number = 2;
        spec.task_roles.push(dup);
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn at_least_one_role_required() {
        let mut spec = one_role_spec();
        spec.task_roles.clear();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn empty_command_rejected() {
        let mut spec = one_role_spec();
        spec.task_roles[0].command = "  ".to_string();
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn kill_all_threshold_bounded_by_total_tasks() {
        let mut spec = one_role_spec();
        spec.kill_all_on_completed_task_number = 2;
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));

        spec.kill_all_on_completed_task_number = 1;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn resolve_output_dir_defaults_when_blank() {
        let spec = one_role_spec();
        assert_eq!(
            spec.resolve_output_dir("hdfs://nn:9000", "alice"),
            "hdfs://nn:9000/Output/alice/job1"
        );
    }

    #[test]
    fn resolve_output_dir_substitutes_placeholder() {
        let mut spec = one_role_spec();
        spec.output_dir = Some("$PAI_DEFAULT_FS_URI/my/data".to_string());
        assert_eq!(
            spec.resolve_output_dir("hdfs://nn:9000/", "alice"),
            "hdfs://nn:9000/my/data"
        );
    }

    #[test]
    fn resolve_output_dir_passes_explicit_uri_through() {
        let mut spec = one_role_spec();
        spec.output_dir = Some("hdfs://other:9000/out".to_string());
        assert_eq!(
            spec.resolve_output_dir("hdfs://nn:9000", "alice"),
            "hdfs://other:9000/out"
        );
    }

    #[test]
    fn json_field_names_are_camel_case() {
        let spec = one_role_spec();
        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("jobName").is_some());
        assert!(value.get("killAllOnCompletedTaskNumber").is_some());
        let role = &value["taskRoles"][0];
        assert!(role.get("taskNumber").is_some());
        assert!(role.get("memoryMB").is_some());
        assert!(role.get("cpuNumber").is_some());
    }

    #[test]
    fn task_number_zero_rejected() {
        let mut spec = one_role_spec();
        spec.task_roles[0].task_number = 0;
        assert!(matches!(spec.validate(), Err(Error::InvalidSpec(_))));
    }
}
