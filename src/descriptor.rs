//! Mapping from a validated `JobSpec` to the descriptor schema required by
//! the Framework Launcher. A deterministic pure transform: no timestamps, no
//! generated ids, role map ordered by name.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::spec::JobSpec;

const DESCRIPTION_VERSION: u32 = 10;
const TASK_SERVICE_VERSION: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkDescription {
    pub version: u32,
    pub user: UserDescriptor,
    pub retry_policy: RetryPolicy,
    pub task_roles: BTreeMap<String, TaskRoleDescriptor>,
    pub platform_specific_parameters: PlatformParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescriptor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_retry_count: i32,
    pub fancy_retry_policy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRoleDescriptor {
    pub task_number: u32,
    pub task_service: TaskService,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskService {
    pub version: u32,
    pub entry_point: String,
    pub source_locations: Vec<String>,
    pub resource: Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub cpu_number: u32,
    #[serde(rename = "memoryMB")]
    pub memory_mb: u32,
    pub gpu_number: u32,
    /// Always empty: port allocation is handled by the scheduler's generic
    /// IP-list mechanism, not by this layer.
    pub port_ranges: Vec<u32>,
    pub disk_type: u32,
    #[serde(rename = "diskMB")]
    pub disk_mb: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformParameters {
    pub queue: String,
    /// `null` when the job does not pin a GPU type.
    pub task_node_gpu_type: Option<String>,
    pub kill_all_on_any_completed: bool,
    pub kill_all_on_any_service_completed: bool,
    pub generate_container_ip_list: bool,
}

impl FrameworkDescription {
    /// Derive the launcher descriptor from a job spec.
    ///
    /// Task-role array index `i` maps to `YarnContainerScripts/{i}.sh`; the
    /// script generator addresses scripts the same way, so the two stay in
    /// agreement by construction.
    pub fn build(spec: &JobSpec, username: &str) -> Self {
        let remote_script_dir = format!(
            "/Container/{}/{}/YarnContainerScripts",
            username, spec.job_name
        );

        let task_roles = spec
            .task_roles
            .iter()
            .enumerate()
            .map(|(index, role)| {
                let descriptor = TaskRoleDescriptor {
                    task_number: role.task_number,
                    task_service: TaskService {
                        version: TASK_SERVICE_VERSION,
                        entry_point: format!("source YarnContainerScripts/{index}.sh"),
                        source_locations: vec![remote_script_dir.clone()],
                        resource: Resource {
                            cpu_number: role.cpu_number,
                            memory_mb: role.memory_mb,
                            gpu_number: role.gpu_number,
                            port_ranges: Vec::new(),
                            disk_type: 0,
                            disk_mb: 0,
                        },
                    },
                };
                (role.name.clone(), descriptor)
            })
            .collect();

        let kill_all = spec.kill_all_on_completed_task_number > 0;

        Self {
            version: DESCRIPTION_VERSION,
            user: UserDescriptor {
                name: username.to_string(),
            },
            retry_policy: RetryPolicy {
                max_retry_count: spec.retry_count,
                fancy_retry_policy: spec.retry_count != -2,
            },
            task_roles,
            platform_specific_parameters: PlatformParameters {
                queue: spec.virtual_cluster.clone(),
                task_node_gpu_type: spec.gpu_type.clone().filter(|t| !t.is_empty()),
                kill_all_on_any_completed: kill_all,
                kill_all_on_any_service_completed: kill_all,
                generate_container_ip_list: true,
            },
        }
    }
}
