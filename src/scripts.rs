//! Per-task-role launch script rendering.
//!
//! Two templates: the YARN container entrypoint (bootstraps Docker inside the
//! allocated container) and the Docker container entrypoint (exports the job
//! environment and runs the user command). Rendering is a pure string
//! operation; referencing an undefined variable is a fatal error, never a
//! silent empty substitution.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::spec::JobSpec;

const YARN_CONTAINER_TEMPLATE: &str = r#"#!/bin/bash
# Bootstrap for task role {{taskRoleName}} (index {{taskRoleIndex}}) of job {{jobName}}.
# Runs inside the container allocated by the framework launcher and hands off
# to the Docker container entrypoint staged next to this script.

set -o errexit
set -o pipefail

export PAI_DEFAULT_FS_URI={{hdfsUri}}
export PAI_JOB_NAME={{jobName}}
export PAI_USER_NAME={{userName}}

job_dir=/Container/{{userName}}/{{jobName}}

docker pull {{image}}

hdfs dfs -get "$PAI_DEFAULT_FS_URI$job_dir/DockerContainerScripts/{{taskRoleIndex}}.sh" \
    docker_entrypoint.sh

docker run --rm \
    --name "pai_{{jobName}}_{{taskRoleName}}_$PAI_TASK_INDEX" \
    --cpus {{cpuNumber}} \
    --memory {{memoryMB}}m \
    --env PAI_TASK_INDEX="$PAI_TASK_INDEX" \
    --volume "$(pwd)":/pai/work \
    --workdir /pai/work \
    {{image}} /bin/bash /pai/work/docker_entrypoint.sh
"#;

const DOCKER_CONTAINER_TEMPLATE: &str = r#"#!/bin/bash
# Container entrypoint for task role {{taskRoleName}} of job {{jobName}}.
# Exports the job environment, then runs the user command.

set -o errexit

export PAI_JOB_NAME={{jobName}}
export PAI_USER_NAME={{userName}}
export PAI_DEFAULT_FS_URI={{hdfsUri}}
export PAI_DATA_DIR={{dataDir}}
export PAI_OUTPUT_DIR={{outputDir}}
export PAI_CODE_DIR={{codeDir}}
export PAI_TASK_ROLE_NAME={{taskRoleName}}
export PAI_TASK_ROLE_INDEX={{taskRoleIndex}}
export PAI_TASK_ROLE_NUM={{taskRoleCount}}
export PAI_TASK_COUNT={{totalTaskCount}}
export PAI_TASK_ROLE_TASK_COUNT={{taskNumber}}
export PAI_CURRENT_TASK_ROLE_CPU_COUNT={{cpuNumber}}
export PAI_CURRENT_TASK_ROLE_MEM_MB={{memoryMB}}
export PAI_CURRENT_TASK_ROLE_GPU_COUNT={{gpuNumber}}
{{portExports}}
{{command}}
"#;

/// Everything a template may reference for one task role. Both script kinds
/// render from the same variable set.
pub struct ScriptContext<'a> {
    pub spec: &'a JobSpec,
    pub role_index: usize,
    pub username: &'a str,
    pub default_fs_uri: &'a str,
    /// Output directory after placeholder/default resolution.
    pub output_dir: &'a str,
}

impl ScriptContext<'_> {
    fn variables(&self) -> HashMap<&'static str, String> {
        let role = &self.spec.task_roles[self.role_index];

        let port_exports = role
            .port_list
            .iter()
            .map(|port| {
                format!(
                    "export PAI_PORT_{}={}",
                    port.label.to_ascii_uppercase(),
                    port.begin_at
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("jobName", self.spec.job_name.clone());
        vars.insert("userName", self.username.to_string());
        vars.insert("image", self.spec.image.clone());
        vars.insert("hdfsUri", self.default_fs_uri.trim_end_matches('/').to_string());
        vars.insert("dataDir", self.spec.data_dir.clone().unwrap_or_default());
        vars.insert("outputDir", self.output_dir.to_string());
        vars.insert("codeDir", self.spec.code_dir.clone().unwrap_or_default());
        vars.insert("taskRoleName", role.name.clone());
        vars.insert("taskRoleIndex", self.role_index.to_string());
        vars.insert("taskRoleCount", self.spec.task_roles.len().to_string());
        vars.insert("totalTaskCount", self.spec.total_task_number().to_string());
        vars.insert("taskNumber", role.task_number.to_string());
        vars.insert("cpuNumber", role.cpu_number.to_string());
        vars.insert("memoryMB", role.memory_mb.to_string());
        vars.insert("gpuNumber", role.gpu_number.to_string());
        vars.insert("portExports", port_exports);
        vars.insert("command", role.command.clone());
        vars
    }

    /// Render the YARN container entrypoint for this role.
    pub fn yarn_container_script(&self) -> Result<String> {
        render(YARN_CONTAINER_TEMPLATE, &self.variables())
    }

    /// Render the Docker container entrypoint for this role.
    pub fn docker_container_script(&self) -> Result<String> {
        render(DOCKER_CONTAINER_TEMPLATE, &self.variables())
    }
}

/// Substitute `{{name}}` placeholders. Unknown names are an error.
fn render(template: &str, vars: &HashMap<&'static str, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Template("unterminated placeholder".to_string()))?;
        let name = &after[..end];
        let value = vars
            .get(name)
            .ok_or_else(|| Error::Template(name.to_string()))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{PortRequest, TaskRoleSpec};

    fn two_role_spec() -> JobSpec {
        JobSpec {
            job_name: "train".to_string(),
            image: "pytorch:latest".to_string(),
            auth_file: None,
            data_dir: Some("hdfs://nn:9000/data".to_string()),
            output_dir: None,
            code_dir: None,
            task_roles: vec![
                TaskRoleSpec {
                    name: "ps".to_string(),
                    task_number: 1,
                    cpu_number: 2,
                    memory_mb: 4096,
                    gpu_number: 0,
                    port_list: vec![PortRequest {
                        label: "rpc".to_string(),
                        begin_at: 7070,
                        port_number: 1,
                    }],
                    command: "python ps.py".to_string(),
                },
                TaskRoleSpec {
                    name: "worker".to_string(),
                    task_number: 3,
                    cpu_number: 4,
                    memory_mb: 8192,
                    gpu_number: 1,
                    port_list: vec![],
                    command: "python worker.py".to_string(),
                },
            ],
            gpu_type: None,
            virtual_cluster: "default".to_string(),
            retry_count: 0,
            kill_all_on_completed_task_number: 0,
        }
    }

    fn context(spec: &JobSpec, role_index: usize) -> ScriptContext<'_> {
        ScriptContext {
            spec,
            role_index,
            username: "alice",
            default_fs_uri: "hdfs://nn:9000",
            output_dir: "hdfs://nn:9000/Output/alice/train",
        }
    }

    #[test]
    fn render_rejects_undefined_variable() {
        let vars = HashMap::new();
        let err = render("hello {{nobody}}", &vars).unwrap_err();
        assert!(matches!(err, Error::Template(name) if name == "nobody"));
    }

    #[test]
    fn render_rejects_unterminated_placeholder() {
        let vars = HashMap::new();
        assert!(render("hello {{oops", &vars).is_err());
    }

    #[test]
    fn render_substitutes_all_occurrences() {
        let mut vars = HashMap::new();
        vars.insert("x", "1".to_string());
        assert_eq!(render("{{x}}-{{x}}", &vars).unwrap(), "1-1");
    }

    #[test]
    fn yarn_script_references_matching_docker_script_index() {
        let spec = two_role_spec();
        let script = context(&spec, 1).yarn_container_script().unwrap();
        assert!(script.contains("DockerContainerScripts/1.sh"));
        assert!(script.contains("docker pull pytorch:latest"));
        assert!(script.contains("--cpus 4"));
        assert!(script.contains("--memory 8192m"));
    }

    #[test]
    fn docker_script_exports_job_environment() {
        let spec = two_role_spec();
        let script = context(&spec, 0).docker_container_script().unwrap();
        assert!(script.contains("export PAI_JOB_NAME=train"));
        assert!(script.contains("export PAI_TASK_ROLE_NAME=ps"));
        assert!(script.contains("export PAI_TASK_ROLE_INDEX=0"));
        // Multi-role coordination: the role count and total task count are
        // visible to every container.
        assert!(script.contains("export PAI_TASK_ROLE_NUM=2"));
        assert!(script.contains("export PAI_TASK_COUNT=4"));
        assert!(script.contains("export PAI_PORT_RPC=7070"));
        assert!(script.ends_with("python ps.py\n"));
    }

    #[test]
    fn docker_script_empty_dirs_render_empty() {
        let mut spec = two_role_spec();
        spec.data_dir = None;
        let script = context(&spec, 0).docker_container_script().unwrap();
        assert!(script.contains("export PAI_DATA_DIR=\n"));
    }

    #[test]
    fn scripts_render_without_placeholders_left() {
        let spec = two_role_spec();
        for index in 0..spec.task_roles.len() {
            let ctx = context(&spec, index);
            assert!(!ctx.yarn_container_script().unwrap().contains("{{"));
            assert!(!ctx.docker_container_script().unwrap().contains("{{"));
        }
    }
}
