use thiserror::Error;

use crate::status::JobDetail;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid job spec: {0}")]
    InvalidSpec(String),

    /// The framework is unknown to the launcher. Read paths carry a stub
    /// status object (state `JOB_NOT_FOUND`) so callers can render something
    /// without assuming the lookup succeeded.
    #[error("Job not found: {name}")]
    JobNotFound { name: String, stub: Box<JobDetail> },

    #[error("Job already exists: {name} (owned by {owner})")]
    AlreadyExists { name: String, owner: String },

    #[error("Unauthorized: {requester} may not modify job {name} owned by {owner}")]
    Unauthorized {
        name: String,
        owner: String,
        requester: String,
    },

    #[error("Invalid virtual cluster: {0}")]
    InvalidVirtualCluster(String),

    #[error("Undefined template variable: {0}")]
    Template(String),

    #[error("Staging failure at {path}: {source}")]
    StagingFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote sync failed: `{command}` exited with {status}: {stderr}")]
    RemoteSyncFailure {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Launcher unavailable: {0}")]
    LauncherUnavailable(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::LauncherUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
