use std::path::PathBuf;
use std::process::ExitStatus;

use crate::cmd::redact;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("configuration file not found: {}", .0.display())]
    ConfigFileMissing(PathBuf),

    #[error(
        "proxy configuration not found: {}. Create it or set PROXY_CONF",
        .0.display()
    )]
    ProxyConfigMissing(PathBuf),

    #[error("invalid configuration at line {line}: {reason}")]
    ConfigInvalid { line: usize, reason: String },

    #[error(
        "missing required keys in {}: {}. Set them and run again",
        .path.display(),
        .keys.join(", ")
    )]
    MissingKeys { path: PathBuf, keys: Vec<String> },

    #[error("repository sync failed for {}: {reason}", .dir.display())]
    RepoSync { dir: PathBuf, reason: String },

    #[error("container '{name}' did not become ready: {reason}")]
    ContainerNotReady { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Mask `secrets` in the free-form parts of the error, such as a
    /// failed command line.
    #[must_use]
    pub fn redact<S: AsRef<str>>(self, secrets: &[S]) -> Self {
        match self {
            Self::CommandFailed { command, status } => Self::CommandFailed {
                command: redact(&command, secrets),
                status,
            },
            Self::RepoSync { dir, reason } => Self::RepoSync {
                dir,
                reason: redact(&reason, secrets),
            },
            Self::ContainerNotReady { name, reason } => Self::ContainerNotReady {
                name,
                reason: redact(&reason, secrets),
            },
            other => other,
        }
    }
}
