use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;

use alicerce::error::DeployError;

#[test]
fn display_command_failed() {
    let err = DeployError::CommandFailed {
        command: "docker volume create certs".into(),
        status: ExitStatus::from_raw(1 << 8),
    };
    assert_eq!(err.to_string(), "command failed: docker volume create certs");
}

#[test]
fn display_command_not_found() {
    let err = DeployError::CommandNotFound("docker".into());
    assert_eq!(err.to_string(), "command not found: docker");
}

#[test]
fn display_config_file_missing() {
    let err = DeployError::ConfigFileMissing(PathBuf::from("/srv/deploy/.env"));
    assert_eq!(
        err.to_string(),
        "configuration file not found: /srv/deploy/.env"
    );
}

#[test]
fn display_proxy_config_missing() {
    let err = DeployError::ProxyConfigMissing(PathBuf::from("/srv/deploy/proxy.conf"));
    assert_eq!(
        err.to_string(),
        "proxy configuration not found: /srv/deploy/proxy.conf. Create it or set PROXY_CONF"
    );
}

#[test]
fn redact_masks_failed_command() {
    let err = DeployError::CommandFailed {
        command: "docker run -e POSTGRES_PASSWORD=pg-hunter2 postgres".into(),
        status: ExitStatus::from_raw(1 << 8),
    }
    .redact(&["pg-hunter2"]);
    assert_eq!(
        err.to_string(),
        "command failed: docker run -e POSTGRES_PASSWORD=******** postgres"
    );
}

#[test]
fn display_config_invalid() {
    let err = DeployError::ConfigInvalid {
        line: 4,
        reason: "invalid key '1A'".into(),
    };
    assert_eq!(
        err.to_string(),
        "invalid configuration at line 4: invalid key '1A'"
    );
}

#[test]
fn display_missing_keys() {
    let err = DeployError::MissingKeys {
        path: PathBuf::from(".env"),
        keys: vec!["TZ".into(), "GIT_TOKEN".into()],
    };
    assert_eq!(
        err.to_string(),
        "missing required keys in .env: TZ, GIT_TOKEN. Set them and run again"
    );
}

#[test]
fn display_repo_sync() {
    let err = DeployError::RepoSync {
        dir: PathBuf::from("/srv/frontend"),
        reason: "git clone exited with exit status: 128".into(),
    };
    assert_eq!(
        err.to_string(),
        "repository sync failed for /srv/frontend: git clone exited with exit status: 128"
    );
}

#[test]
fn display_container_not_ready() {
    let err = DeployError::ContainerNotReady {
        name: "frontend-next".into(),
        reason: "unhealthy".into(),
    };
    assert_eq!(
        err.to_string(),
        "container 'frontend-next' did not become ready: unhealthy"
    );
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: DeployError = io_err.into();
    assert!(matches!(err, DeployError::Io(_)));
}

#[test]
fn from_json_error() {
    let json_err = serde_json::from_str::<Vec<u64>>("invalid").unwrap_err();
    let err: DeployError = json_err.into();
    assert!(matches!(err, DeployError::Json(_)));
}
