//! Scripted stand-in for the host: records every command and
//! keeps just enough docker, git and package state to answer
//! the phases' queries.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use alicerce::Readiness;
use alicerce::cmd::{Runner, format_command};
use alicerce::error::{DeployError, DeployResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub image: String,
    pub args: Vec<String>,
    pub running: bool,
}

#[derive(Default)]
pub struct FakeHost {
    pub calls: RefCell<Vec<String>>,
    pub binaries: RefCell<BTreeSet<String>>,
    pub volumes: RefCell<BTreeSet<String>>,
    pub networks: RefCell<BTreeSet<String>>,
    pub containers: RefCell<BTreeMap<String, Container>>,
    /// Containers that exit right after starting.
    pub crashing: RefCell<BTreeSet<String>>,
    /// Command prefixes that fail.
    pub failing: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_docker() -> Self {
        let host = Self::new();
        host.binaries.borrow_mut().insert("docker".into());
        host
    }

    pub fn fail_on(&self, prefix: &str) {
        self.failing.borrow_mut().push(prefix.to_string());
    }

    pub fn crash(&self, container: &str) {
        self.crashing.borrow_mut().insert(container.to_string());
    }

    pub fn add_container(&self, name: &str, image: &str) {
        self.containers.borrow_mut().insert(
            name.to_string(),
            Container {
                image: image.to_string(),
                args: Vec::new(),
                running: true,
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c.starts_with(prefix))
    }

    pub fn container_names(&self) -> Vec<String> {
        self.containers.borrow().keys().cloned().collect()
    }

    /// Calls that change docker state.
    pub fn docker_mutations(&self) -> Vec<String> {
        const MUTATING: [&str; 7] = [
            "docker volume create",
            "docker network create",
            "docker run",
            "docker stop",
            "docker rm",
            "docker rename",
            "docker build",
        ];
        self.calls
            .borrow()
            .iter()
            .filter(|c| MUTATING.iter().any(|m| c.starts_with(m)))
            .cloned()
            .collect()
    }

    fn record(&self, program: &str, args: &[&str]) -> DeployResult<String> {
        let line = format_command(program, args);
        self.calls.borrow_mut().push(line.clone());
        if self.failing.borrow().iter().any(|p| line.starts_with(p)) {
            return Err(failed(&line));
        }
        Ok(line)
    }

    fn docker(&self, line: &str, args: &[&str]) -> DeployResult<String> {
        let mut containers = self.containers.borrow_mut();
        match args {
            ["volume", "create", name] => {
                self.volumes.borrow_mut().insert((*name).to_string());
                Ok((*name).to_string())
            }
            ["network", "create", .., name] => {
                self.networks.borrow_mut().insert((*name).to_string());
                Ok("f00d".into())
            }
            ["ps", "-a", "--filter", filter, ..] => {
                let needle = filter.trim_start_matches("name=");
                let names: Vec<&str> = containers
                    .keys()
                    .filter(|n| n.contains(needle))
                    .map(String::as_str)
                    .collect();
                Ok(names.join("\n"))
            }
            ["stop", name] => match containers.get_mut(*name) {
                Some(c) => {
                    c.running = false;
                    Ok((*name).to_string())
                }
                None => Err(failed(line)),
            },
            ["rm", name] => {
                let stopped = containers.get(*name).is_some_and(|c| !c.running);
                if !stopped {
                    return Err(failed(line));
                }
                containers.remove(*name);
                Ok((*name).to_string())
            }
            ["rename", from, to] => {
                if containers.contains_key(*to) {
                    return Err(failed(line));
                }
                let c = containers.remove(*from).ok_or_else(|| failed(line))?;
                containers.insert((*to).to_string(), c);
                Ok(String::new())
            }
            ["run", rest @ ..] => {
                let name = rest
                    .iter()
                    .position(|a| *a == "--name")
                    .map(|i| rest[i + 1].to_string())
                    .ok_or_else(|| failed(line))?;
                if containers.contains_key(&name) {
                    return Err(failed(line));
                }
                containers.insert(
                    name,
                    Container {
                        image: rest.last().map(|s| (*s).to_string()).unwrap_or_default(),
                        args: args.iter().map(|s| (*s).to_string()).collect(),
                        running: true,
                    },
                );
                Ok("0123456789ab".into())
            }
            ["inspect", "--format", _, name] => match containers.get(*name) {
                Some(_) if self.crashing.borrow().contains(*name) => {
                    Ok(r#"{"Status":"exited","Running":false,"ExitCode":1}"#.into())
                }
                Some(c) if c.running => Ok(r#"{"Status":"running","Running":true}"#.into()),
                Some(_) => Ok(r#"{"Status":"exited","Running":false,"ExitCode":0}"#.into()),
                None => Err(failed(line)),
            },
            _ => Ok(String::new()),
        }
    }

    fn git(&self, args: &[&str]) -> DeployResult<String> {
        if let ["clone", .., dir] = args {
            fs::create_dir_all(Path::new(dir).join(".git"))?;
        }
        Ok(String::new())
    }
}

impl Runner for FakeHost {
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<String> {
        let line = self.record(program, args)?;
        match program {
            "docker" => self.docker(&line, args),
            "git" => self.git(args),
            _ => Ok(String::new()),
        }
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> DeployResult<()> {
        self.record(program, args)?;
        let args: Vec<&str> = if program == "sudo" {
            args.iter().skip(1).copied().collect()
        } else {
            args.to_vec()
        };
        if args.first() == Some(&"install") {
            self.binaries.borrow_mut().insert("docker".into());
        }
        Ok(())
    }

    fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        if self.record(program, args).is_err() {
            return false;
        }
        match args {
            ["volume", "inspect", name] => self.volumes.borrow().contains(*name),
            ["network", "inspect", name] => self.networks.borrow().contains(*name),
            _ => true,
        }
    }

    fn command_exists(&self, program: &str) -> bool {
        self.calls.borrow_mut().push(format!("which {program}"));
        self.binaries.borrow().contains(program)
    }
}

pub fn failed(command: &str) -> DeployError {
    DeployError::CommandFailed {
        command: command.to_string(),
        status: ExitStatus::from_raw(1 << 8),
    }
}

pub fn fast_readiness() -> Readiness {
    Readiness::new().attempts(3).interval(Duration::ZERO)
}

pub const REQUIRED: [(&str, &str); 16] = [
    ("DEFAULT_EMAIL", "ops@example.com"),
    ("GIT_USERNAME", "deploy-bot"),
    ("GIT_TOKEN", "ghp_s3cr3tT0ken"),
    ("FRONTEND_REPO_URL", "https://github.com/acme/web.git"),
    ("FRONTEND_BRANCH", "main"),
    ("FRONTEND_VIRTUAL_HOST", "app.example.com"),
    ("FRONTEND_LETSENCRYPT_HOST", "app.example.com"),
    ("BACKEND_REPO_URL", "https://github.com/acme/api.git"),
    ("BACKEND_BRANCH", "release"),
    ("BACKEND_VIRTUAL_HOST", "api.example.com"),
    ("BACKEND_LETSENCRYPT_HOST", "api.example.com"),
    ("TZ", "Europe/Lisbon"),
    ("API_BASE_URL", "https://api.example.com"),
    ("POSTGRES_USER", "app"),
    ("POSTGRES_PASSWORD", "pg-hunter2"),
    ("POSTGRES_DB", "appdb"),
];

/// Env file content with every required key, followed by
/// `extra` lines.
pub fn env_content(extra: &str) -> String {
    let mut out: String = REQUIRED
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect();
    out.push_str(extra);
    out
}

/// Write `.env` and the default `proxy.conf` into `dir`.
pub fn write_env(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join(".env");
    fs::write(&path, content).unwrap();
    fs::write(dir.join("proxy.conf"), "client_max_body_size 20m;\n").unwrap();
    path
}
