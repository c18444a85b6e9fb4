use std::fmt;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};

/// Executes external programs on behalf of the provisioning
/// phases.
///
/// Every side effect on the host (package manager, git, docker)
/// goes through this trait so a phase can be driven against a
/// scripted runner in tests.
pub trait Runner {
    /// Run a command and capture its trimmed stdout. Fails if the
    /// command returns a non-zero exit code.
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<String>;

    /// Run a command with stdio inherited from this process.
    fn run_interactive(&self, program: &str, args: &[&str]) -> DeployResult<()>;

    /// Run a probe and report whether it exited successfully.
    /// Output is discarded.
    fn succeeds(&self, program: &str, args: &[&str]) -> bool;

    /// Check if a command exists on PATH.
    fn command_exists(&self, program: &str) -> bool;
}

/// Runner backed by real child processes.
///
/// Secret values registered with [`System::redacting`] are
/// masked in every logged command line and in `CommandFailed`
/// errors.
#[derive(Clone, Default)]
pub struct System {
    secrets: Vec<String>,
}

impl System {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn redacting<S: AsRef<str>>(mut self, secrets: &[S]) -> Self {
        for secret in secrets {
            let secret: &str = secret.as_ref();
            self.secrets.push(secret.to_string());
        }
        self
    }

    fn shown(&self, program: &str, args: &[&str]) -> String {
        redact(&format_command(program, args), &self.secrets)
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl Runner for System {
    fn run(&self, program: &str, args: &[&str]) -> DeployResult<String> {
        let command = self.shown(program, args);
        debug!(%command, "running");
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| not_found_or_io(program, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program, "stderr: {}", redact(stderr.trim(), &self.secrets));
            Err(DeployError::CommandFailed {
                command,
                status: output.status,
            })
        }
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> DeployResult<()> {
        let command = self.shown(program, args);
        debug!(%command, "running");
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| not_found_or_io(program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(DeployError::CommandFailed { command, status })
        }
    }

    fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        debug!(command = %self.shown(program, args), "probing");
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn command_exists(&self, program: &str) -> bool {
        command_exists(program)
    }
}

/// Run a command and capture its output. Fails if the command
/// returns a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    System::new().run(program, args)
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    System::new().run_interactive(program, args)
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Render a program and its arguments as a single shell-like
/// line, for logs and error messages.
#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

/// Mask every occurrence of each secret.
#[must_use]
pub fn redact<S: AsRef<str>>(text: &str, secrets: &[S]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        let secret: &str = secret.as_ref();
        if !secret.is_empty() {
            out = out.replace(secret, "********");
        }
    }
    out
}

fn not_found_or_io(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}
