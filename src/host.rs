use tracing::info;

use crate::cmd::Runner;
use crate::error::DeployResult;

/// What [`HostPreparer::prepare`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    AlreadyInstalled,
    Installed,
}

/// Makes sure the container runtime is installed, started and
/// enabled at boot on a Debian-family host.
///
/// # Example
///
/// ```
/// use alicerce::host::HostPreparer;
///
/// let host = HostPreparer::new().sudo(false).package("docker-ce");
///
/// assert_eq!(host.package, "docker-ce");
/// assert_eq!(host.binary, "docker");
/// assert!(!host.sudo);
/// ```
#[derive(Debug, Clone)]
pub struct HostPreparer {
    pub package_manager: String,
    pub package: String,
    /// Binary looked up on PATH to decide whether to install.
    pub binary: String,
    /// systemd unit started and enabled after installing.
    pub unit: String,
    pub sudo: bool,
}

impl HostPreparer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            package_manager: "apt-get".to_string(),
            package: "docker.io".to_string(),
            binary: "docker".to_string(),
            unit: "docker".to_string(),
            sudo: true,
        }
    }

    #[must_use]
    pub fn package(mut self, package: &str) -> Self {
        self.package = package.to_string();
        self
    }

    #[must_use]
    pub fn binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    #[must_use]
    pub const fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Refresh the package index, then install, start and enable
    /// the runtime unless it is already on PATH. Any failing step
    /// aborts with that command's status.
    pub fn prepare(&self, runner: &dyn Runner) -> DeployResult<HostAction> {
        info!("Updating package index...");
        self.privileged(runner, &self.package_manager, &["update"])?;

        if runner.command_exists(&self.binary) {
            info!("{} already installed, skipping installation", self.binary);
            return Ok(HostAction::AlreadyInstalled);
        }

        info!("Installing {}...", self.package);
        self.privileged(
            runner,
            &self.package_manager,
            &["install", "-y", &self.package],
        )?;

        info!("Starting and enabling {}...", self.unit);
        self.privileged(runner, "systemctl", &["start", &self.unit])?;
        self.privileged(runner, "systemctl", &["enable", &self.unit])?;

        info!("{} installed", self.binary);
        Ok(HostAction::Installed)
    }

    fn privileged(&self, runner: &dyn Runner, program: &str, args: &[&str]) -> DeployResult<()> {
        if self.sudo {
            let mut full = vec![program];
            full.extend_from_slice(args);
            runner.run_interactive("sudo", &full)
        } else {
            runner.run_interactive(program, args)
        }
    }
}

impl Default for HostPreparer {
    fn default() -> Self {
        Self::new()
    }
}
