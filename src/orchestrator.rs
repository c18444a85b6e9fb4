use tracing::{info, warn};

use crate::cmd::Runner;
use crate::error::DeployResult;
use crate::readiness::Readiness;
use crate::service::{Rollout, Service};

/// What a rollout found in place of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutOutcome {
    /// No container with the service name existed.
    Started,
    /// A previous container was retired.
    Replaced,
}

/// Builds images and rolls containers over through the docker
/// CLI. At most one container carries a service's name once a
/// rollout returns.
pub struct Orchestrator<'a> {
    runner: &'a dyn Runner,
    readiness: Readiness,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner, readiness: Readiness) -> Self {
        Self { runner, readiness }
    }

    /// Build the service's image if it has a build context, then
    /// replace its container following its [`Rollout`] strategy.
    pub fn deploy(&self, service: &Service) -> DeployResult<RolloutOutcome> {
        self.build(service)?;

        match service.rollout {
            Rollout::Recreate => self.recreate(service),
            Rollout::BlueGreen => self.blue_green(service),
        }
    }

    pub fn build(&self, service: &Service) -> DeployResult<()> {
        let Some(args) = service.build_args() else {
            return Ok(());
        };
        info!("Building image {}...", service.image);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run_interactive("docker", &refs)
    }

    /// Whether a container, running or stopped, has exactly this
    /// name.
    pub fn container_exists(&self, name: &str) -> DeployResult<bool> {
        let filter = format!("name={name}");
        let output = self.runner.run(
            "docker",
            &["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"],
        )?;
        Ok(output.lines().any(|line| line.trim() == name))
    }

    /// Stop then remove a container, waiting for the runtime's
    /// default grace period.
    pub fn remove(&self, name: &str) -> DeployResult<()> {
        info!("Stopping and removing container '{name}'...");
        self.runner.run("docker", &["stop", name])?;
        self.runner.run("docker", &["rm", name])?;
        Ok(())
    }

    pub fn start(&self, service: &Service, container: &str) -> DeployResult<()> {
        info!("Starting container '{container}' from {}...", service.image);
        let args = service.run_args(container);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run("docker", &refs)?;
        Ok(())
    }

    fn recreate(&self, service: &Service) -> DeployResult<RolloutOutcome> {
        let outcome = if self.container_exists(&service.name)? {
            self.remove(&service.name)?;
            RolloutOutcome::Replaced
        } else {
            RolloutOutcome::Started
        };

        self.start(service, &service.name)?;
        self.readiness.wait(self.runner, &service.name)?;
        Ok(outcome)
    }

    fn blue_green(&self, service: &Service) -> DeployResult<RolloutOutcome> {
        // A swap interrupted before the rename leaves only the
        // "-next" container behind.
        let next = format!("{}-next", service.name);
        if self.container_exists(&next)? {
            warn!("Removing leftover container '{next}' from an earlier run");
            self.remove(&next)?;
        }

        if !self.container_exists(&service.name)? {
            return self.recreate(service);
        }

        let started = self
            .start(service, &next)
            .and_then(|()| self.readiness.wait(self.runner, &next));
        if let Err(err) = started {
            warn!("'{next}' failed, keeping '{}' in service", service.name);
            if self.container_exists(&next)? {
                self.remove(&next)?;
            }
            return Err(err);
        }

        self.remove(&service.name)?;
        self.runner.run("docker", &["rename", &next, &service.name])?;
        info!("'{}' switched to the new container", service.name);
        Ok(RolloutOutcome::Replaced)
    }
}
