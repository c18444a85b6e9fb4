use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::cmd::{self, Runner, System};
use crate::config::Config;
use crate::error::DeployResult;
use crate::git::{self, SyncAction};
use crate::host::{HostAction, HostPreparer};
use crate::orchestrator::{Orchestrator, RolloutOutcome};
use crate::readiness::Readiness;
use crate::stack;
use crate::volume::{self, Ensured, VOLUMES};

/// Everything a run did, phase by phase.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// `None` when host preparation was skipped.
    pub host: Option<HostAction>,
    pub repositories: Vec<(PathBuf, SyncAction)>,
    pub network: Option<Ensured>,
    pub volumes: Vec<(String, Ensured)>,
    pub containers: Vec<(String, RolloutOutcome)>,
}

/// Provisioning pipeline: load config, prepare the host, sync
/// repositories, ensure volumes, then roll out containers. The
/// first failing phase stops the run.
pub struct Pipeline {
    env_file: PathBuf,
    host: HostPreparer,
    readiness: Readiness,
    skip_host: bool,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            host: HostPreparer::new(),
            readiness: Readiness::new(),
            skip_host: false,
        }
    }

    #[must_use]
    pub fn env_file(mut self, path: impl AsRef<Path>) -> Self {
        self.env_file = path.as_ref().to_path_buf();
        self
    }

    #[must_use]
    pub fn host(mut self, host: HostPreparer) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub const fn readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    #[must_use]
    pub const fn skip_host(mut self, skip: bool) -> Self {
        self.skip_host = skip;
        self
    }

    /// Parse CLI arguments and run, or print the plan with
    /// `--dry-run`.
    ///
    /// # Errors
    ///
    /// Returns the first phase error.
    pub fn run(self) -> DeployResult<()> {
        let cli = Cli::parse();

        let mut pipeline = self.skip_host(cli.skip_host);
        if let Some(path) = cli.env_file {
            pipeline = pipeline.env_file(path);
        }
        if cli.no_sudo {
            let host = pipeline.host.clone().sudo(false);
            pipeline = pipeline.host(host);
        }

        info!("Loading configuration from {}", pipeline.env_file.display());
        let config = Config::load(&pipeline.env_file)?;
        if cli.dry_run {
            pipeline.print_plan(&config);
            return Ok(());
        }

        let system = System::new().redacting(&config.secrets());
        let report = pipeline.apply(&system, &config)?;
        info!(
            "Provisioning complete: {} repositories, {} volumes, {} containers",
            report.repositories.len(),
            report.volumes.len(),
            report.containers.len()
        );
        Ok(())
    }

    /// Load the env file, then run every phase against `runner`.
    /// Nothing runs when the configuration is missing or
    /// incomplete.
    pub fn execute(&self, runner: &dyn Runner) -> DeployResult<Report> {
        info!("Loading configuration from {}", self.env_file.display());
        let config = Config::load(&self.env_file)?;
        self.apply(runner, &config)
    }

    /// Run every phase for an already validated configuration.
    /// Secrets are masked in the returned error.
    pub fn apply(&self, runner: &dyn Runner, config: &Config) -> DeployResult<Report> {
        self.run_phases(runner, config)
            .map_err(|e| e.redact(&config.secrets()))
    }

    fn run_phases(&self, runner: &dyn Runner, config: &Config) -> DeployResult<Report> {
        let mut report = Report::default();

        if self.skip_host {
            info!("Skipping host preparation");
        } else {
            report.host = Some(self.host.prepare(runner)?);
        }

        for site in config.synced_sites() {
            let action = git::sync(runner, &site.repository(), &config.git)?;
            report.repositories.push((site.dir.clone(), action));
        }

        report.network = Some(volume::ensure_network(runner, &config.network)?);
        report.volumes = volume::ensure_volumes(runner, &VOLUMES)?;

        let orchestrator = Orchestrator::new(runner, self.readiness);
        for service in stack::services(config) {
            let outcome = orchestrator.deploy(&service)?;
            report.containers.push((service.name.clone(), outcome));
        }

        Ok(report)
    }

    /// Describe what [`Pipeline::apply`] would do, with secrets
    /// masked.
    #[must_use]
    pub fn plan(&self, config: &Config) -> String {
        let mut out = String::new();
        let mut step = 0;
        let mut line = |text: String| {
            step += 1;
            let _ = writeln!(out, "{step}. {text}");
        };

        if !self.skip_host {
            line(format!(
                "Refresh package index; install, start and enable {} if {} is missing",
                self.host.package, self.host.binary
            ));
        }
        for site in config.synced_sites() {
            line(format!(
                "Force-sync {} to {} ({})",
                site.dir.display(),
                git::strip_userinfo(&site.repo_url),
                site.branch
            ));
        }
        line(format!("Ensure network {}", config.network));
        line(format!("Ensure volumes {}", VOLUMES.join(", ")));
        for service in stack::services(config) {
            if let Some(args) = service.build_args() {
                let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                line(cmd::format_command("docker", &refs));
            }
            let args = service.run_args(&service.name);
            let refs: Vec<&str> = args.iter().map(String::as_str).collect();
            line(cmd::format_command("docker", &refs));
        }

        cmd::redact(&out, &config.secrets())
    }

    fn print_plan(&self, config: &Config) {
        eprintln!("=== Dry run: no changes will be made ===");
        eprintln!("Configuration: {}", config.path.display());
        let enabled: Vec<&str> = config.services.iter().map(|s| s.as_str()).collect();
        eprintln!("Services: {}", enabled.join(", "));
        eprintln!();
        eprintln!("--- Actions that would be performed ---");
        print!("{}", self.plan(config));
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Parser)]
#[command(name = "alicerce")]
#[command(about = "Provision the database, TLS reverse proxy and frontend containers")]
#[command(version)]
struct Cli {
    /// Environment file with the deployment configuration
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Validate the configuration and print the plan without
    /// executing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not update packages or install the container runtime
    #[arg(long)]
    skip_host: bool,

    /// Run package and service manager commands without sudo
    #[arg(long)]
    no_sudo: bool,
}
