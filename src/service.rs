use std::path::{Path, PathBuf};

/// How a running container is replaced by a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rollout {
    /// Stop and remove the old container, then start the new
    /// one. Required when the service publishes host ports or owns
    /// data another instance must not open concurrently.
    #[default]
    Recreate,
    /// Start the new container beside the old one, wait until it
    /// is ready, then retire the old one and take over its name.
    BlueGreen,
}

/// Image built locally before the container starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub context: PathBuf,
    /// Relative to `context`.
    pub dockerfile: String,
}

/// Host path bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

/// Declarative definition of one container: image, limits,
/// ports, mounts, environment and health check.
///
/// # Example
///
/// ```
/// use alicerce::service::{Rollout, Service};
///
/// let web = Service::new("frontend", "frontend:latest")
///     .build("/srv/frontend")
///     .cpus("1.0")
///     .memory("1g")
///     .expose(3000)
///     .env("PORT", "3000")
///     .network("alicerce")
///     .rollout(Rollout::BlueGreen);
///
/// let args = web.run_args("frontend");
/// assert!(args.contains(&"--cpus".to_string()));
/// assert_eq!(args.last().map(String::as_str), Some("frontend:latest"));
/// ```
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub image: String,
    pub build: Option<Build>,
    pub restart: String,
    pub cpus: Option<String>,
    pub memory: Option<String>,
    /// `host:container` publishing rules.
    pub ports: Vec<String>,
    /// Ports reachable only from other containers.
    pub expose: Vec<u16>,
    pub volumes: Vec<(String, String)>,
    pub binds: Vec<Bind>,
    pub env: Vec<(String, String)>,
    pub network: Option<String>,
    pub healthcheck: Option<String>,
    pub rollout: Rollout,
}

impl Service {
    #[must_use]
    pub fn new(name: &str, image: &str) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            build: None,
            restart: "unless-stopped".to_string(),
            cpus: None,
            memory: None,
            ports: Vec::new(),
            expose: Vec::new(),
            volumes: Vec::new(),
            binds: Vec::new(),
            env: Vec::new(),
            network: None,
            healthcheck: None,
            rollout: Rollout::Recreate,
        }
    }

    /// Build the image from `context` with its `Dockerfile`.
    #[must_use]
    pub fn build(mut self, context: impl AsRef<Path>) -> Self {
        self.build = Some(Build {
            context: context.as_ref().to_path_buf(),
            dockerfile: "Dockerfile".to_string(),
        });
        self
    }

    /// Use a different Dockerfile for the build. Has no effect
    /// without [`Service::build`].
    #[must_use]
    pub fn dockerfile(mut self, path: &str) -> Self {
        if let Some(build) = &mut self.build {
            build.dockerfile = path.to_string();
        }
        self
    }

    #[must_use]
    pub fn restart(mut self, policy: &str) -> Self {
        self.restart = policy.to_string();
        self
    }

    #[must_use]
    pub fn cpus(mut self, cpus: &str) -> Self {
        self.cpus = Some(cpus.to_string());
        self
    }

    #[must_use]
    pub fn memory(mut self, limit: &str) -> Self {
        self.memory = Some(limit.to_string());
        self
    }

    #[must_use]
    pub fn publish(mut self, host: u16, container: u16) -> Self {
        self.ports.push(format!("{host}:{container}"));
        self
    }

    #[must_use]
    pub fn expose(mut self, port: u16) -> Self {
        self.expose.push(port);
        self
    }

    #[must_use]
    pub fn volume(mut self, name: &str, mount: &str) -> Self {
        self.volumes.push((name.to_string(), mount.to_string()));
        self
    }

    #[must_use]
    pub fn bind(mut self, host: impl AsRef<Path>, container: &str, read_only: bool) -> Self {
        self.binds.push(Bind {
            host: host.as_ref().to_path_buf(),
            container: container.to_string(),
            read_only,
        });
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn network(mut self, network: &str) -> Self {
        self.network = Some(network.to_string());
        self
    }

    #[must_use]
    pub fn healthcheck(mut self, cmd: &str) -> Self {
        self.healthcheck = Some(cmd.to_string());
        self
    }

    #[must_use]
    pub const fn rollout(mut self, rollout: Rollout) -> Self {
        self.rollout = rollout;
        self
    }

    /// Arguments for `docker run` starting this service as
    /// `container_name`. The service name stays resolvable on the
    /// network whatever the container is called.
    #[must_use]
    pub fn run_args(&self, container_name: &str) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            container_name.to_string(),
            "--restart".into(),
            self.restart.clone(),
        ];

        if let Some(network) = &self.network {
            args.extend(["--network".into(), network.clone()]);
            args.extend(["--network-alias".into(), self.name.clone()]);
        }
        if let Some(cpus) = &self.cpus {
            args.extend(["--cpus".into(), cpus.clone()]);
        }
        if let Some(memory) = &self.memory {
            args.extend(["--memory".into(), memory.clone()]);
        }
        for port in &self.ports {
            args.extend(["-p".into(), port.clone()]);
        }
        for port in &self.expose {
            args.extend(["--expose".into(), port.to_string()]);
        }
        for (name, mount) in &self.volumes {
            args.extend(["-v".into(), format!("{name}:{mount}")]);
        }
        for bind in &self.binds {
            let mut volume_arg = format!("{}:{}", bind.host.display(), bind.container);
            if bind.read_only {
                volume_arg.push_str(":ro");
            }
            args.extend(["-v".into(), volume_arg]);
        }
        for (key, value) in &self.env {
            args.extend(["-e".into(), format!("{key}={value}")]);
        }
        if let Some(cmd) = &self.healthcheck {
            args.extend([
                "--health-cmd".into(),
                cmd.clone(),
                "--health-interval".into(),
                "10s".into(),
                "--health-timeout".into(),
                "5s".into(),
                "--health-retries".into(),
                "5".into(),
                "--health-start-period".into(),
                "10s".into(),
            ]);
        }

        args.push(self.image.clone());
        args
    }

    /// Arguments for `docker build`, when the image is built
    /// locally.
    #[must_use]
    pub fn build_args(&self) -> Option<Vec<String>> {
        self.build.as_ref().map(|build| {
            vec![
                "build".into(),
                "-t".into(),
                self.image.clone(),
                "-f".into(),
                build.context.join(&build.dockerfile).display().to_string(),
                build.context.display().to_string(),
            ]
        })
    }
}
