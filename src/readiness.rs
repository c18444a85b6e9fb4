use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::cmd::Runner;
use crate::error::{DeployError, DeployResult};

/// The subset of `docker inspect`'s `.State` used to decide
/// readiness.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    pub status: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub exit_code: i64,
    #[serde(default)]
    pub health: Option<Health>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Health {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Ready,
    Pending(String),
    Failed(String),
}

impl ContainerState {
    /// A running container is ready once its health check, if it
    /// has one, reports healthy. Exited, dead and unhealthy
    /// containers will not recover on their own.
    #[must_use]
    pub fn probe(&self) -> Probe {
        match self.status.as_str() {
            "exited" | "dead" => {
                return Probe::Failed(format!("{} with code {}", self.status, self.exit_code));
            }
            _ if !self.running => return Probe::Pending(self.status.clone()),
            _ => {}
        }

        match self.health.as_ref().map(|h| h.status.as_str()) {
            None | Some("healthy") => Probe::Ready,
            Some("unhealthy") => Probe::Failed("unhealthy".to_string()),
            Some(other) => Probe::Pending(other.to_string()),
        }
    }
}

/// Poll a freshly started container until it is ready.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use alicerce::readiness::Readiness;
///
/// let gate = Readiness::new().attempts(10).interval(Duration::from_millis(500));
///
/// assert_eq!(gate.attempts, 10);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    pub attempts: u32,
    pub interval: Duration,
}

impl Readiness {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attempts: 30,
            interval: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub const fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Block until `container` is ready, has failed, or the
    /// attempts run out.
    pub fn wait(&self, runner: &dyn Runner, container: &str) -> DeployResult<()> {
        info!("Waiting for '{container}' to become ready...");
        let mut last = String::from("not started");

        for attempt in 1..=self.attempts {
            match runner.run("docker", &["inspect", "--format", "{{json .State}}", container]) {
                Ok(raw) => {
                    let state: ContainerState = serde_json::from_str(&raw)?;
                    match state.probe() {
                        Probe::Ready => {
                            info!("'{container}' is ready");
                            return Ok(());
                        }
                        Probe::Failed(reason) => {
                            return Err(DeployError::ContainerNotReady {
                                name: container.to_string(),
                                reason,
                            });
                        }
                        Probe::Pending(status) => last = status,
                    }
                }
                Err(_) => last = "not found".to_string(),
            }

            debug!(
                "readiness ({attempt}/{}): '{container}' is {last}",
                self.attempts
            );
            if attempt < self.attempts {
                thread::sleep(self.interval);
            }
        }

        Err(DeployError::ContainerNotReady {
            name: container.to_string(),
            reason: format!("still {last} after {} attempts", self.attempts),
        })
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
