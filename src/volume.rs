use tracing::info;

use crate::cmd::Runner;
use crate::error::DeployResult;

/// Named volumes every deployment keeps across runs: proxy html
/// assets, TLS certificates, ACME state, per-host proxy config
/// and database files.
pub const VOLUMES: [&str; 5] = ["html", "certs", "acme", "vhost", "postgres-data"];

/// Outcome of an idempotent ensure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Created,
    Existing,
}

/// Create the named volume unless `docker volume inspect` already
/// finds it. An existing volume is never touched.
pub fn ensure_volume(runner: &dyn Runner, name: &str) -> DeployResult<Ensured> {
    ensure(runner, "volume", name, &[])
}

/// Create a user-defined bridge network unless one with this name
/// exists.
pub fn ensure_network(runner: &dyn Runner, name: &str) -> DeployResult<Ensured> {
    ensure(runner, "network", name, &["--driver", "bridge"])
}

/// Ensure every volume in `names`, in order.
pub fn ensure_volumes(runner: &dyn Runner, names: &[&str]) -> DeployResult<Vec<(String, Ensured)>> {
    names
        .iter()
        .map(|name| ensure_volume(runner, name).map(|e| ((*name).to_string(), e)))
        .collect()
}

fn ensure(runner: &dyn Runner, kind: &str, name: &str, create_opts: &[&str]) -> DeployResult<Ensured> {
    if runner.succeeds("docker", &[kind, "inspect", name]) {
        info!("Docker {kind} '{name}' already exists");
        return Ok(Ensured::Existing);
    }

    info!("Creating docker {kind} '{name}'...");
    let mut args = vec![kind, "create"];
    args.extend_from_slice(create_opts);
    args.push(name);
    runner.run("docker", &args)?;

    Ok(Ensured::Created)
}
