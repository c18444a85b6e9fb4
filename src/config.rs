use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{DeployError, DeployResult};
use crate::git::{GitCredentials, Repository, encode_userinfo};

/// Keys that must be present and non-empty before any phase with
/// side effects runs.
pub const REQUIRED_KEYS: [&str; 16] = [
    "DEFAULT_EMAIL",
    "GIT_USERNAME",
    "GIT_TOKEN",
    "FRONTEND_REPO_URL",
    "FRONTEND_BRANCH",
    "FRONTEND_VIRTUAL_HOST",
    "FRONTEND_LETSENCRYPT_HOST",
    "BACKEND_REPO_URL",
    "BACKEND_BRANCH",
    "BACKEND_VIRTUAL_HOST",
    "BACKEND_LETSENCRYPT_HOST",
    "TZ",
    "API_BASE_URL",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_DB",
];

pub const DEFAULT_SERVICES: [ServiceKind; 3] = [
    ServiceKind::Database,
    ServiceKind::Proxy,
    ServiceKind::Frontend,
];

/// A group of containers that can be switched on or off through
/// `ENABLED_SERVICES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Database,
    /// The reverse proxy and its ACME companion.
    Proxy,
    Frontend,
    Backend,
}

impl ServiceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Proxy => "proxy",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" | "db" => Ok(Self::Database),
            "proxy" => Ok(Self::Proxy),
            "frontend" => Ok(Self::Frontend),
            "backend" => Ok(Self::Backend),
            other => Err(format!("unknown service '{other}'")),
        }
    }
}

/// A deployed site: the repository it is built from and the
/// hostnames the proxy serves it on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub repo_url: String,
    pub branch: String,
    pub virtual_host: String,
    pub letsencrypt_host: String,
    /// Local working copy, absolute.
    pub dir: PathBuf,
}

impl Site {
    #[must_use]
    pub fn repository(&self) -> Repository {
        Repository::new(&self.repo_url, &self.branch, &self.dir)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Database {
    pub user: String,
    pub password: String,
    pub name: String,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("user", &self.user)
            .field("password", &"********")
            .field("name", &self.name)
            .finish()
    }
}

/// Deployment configuration, loaded once from the env file and
/// never mutated afterwards.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use alicerce::config::{Config, ServiceKind};
///
/// let content = "\
/// DEFAULT_EMAIL=ops@example.com
/// GIT_USERNAME=deployer
/// GIT_TOKEN=ghp_secret
/// FRONTEND_REPO_URL=https://github.com/acme/web.git
/// FRONTEND_BRANCH=main
/// FRONTEND_VIRTUAL_HOST=app.example.com
/// FRONTEND_LETSENCRYPT_HOST=app.example.com
/// BACKEND_REPO_URL=https://github.com/acme/api.git
/// BACKEND_BRANCH=main
/// BACKEND_VIRTUAL_HOST=api.example.com
/// BACKEND_LETSENCRYPT_HOST=api.example.com
/// TZ=Europe/Lisbon
/// API_BASE_URL=https://api.example.com
/// POSTGRES_USER=app
/// POSTGRES_PASSWORD=hunter2
/// POSTGRES_DB=app
/// ";
///
/// let config = Config::parse(content, Path::new("/srv/deploy/.env")).unwrap();
///
/// assert_eq!(config.frontend.virtual_host, "app.example.com");
/// assert_eq!(config.frontend.dir, Path::new("/srv/deploy/frontend"));
/// assert!(!config.is_enabled(ServiceKind::Backend));
/// ```
#[derive(Clone)]
pub struct Config {
    /// The env file this configuration was read from.
    pub path: PathBuf,
    pub default_email: String,
    pub git: GitCredentials,
    pub frontend: Site,
    pub backend: Site,
    pub timezone: String,
    pub api_base_url: String,
    pub database: Database,
    pub services: Vec<ServiceKind>,
    pub network: String,
    /// Host file bind-mounted into the proxy as extra nginx config.
    pub proxy_conf: PathBuf,
    /// Every entry of the file, in file order.
    pub entries: IndexMap<String, String>,
}

impl Config {
    /// Read and validate the env file at `path`.
    ///
    /// With the proxy enabled, the `PROXY_CONF` file must exist
    /// too: docker would bind-mount a missing source as an empty
    /// directory and nginx would refuse to start.
    pub fn load(path: &Path) -> DeployResult<Self> {
        if !path.is_file() {
            return Err(DeployError::ConfigFileMissing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content, path)?;

        if config.is_enabled(ServiceKind::Proxy) && !config.proxy_conf.is_file() {
            return Err(DeployError::ProxyConfigMissing(config.proxy_conf));
        }
        Ok(config)
    }

    /// Validate env file `content` as if it were read from `path`.
    /// Relative directories resolve against the file's directory.
    pub fn parse(content: &str, path: &Path) -> DeployResult<Self> {
        let entries = parse_env(content)?;

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| entries.get(**key).is_none_or(|v| v.is_empty()))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DeployError::MissingKeys {
                path: path.to_path_buf(),
                keys: missing,
            });
        }

        let base_dir = base_dir(path)?;
        let get = |key: &str| entries.get(key).cloned().unwrap_or_default();
        let optional = |key: &str, default: &str| {
            entries
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let services = match entries.get("ENABLED_SERVICES") {
            Some(list) if !list.is_empty() => parse_services(list)
                .map_err(|reason| DeployError::ConfigInvalid {
                    line: line_of(content, "ENABLED_SERVICES"),
                    reason,
                })?,
            _ => DEFAULT_SERVICES.to_vec(),
        };

        let frontend = Site {
            repo_url: get("FRONTEND_REPO_URL"),
            branch: get("FRONTEND_BRANCH"),
            virtual_host: get("FRONTEND_VIRTUAL_HOST"),
            letsencrypt_host: get("FRONTEND_LETSENCRYPT_HOST"),
            dir: resolve(&base_dir, &optional("FRONTEND_DIR", "frontend")),
        };
        let backend = Site {
            repo_url: get("BACKEND_REPO_URL"),
            branch: get("BACKEND_BRANCH"),
            virtual_host: get("BACKEND_VIRTUAL_HOST"),
            letsencrypt_host: get("BACKEND_LETSENCRYPT_HOST"),
            dir: resolve(&base_dir, &optional("BACKEND_DIR", "backend")),
        };

        Ok(Self {
            path: path.to_path_buf(),
            default_email: get("DEFAULT_EMAIL"),
            git: GitCredentials::new(&get("GIT_USERNAME"), &get("GIT_TOKEN")),
            frontend,
            backend,
            timezone: get("TZ"),
            api_base_url: get("API_BASE_URL"),
            database: Database {
                user: get("POSTGRES_USER"),
                password: get("POSTGRES_PASSWORD"),
                name: get("POSTGRES_DB"),
            },
            services,
            network: optional("DOCKER_NETWORK", "alicerce"),
            proxy_conf: resolve(&base_dir, &optional("PROXY_CONF", "proxy.conf")),
            entries,
        })
    }

    #[must_use]
    pub fn is_enabled(&self, kind: ServiceKind) -> bool {
        self.services.contains(&kind)
    }

    /// Values that must never appear in logs, errors or printed
    /// plans. The token is listed as written and, when it differs,
    /// in the percent-encoded form it takes inside a remote URL.
    #[must_use]
    pub fn secrets(&self) -> Vec<String> {
        let mut secrets = vec![self.git.token.clone()];
        let encoded = encode_userinfo(&self.git.token);
        if encoded != self.git.token {
            secrets.push(encoded);
        }
        secrets.push(self.database.password.clone());
        secrets.retain(|s| !s.is_empty());
        secrets
    }

    /// Sites whose repositories are synced before rollout, in
    /// order.
    #[must_use]
    pub fn synced_sites(&self) -> Vec<&Site> {
        let mut sites = Vec::new();
        if self.is_enabled(ServiceKind::Frontend) {
            sites.push(&self.frontend);
        }
        if self.is_enabled(ServiceKind::Backend) {
            sites.push(&self.backend);
        }
        sites
    }
}

// Raw entries hold the secrets too, so only their keys are shown.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("default_email", &self.default_email)
            .field("git", &self.git)
            .field("frontend", &self.frontend)
            .field("backend", &self.backend)
            .field("timezone", &self.timezone)
            .field("api_base_url", &self.api_base_url)
            .field("database", &self.database)
            .field("services", &self.services)
            .field("network", &self.network)
            .field("proxy_conf", &self.proxy_conf)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parse `KEY=VALUE` lines into an ordered map.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix
/// is accepted, and matching single or double quotes around a
/// value are removed. Later duplicates override earlier ones.
pub fn parse_env(content: &str) -> DeployResult<IndexMap<String, String>> {
    let mut entries = IndexMap::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| DeployError::ConfigInvalid {
                line: line_no,
                reason: format!("expected KEY=VALUE, got '{trimmed}'"),
            })?;
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(DeployError::ConfigInvalid {
                line: line_no,
                reason: format!("invalid key '{key}'"),
            });
        }

        entries.insert(key.to_string(), unquote(value.trim()));
    }

    Ok(entries)
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str) -> String {
    // A quoted value may be followed by a comment
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                let tail = rest[end + 1..].trim_start();
                if tail.is_empty() || tail.starts_with('#') {
                    return rest[..end].to_string();
                }
            }
        }
    }
    // Inline comment on an unquoted value
    value
        .split_once(" #")
        .map_or(value, |(v, _)| v)
        .trim_end()
        .to_string()
}

fn parse_services(list: &str) -> Result<Vec<ServiceKind>, String> {
    let mut services = Vec::new();
    for name in list.split(',').filter(|s| !s.trim().is_empty()) {
        let kind = name.parse::<ServiceKind>()?;
        if !services.contains(&kind) {
            services.push(kind);
        }
    }
    Ok(services)
}

// Last occurrence, matching the duplicate that wins in parse_env.
fn line_of(content: &str, key: &str) -> usize {
    let lines: Vec<&str> = content.lines().collect();
    lines
        .iter()
        .rposition(|l| {
            let l = l.trim();
            let l = l.strip_prefix("export ").unwrap_or(l);
            l.split_once('=').is_some_and(|(k, _)| k.trim() == key)
        })
        .map_or(0, |i| i + 1)
}

fn base_dir(path: &Path) -> DeployResult<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(std::path::absolute(parent)?)
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let p = Path::new(value);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
