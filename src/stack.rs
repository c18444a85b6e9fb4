//! The fixed service set deployed from a [`Config`].

use crate::config::{Config, ServiceKind};
use crate::service::{Rollout, Service};

pub const DATABASE_IMAGE: &str = "postgres:16.4-alpine";
pub const PROXY_IMAGE: &str = "nginxproxy/nginx-proxy:1.6";
pub const ACME_IMAGE: &str = "nginxproxy/acme-companion:2.4";

pub const DATABASE: &str = "postgres";
pub const PROXY: &str = "nginx-proxy";
pub const ACME: &str = "acme-companion";
pub const FRONTEND: &str = "frontend";
pub const BACKEND: &str = "backend";

const FRONTEND_PORT: u16 = 3000;
const BACKEND_PORT: u16 = 8000;
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Enabled services in start order: database, proxy pair,
/// frontend, backend. Dependencies always come first.
#[must_use]
pub fn services(config: &Config) -> Vec<Service> {
    let mut services = Vec::new();

    if config.is_enabled(ServiceKind::Database) {
        services.push(database(config));
    }
    if config.is_enabled(ServiceKind::Proxy) {
        services.push(proxy(config));
        services.push(acme_companion(config));
    }
    if config.is_enabled(ServiceKind::Frontend) {
        services.push(frontend(config));
    }
    if config.is_enabled(ServiceKind::Backend) {
        services.push(backend(config));
    }

    services
}

fn database(config: &Config) -> Service {
    let db = &config.database;
    Service::new(DATABASE, DATABASE_IMAGE)
        .network(&config.network)
        .expose(5432)
        .volume("postgres-data", "/var/lib/postgresql/data")
        .env("POSTGRES_USER", &db.user)
        .env("POSTGRES_PASSWORD", &db.password)
        .env("POSTGRES_DB", &db.name)
        .env("TZ", &config.timezone)
        .healthcheck(&format!("pg_isready -U {} -d {}", db.user, db.name))
}

fn proxy(config: &Config) -> Service {
    Service::new(PROXY, PROXY_IMAGE)
        .network(&config.network)
        .publish(80, 80)
        .publish(443, 443)
        .volume("certs", "/etc/nginx/certs")
        .volume("html", "/usr/share/nginx/html")
        .volume("vhost", "/etc/nginx/vhost.d")
        .bind(DOCKER_SOCKET, "/tmp/docker.sock", true)
        .bind(&config.proxy_conf, "/etc/nginx/conf.d/custom.conf", true)
        .env("TZ", &config.timezone)
}

fn acme_companion(config: &Config) -> Service {
    Service::new(ACME, ACME_IMAGE)
        .network(&config.network)
        .volume("certs", "/etc/nginx/certs")
        .volume("html", "/usr/share/nginx/html")
        .volume("vhost", "/etc/nginx/vhost.d")
        .volume("acme", "/etc/acme.sh")
        .bind(DOCKER_SOCKET, DOCKER_SOCKET, false)
        .env("DEFAULT_EMAIL", &config.default_email)
        .env("NGINX_PROXY_CONTAINER", PROXY)
        .env("TZ", &config.timezone)
}

fn frontend(config: &Config) -> Service {
    let site = &config.frontend;
    let port = FRONTEND_PORT.to_string();
    Service::new(FRONTEND, "frontend:latest")
        .build(&site.dir)
        .network(&config.network)
        .cpus("1.0")
        .memory("1g")
        .expose(FRONTEND_PORT)
        .env("VIRTUAL_HOST", &site.virtual_host)
        .env("VIRTUAL_PORT", &port)
        .env("LETSENCRYPT_HOST", &site.letsencrypt_host)
        .env("LETSENCRYPT_EMAIL", &config.default_email)
        .env("PORT", &port)
        .env("TZ", &config.timezone)
        .env("API_BASE_URL", &config.api_base_url)
        .rollout(Rollout::BlueGreen)
}

fn backend(config: &Config) -> Service {
    let site = &config.backend;
    let db = &config.database;
    let port = BACKEND_PORT.to_string();
    Service::new(BACKEND, "backend:latest")
        .build(&site.dir)
        .network(&config.network)
        .cpus("1.0")
        .memory("1g")
        .expose(BACKEND_PORT)
        .env("VIRTUAL_HOST", &site.virtual_host)
        .env("VIRTUAL_PORT", &port)
        .env("LETSENCRYPT_HOST", &site.letsencrypt_host)
        .env("LETSENCRYPT_EMAIL", &config.default_email)
        .env("PORT", &port)
        .env("TZ", &config.timezone)
        .env(
            "DATABASE_URL",
            &format!(
                "postgres://{}:{}@{DATABASE}:5432/{}",
                db.user, db.password, db.name
            ),
        )
        .env(
            "CORS_ALLOWED_ORIGIN",
            &format!("https://{}", config.frontend.virtual_host),
        )
        .rollout(Rollout::BlueGreen)
}
