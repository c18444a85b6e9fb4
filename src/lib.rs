//! Provision a small self-hosted Docker stack from one env file.
//!
//! Alicerce (Portuguese for *foundation*) lays down everything a
//! single-host deployment needs, in order:
//!
//! 1. **Config** - read `KEY=VALUE` pairs into an immutable
//!    [`Config`], refusing to continue while any required key is
//!    missing or empty
//! 2. **Host** - refresh the package index and install, start
//!    and enable Docker if it is absent
//! 3. **Repositories** - force-sync each site's working copy to
//!    its branch tip
//! 4. **Volumes** - ensure the shared network and named volumes
//!    exist
//! 5. **Containers** - roll out the database, the nginx reverse
//!    proxy with its ACME companion, the frontend and, when
//!    enabled, the backend
//!
//! Each phase blocks until its commands finish. The first
//! failure stops the run.
//!
//! # Example
//!
//! ```rust,no_run
//! use alicerce::Pipeline;
//!
//! fn main() -> anyhow::Result<()> {
//!     Pipeline::new().env_file("/srv/deploy/.env").run()?;
//!     Ok(())
//! }
//! ```
//!
//! Phases run through a [`Runner`](cmd::Runner), so the whole
//! sequence can be driven without touching the host:
//!
//! ```rust,no_run
//! use alicerce::{Config, Pipeline};
//! use alicerce::cmd::System;
//!
//! # fn main() -> alicerce::error::DeployResult<()> {
//! let config = Config::load(std::path::Path::new(".env"))?;
//! let system = System::new().redacting(&config.secrets());
//! let report = Pipeline::new().skip_host(true).apply(&system, &config)?;
//! println!("{} containers rolled out", report.containers.len());
//! # Ok(())
//! # }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod config;
pub mod error;
pub mod git;
pub mod host;
pub mod orchestrator;
pub mod pipeline;
pub mod readiness;
pub mod service;
pub mod stack;
pub mod volume;

pub use config::Config;
pub use host::HostPreparer;
pub use orchestrator::Orchestrator;
pub use pipeline::Pipeline;
pub use readiness::Readiness;
pub use service::Service;
