//! Workplan CLI (wp-cli)
//!
//! Loads a saved wizard draft, checks it stage by stage, and provisions it
//! through an in-memory or REST gateway.
//!
//! ```rust,ignore
//! use wp_cli::{commands, CliConfig, DraftFile};
//!
//! let config = CliConfig::load(Path::new("wp.toml"))?;
//! let builder = DraftFile::load(Path::new("literacy.yaml"))?.into_builder()?;
//! println!("{}", commands::validate(&builder));
//!
//! let provisioner = Provisioner::with_config(commands::gateway_for(&config)?, config.provision)?;
//! let report = commands::provision(&builder, &provisioner).await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod config;
pub mod draft_file;
pub mod logging;

pub use commands::{FailureReport, ProvisionReport, StageStatus, ValidationReport};
pub use config::{CliConfig, GatewayKind, LogConfig};
pub use draft_file::{DraftFile, DraftFormat};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
