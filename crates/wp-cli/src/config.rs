//! CLI configuration file
//!
//! ```toml
//! gateway = "rest"
//!
//! [log]
//! level = "info"
//! json = false
//!
//! [rest]
//! base_url = "https://dashboard.example.org/api"
//! timeout_secs = 30
//!
//! [provision]
//! failure_policy = "compensate"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use wp_gateway::RestGatewayConfig;
use wp_provision::ProvisionConfig;

/// Backend the CLI provisions into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// In-process store, discarded on exit
    #[default]
    Memory,
    /// REST backend
    Rest,
}

impl FromStr for GatewayKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "rest" => Ok(Self::Rest),
            other => anyhow::bail!("unknown gateway '{other}', expected memory or rest"),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub gateway: GatewayKind,
    pub log: LogConfig,
    pub rest: RestGatewayConfig,
    pub provision: ProvisionConfig,
}

impl CliConfig {
    /// Load and validate a TOML configuration file
    ///
    /// # Errors
    /// Fails if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Fails on malformed TOML or an unsupported provisioning configuration
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.provision.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wp_provision::{FailurePolicy, Scheduling};

    #[test]
    fn empty_file_is_default() {
        assert_eq!(CliConfig::from_toml_str("").unwrap(), CliConfig::default());
    }

    #[test]
    fn nested_sections_parse() {
        let config = CliConfig::from_toml_str(
            r#"
            gateway = "rest"

            [log]
            json = true

            [rest]
            base_url = "https://dashboard.example.org/api"

            [provision]
            failure_policy = "compensate"

            [provision.scheduling]
            mode = "concurrent"
            max_in_flight = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway, GatewayKind::Rest);
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.rest.timeout_secs, 30);
        assert_eq!(config.provision.failure_policy, FailurePolicy::Compensate);
        assert_eq!(config.provision.scheduling, Scheduling::Concurrent { max_in_flight: 2 });
    }

    #[test]
    fn unsupported_provision_settings_are_rejected() {
        let err = CliConfig::from_toml_str("[provision.scheduling]\nmode = \"concurrent\"\nmax_in_flight = 2\n")
            .unwrap_err();
        assert!(err.to_string().contains("compensate"));
    }

    #[test]
    fn gateway_kind_parses_flag_values() {
        assert_eq!("rest".parse::<GatewayKind>().unwrap(), GatewayKind::Rest);
        assert!("sql".parse::<GatewayKind>().is_err());
    }
}
