//! ---
//! cs_section: "01-core-functionality"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Runtime configuration for the primitive reconciler."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_crm_binary() -> PathBuf {
    PathBuf::from("crm")
}

fn default_attribute_binary() -> PathBuf {
    PathBuf::from("crm_attribute")
}

fn default_readiness_enabled() -> bool {
    true
}

fn default_readiness_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_settle() -> Duration {
    Duration::from_secs(2)
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the reconciler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "CS_PRIMITIVE_CONFIG";

    /// Load configuration from disk, respecting the `CS_PRIMITIVE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        match Self::load_with_source(candidates)? {
            LoadedAppConfig {
                source: Some(_),
                config,
            } => Ok(config),
            LoadedAppConfig { source: None, .. } => Err(anyhow!(
                "no configuration files found. inspected: {}",
                candidates
                    .iter()
                    .map(|p| p.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Load configuration together with its source, falling back to defaults when
    /// neither the override nor any candidate exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found; using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.crm.validate()?;
        self.readiness.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// How to reach the crm shell and where to stage configuration updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    #[serde(default = "default_crm_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_attribute_binary")]
    pub attribute_binary: PathBuf,
    /// Configuration shadow targeted when a primitive does not name its own.
    #[serde(default)]
    pub shadow: Option<String>,
    /// Directory for staging files; the system temp directory when unset.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            binary: default_crm_binary(),
            attribute_binary: default_attribute_binary(),
            shadow: None,
            staging_dir: None,
        }
    }
}

impl CrmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(anyhow!("crm.binary cannot be empty"));
        }
        if self.attribute_binary.as_os_str().is_empty() {
            return Err(anyhow!("crm.attribute_binary cannot be empty"));
        }
        if matches!(self.shadow.as_deref(), Some(shadow) if shadow.trim().is_empty()) {
            return Err(anyhow!("crm.shadow must be omitted rather than left blank"));
        }
        if let Some(dir) = &self.staging_dir {
            if !dir.is_dir() {
                return Err(anyhow!(
                    "crm.staging_dir {} does not exist or is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }
}

/// Polling policy used while waiting for the cluster to elect a DC.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_readiness_enabled")]
    pub enabled: bool,
    #[serde(default = "default_readiness_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    #[serde(default = "default_poll_interval")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub poll_interval: Duration,
    #[serde(default = "default_settle")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub settle: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            enabled: default_readiness_enabled(),
            timeout: default_readiness_timeout(),
            poll_interval: default_poll_interval(),
            settle: default_settle(),
        }
    }
}

impl ReadinessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.poll_interval > self.timeout {
            return Err(anyhow!(
                "readiness.poll_interval ({}s) exceeds readiness.timeout ({}s)",
                self.poll_interval.as_secs(),
                self.timeout.as_secs()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files; stdout only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.crm.binary, PathBuf::from("crm"));
        assert_eq!(config.crm.attribute_binary, PathBuf::from("crm_attribute"));
        assert!(config.crm.shadow.is_none());
        assert!(config.readiness.enabled);
        assert_eq!(config.readiness.timeout, Duration::from_secs(120));
        assert_eq!(config.readiness.poll_interval, Duration::from_secs(2));
        assert!(config.logging.directory.is_none());
    }

    #[test]
    fn durations_are_read_as_seconds() {
        let config: AppConfig = r#"
            [crm]
            binary = "/usr/sbin/crm"
            shadow = "staging"

            [readiness]
            timeout = 30
            poll_interval = 1
            settle = 0
        "#
        .parse()
        .unwrap();
        assert_eq!(config.crm.binary, PathBuf::from("/usr/sbin/crm"));
        assert_eq!(config.crm.shadow.as_deref(), Some("staging"));
        assert_eq!(config.readiness.timeout, Duration::from_secs(30));
        assert_eq!(config.readiness.settle, Duration::ZERO);
    }

    #[test]
    fn poll_interval_longer_than_timeout_is_rejected() {
        let err = r#"
            [readiness]
            timeout = 1
            poll_interval = 5
        "#
        .parse::<AppConfig>()
        .unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn blank_shadow_is_rejected() {
        let err = "[crm]\nshadow = \"  \"\n".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("crm.shadow"));
    }
}
