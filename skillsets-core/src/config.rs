use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = ".skillsets.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub churn: WindowConfig,
    #[serde(default)]
    pub tasks: WindowConfig,
    #[serde(default)]
    pub context_switch: ContextSwitchConfig,
    #[serde(default)]
    pub branches: BranchConfig,
    #[serde(default)]
    pub complexity: ComplexityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory report files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Include the "Generated at" line in report headers.
    #[serde(default = "default_true")]
    pub timestamp: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            timestamp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CommandsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    90
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSwitchConfig {
    #[serde(default = "default_switch_days")]
    pub days: i64,
    /// Gap between commits that counts as a break in focus.
    #[serde(default = "default_gap_minutes")]
    pub gap_minutes: i64,
    /// Shortest stretch reported as a focus period.
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: i64,
}

fn default_switch_days() -> i64 {
    30
}

fn default_gap_minutes() -> i64 {
    30
}

fn default_focus_minutes() -> i64 {
    45
}

impl Default for ContextSwitchConfig {
    fn default() -> Self {
        Self {
            days: default_switch_days(),
            gap_minutes: default_gap_minutes(),
            focus_minutes: default_focus_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default = "default_zombie_days")]
    pub zombie_days: i64,
}

fn default_zombie_days() -> i64 {
    90
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            zombie_days: default_zombie_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityConfig {
    #[serde(default = "default_ccn_threshold")]
    pub ccn_threshold: u32,
}

fn default_ccn_threshold() -> u32 {
    15
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            ccn_threshold: default_ccn_threshold(),
        }
    }
}

/// Load configuration from `dir/.skillsets.toml`, falling back to defaults.
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_from(&dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.report.output_dir, PathBuf::from("."));
        assert!(config.report.timestamp);
        assert_eq!(config.commands.timeout_secs, 60);
        assert_eq!(config.churn.days, 90);
        assert_eq!(config.context_switch.days, 30);
        assert_eq!(config.context_switch.gap_minutes, 30);
        assert_eq!(config.branches.zombie_days, 90);
        assert_eq!(config.complexity.ccn_threshold, 15);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [report]
            timestamp = false

            [churn]
            days = 30
            "#,
        )
        .unwrap();

        assert!(!config.report.timestamp);
        assert_eq!(config.report.output_dir, PathBuf::from("."));
        assert_eq!(config.churn.days, 30);
        assert_eq!(config.tasks.days, 90);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.branches.zombie_days, 90);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[complexity]\nccn_threshold = 10\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.complexity.ccn_threshold, 10);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[churn]\ndays = \"x\"\n").unwrap();
        assert!(load_config(dir.path()).is_err());
    }
}
