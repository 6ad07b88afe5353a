use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::speedtest_repo::{SpeedServer, default_servers};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitoringConfig,
    #[serde(default)]
    pub speedtest: SpeedtestConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// Seconds to wait between the end of one measurement cycle and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedtestConfig {
    /// Per-request timeout for latency probes and transfers.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Size of the upload payload in bytes.
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: usize,
    #[serde(default = "default_servers")]
    pub servers: Vec<SpeedServer>,
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            upload_bytes: default_upload_bytes(),
            servers: default_servers(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_upload_bytes() -> usize {
    10_000_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    /// Log files are named `<file_prefix>_YYYYmmdd_HHMMSS.csv`.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "speed_log".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Number of most recent points kept visible in the chart.
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    #[serde(default)]
    pub format: DisplayFormat,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            format: DisplayFormat::default(),
        }
    }
}

fn default_max_points() -> usize {
    30
}

impl AppConfig {
    /// Loads config from `explicit`, else `CONFIG_FILE`, else `config.toml`.
    /// Only an explicitly named file has to exist; otherwise a missing file means defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            let s = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("config {}: {}", path.display(), e))?;
            return Self::load_from_str(&s);
        }
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        match std::fs::read_to_string(&path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found; using defaults");
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(anyhow::anyhow!("config {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.monitor.interval_secs > 0,
            "monitor.interval_secs must be > 0, got {}",
            self.monitor.interval_secs
        );
        anyhow::ensure!(
            self.speedtest.timeout_secs > 0,
            "speedtest.timeout_secs must be > 0, got {}",
            self.speedtest.timeout_secs
        );
        anyhow::ensure!(
            self.speedtest.upload_bytes > 0,
            "speedtest.upload_bytes must be > 0, got {}",
            self.speedtest.upload_bytes
        );
        anyhow::ensure!(
            !self.speedtest.servers.is_empty(),
            "speedtest.servers must list at least one server"
        );
        for server in &self.speedtest.servers {
            anyhow::ensure!(
                !server.latency_url.is_empty()
                    && !server.download_url.is_empty()
                    && !server.upload_url.is_empty(),
                "speedtest.servers entry {:?} must set latency_url, download_url and upload_url",
                server.name
            );
        }
        anyhow::ensure!(
            !self.output.file_prefix.is_empty(),
            "output.file_prefix must be non-empty"
        );
        anyhow::ensure!(
            self.display.max_points > 0,
            "display.max_points must be > 0, got {}",
            self.display.max_points
        );
        Ok(())
    }
}
