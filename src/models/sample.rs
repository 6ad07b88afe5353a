// One measurement record and the provider results it is assembled from

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Result of one network speed test against the selected server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedResult {
    pub server: String,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}

/// Host metrics at the time of a measurement. Memory figures are in GiB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMetrics {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub mem_used_gb: f64,
    pub mem_total_gb: f64,
    pub cpu_temp: Option<f64>,
}

/// One measurement. A failed cycle has every numeric field `None` and `error` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub download: Option<f64>,
    pub upload: Option<f64>,
    pub ping: Option<f64>,
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub mem_used: Option<f64>,
    pub mem_total: Option<f64>,
    pub cpu_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Sample {
    pub fn measured(timestamp: DateTime<Local>, speed: &SpeedResult, host: &HostMetrics) -> Self {
        Self {
            timestamp,
            download: Some(round_to(speed.download_mbps, 2)),
            upload: Some(round_to(speed.upload_mbps, 2)),
            ping: Some(round_to(speed.ping_ms, 2)),
            cpu_percent: Some(round_to(host.cpu_percent, 1)),
            mem_percent: Some(round_to(host.mem_percent, 1)),
            mem_used: Some(round_to(host.mem_used_gb, 2)),
            mem_total: Some(round_to(host.mem_total_gb, 2)),
            cpu_temp: host.cpu_temp.map(|t| round_to(t, 1)),
            error: None,
        }
    }

    pub fn failed(timestamp: DateTime<Local>, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown measurement error".into();
        }
        Self {
            timestamp,
            download: None,
            upload: None,
            ping: None,
            cpu_percent: None,
            mem_percent: None,
            mem_used: None,
            mem_total: None,
            cpu_temp: None,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
