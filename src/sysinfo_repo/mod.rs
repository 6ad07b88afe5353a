// Host metrics via sysinfo: CPU usage, memory, temperature

mod linux;

use crate::error::MeasurementError;
use crate::models::HostMetrics;
use async_trait::async_trait;
use std::sync::Arc;
use sysinfo::{Components, System};
use tracing::instrument;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Sensor labels that usually belong to the CPU package.
const CPU_SENSOR_HINTS: [&str; 6] = ["package", "tctl", "tdie", "coretemp", "k10temp", "cpu"];

/// Source of host CPU / memory / temperature readings.
#[async_trait]
pub trait HostMetricsProvider: Send + Sync {
    async fn collect(&self) -> Result<HostMetrics, MeasurementError>;
}

pub struct SysinfoRepo {
    sys: Arc<std::sync::Mutex<System>>,
    components: Arc<std::sync::Mutex<Components>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Baseline so the first collect reports usage since construction
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        let components = Components::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            components: Arc::new(std::sync::Mutex::new(components)),
        }
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "get_host_metrics"))]
    pub async fn get_host_metrics(&self) -> Result<HostMetrics, MeasurementError> {
        let sys = self.sys.clone();
        let components = self.components.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = sys
                .lock()
                .map_err(|e| MeasurementError::HostMetrics(format!("sysinfo lock poisoned: {}", e)))?;
            sys.refresh_cpu_usage();
            sys.refresh_memory();

            let cpu_percent = (sys.global_cpu_usage() as f64).clamp(0.0, 100.0);
            let total = sys.total_memory();
            if total == 0 {
                return Err(MeasurementError::HostMetrics(
                    "total memory reported as 0".into(),
                ));
            }
            let used = total.saturating_sub(sys.available_memory());
            let mem_percent = (used as f64 / total as f64) * 100.0;

            let cpu_temp = match components.lock() {
                Ok(mut components) => {
                    components.refresh(false);
                    pick_cpu_temperature(
                        components
                            .list()
                            .iter()
                            .map(|c| (c.label(), c.temperature())),
                    )
                }
                Err(_) => None,
            }
            .or_else(|| {
                let zones = linux::read_thermal_zones_linux();
                pick_cpu_temperature(zones.iter().map(|(kind, t)| (kind.as_str(), Some(*t))))
            });

            Ok(HostMetrics {
                cpu_percent,
                mem_percent,
                mem_used_gb: used as f64 / BYTES_PER_GIB,
                mem_total_gb: total as f64 / BYTES_PER_GIB,
                cpu_temp,
            })
        })
        .await?
    }
}

#[async_trait]
impl HostMetricsProvider for SysinfoRepo {
    async fn collect(&self) -> Result<HostMetrics, MeasurementError> {
        self.get_host_metrics().await
    }
}

/// CPU-looking sensor first, otherwise the first sensor with a plausible reading.
fn pick_cpu_temperature<'a>(
    readings: impl IntoIterator<Item = (&'a str, Option<f32>)>,
) -> Option<f64> {
    let valid: Vec<(String, f32)> = readings
        .into_iter()
        .filter_map(|(label, t)| {
            t.filter(|t| t.is_finite() && *t > 0.0)
                .map(|t| (label.to_ascii_lowercase(), t))
        })
        .collect();
    valid
        .iter()
        .find(|(label, _)| CPU_SENSOR_HINTS.iter().any(|hint| label.contains(hint)))
        .or_else(|| valid.first())
        .map(|(_, t)| *t as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_cpu_sensor() {
        let readings = [
            ("acpitz temp1", Some(30.0)),
            ("coretemp Package id 0", Some(52.0)),
        ];
        assert_eq!(pick_cpu_temperature(readings), Some(52.0));
    }

    #[test]
    fn falls_back_to_first_valid_reading() {
        let readings = [("nvme Composite", None), ("acpitz", Some(41.0))];
        assert_eq!(pick_cpu_temperature(readings), Some(41.0));
    }

    #[test]
    fn no_sensors_means_no_temperature() {
        assert_eq!(pick_cpu_temperature([("cpu", Some(f32::NAN))]), None);
        assert_eq!(pick_cpu_temperature(std::iter::empty()), None);
    }
}
