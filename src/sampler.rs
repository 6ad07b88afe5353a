// Background sampling loop: one measurement cycle, then an interval wait checked every second.
// A cycle in flight is abandoned as soon as the state leaves Running.
// State arrives over a watch channel; samples leave over an mpsc channel in production order.

use crate::models::{MonitorState, Sample};
use crate::speedtest_repo::SpeedProvider;
use crate::sysinfo_repo::HostMetricsProvider;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, sleep};
use tracing::Instrument;

/// Granularity at which the loop notices pause/stop.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the sample channel (the loop waits if the consumer falls this far behind).
pub const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// Providers and channels for the sampling loop.
pub struct SamplerDeps {
    pub speed: Arc<dyn SpeedProvider>,
    pub host: Arc<dyn HostMetricsProvider>,
    pub sample_tx: mpsc::Sender<Sample>,
    pub state_rx: watch::Receiver<MonitorState>,
}

pub struct SamplerConfig {
    pub interval_secs: u64,
}

pub fn spawn(deps: SamplerDeps, config: SamplerConfig) -> tokio::task::JoinHandle<()> {
    let sampler_span = tracing::span!(
        tracing::Level::DEBUG,
        "sampler",
        interval_secs = config.interval_secs
    );
    tokio::spawn(run(deps, config).instrument(sampler_span))
}

async fn run(deps: SamplerDeps, config: SamplerConfig) {
    let SamplerDeps {
        speed,
        host,
        sample_tx,
        mut state_rx,
    } = deps;

    let mut cycles: u64 = 0;
    loop {
        match current_state(&state_rx) {
            MonitorState::Stopped => break,
            MonitorState::Idle | MonitorState::Paused => {
                sleep(POLL_INTERVAL).await;
                continue;
            }
            MonitorState::Running => {}
        }

        cycles += 1;
        let sample = tokio::select! {
            sample = measure_once(speed.as_ref(), host.as_ref()) => sample,
            _ = left_running(&mut state_rx) => {
                tracing::debug!(cycle = cycles, state = %current_state(&state_rx), "measurement cancelled");
                continue;
            }
        };

        if current_state(&state_rx) != MonitorState::Running {
            tracing::debug!(cycle = cycles, "discarding sample finished after state left Running");
            continue;
        }
        if sample_tx.send(sample).await.is_err() {
            tracing::debug!("sample receiver closed");
            break;
        }

        wait_interval(&state_rx, config.interval_secs).await;
    }
    tracing::debug!(cycles, "sampler shutting down");
}

/// Runs one measurement cycle. Any provider failure becomes an error sample.
pub async fn measure_once(speed: &dyn SpeedProvider, host: &dyn HostMetricsProvider) -> Sample {
    let timestamp = chrono::Local::now();
    let speed_result = match speed.measure().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, operation = "speed_test", "measurement failed");
            return Sample::failed(timestamp, e.to_string());
        }
    };
    let host_metrics = match host.collect().await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, operation = "host_metrics", "measurement failed");
            return Sample::failed(timestamp, e.to_string());
        }
    };
    tracing::debug!(
        server = %speed_result.server,
        download_mbps = speed_result.download_mbps,
        upload_mbps = speed_result.upload_mbps,
        ping_ms = speed_result.ping_ms,
        "measurement complete"
    );
    Sample::measured(timestamp, &speed_result, &host_metrics)
}

/// Sleeps up to `interval_secs`, returning early once the state leaves Running.
async fn wait_interval(state_rx: &watch::Receiver<MonitorState>, interval_secs: u64) {
    for _ in 0..interval_secs {
        if current_state(state_rx) != MonitorState::Running {
            return;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Resolves once the state is anything but Running, or the monitor is gone.
async fn left_running(state_rx: &mut watch::Receiver<MonitorState>) {
    let _ = state_rx.wait_for(|state| *state != MonitorState::Running).await;
}

/// A dropped monitor counts as Stopped.
fn current_state(state_rx: &watch::Receiver<MonitorState>) -> MonitorState {
    if state_rx.has_changed().is_err() {
        return MonitorState::Stopped;
    }
    *state_rx.borrow()
}
