// SamplingMonitor: lifecycle state machine, sample delivery and persistence on stop.
// Lives in the control context; the sampling loop only sees state through a watch channel.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::MonitorError;
use crate::export;
use crate::models::{Command, MonitorState, Sample};
use crate::sampler::{self, SAMPLE_CHANNEL_CAPACITY, SamplerConfig, SamplerDeps};
use crate::series::Series;
use crate::speedtest_repo::SpeedProvider;
use crate::sysinfo_repo::HostMetricsProvider;

/// One sample as handed to a sink, with its position and drop flag.
pub struct Delivery<'a> {
    pub index: usize,
    pub sample: &'a Sample,
    pub is_drop: bool,
    pub series: &'a Series,
}

/// Display side of the monitor. Called from the control context; must return promptly.
pub trait SampleSink: Send {
    /// Called exactly once per sample, in production order.
    fn deliver(&mut self, delivery: &Delivery<'_>);

    fn state_changed(&mut self, _state: MonitorState) {}
}

pub struct MonitorDeps {
    pub speed: Arc<dyn SpeedProvider>,
    pub host: Arc<dyn HostMetricsProvider>,
    pub sink: Box<dyn SampleSink>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval_secs: u64,
    /// Fixed for the monitor's lifetime.
    pub csv_path: PathBuf,
}

impl MonitorConfig {
    pub fn from_app_config(config: &AppConfig, started_at: DateTime<Local>) -> Self {
        Self {
            interval_secs: config.monitor.interval_secs,
            csv_path: export::session_csv_path(
                &config.output.directory,
                &config.output.file_prefix,
                started_at,
            ),
        }
    }
}

pub struct SamplingMonitor {
    state_tx: watch::Sender<MonitorState>,
    speed: Arc<dyn SpeedProvider>,
    host: Arc<dyn HostMetricsProvider>,
    sink: Box<dyn SampleSink>,
    config: MonitorConfig,
    series: Series,
    sample_rx: Option<mpsc::Receiver<Sample>>,
    sampler: Option<JoinHandle<()>>,
}

impl SamplingMonitor {
    pub fn new(deps: MonitorDeps, config: MonitorConfig) -> Self {
        let (state_tx, _) = watch::channel(MonitorState::Idle);
        Self {
            state_tx,
            speed: deps.speed,
            host: deps.host,
            sink: deps.sink,
            config,
            series: Series::new(),
            sample_rx: None,
            sampler: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn csv_path(&self) -> &Path {
        &self.config.csv_path
    }

    /// Idle → Running; spawns the sampling loop.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        let next = self.next_state(Command::Start)?;
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        self.set_state(next);
        self.sampler = Some(sampler::spawn(
            SamplerDeps {
                speed: self.speed.clone(),
                host: self.host.clone(),
                sample_tx,
                state_rx: self.state_tx.subscribe(),
            },
            SamplerConfig {
                interval_secs: self.config.interval_secs,
            },
        ));
        self.sample_rx = Some(sample_rx);
        info!(
            interval_secs = self.config.interval_secs,
            path = %self.config.csv_path.display(),
            "monitor started"
        );
        Ok(())
    }

    /// Running ↔ Paused. Returns the new state.
    pub fn toggle_pause(&mut self) -> Result<MonitorState, MonitorError> {
        let next = self.next_state(Command::TogglePause)?;
        self.set_state(next);
        info!(state = %next, "monitor pause toggled");
        Ok(next)
    }

    /// Running|Paused → Stopped: cancels any cycle in flight, delivers samples already
    /// produced, notifies the sink, then writes the series. Returns the written path,
    /// or `None` if already stopped.
    pub async fn stop(&mut self) -> Result<Option<PathBuf>, MonitorError> {
        if self.state() == MonitorState::Stopped {
            debug!("stop ignored; monitor already stopped");
            return Ok(None);
        }
        let next = self.next_state(Command::Stop)?;
        self.state_tx.send_replace(next);
        self.drain_sampler().await;
        self.sink.state_changed(next);
        self.persist().map(Some)
    }

    /// Window-close semantics: stop when active, persist the empty series when never started.
    pub async fn close(&mut self) -> Result<Option<PathBuf>, MonitorError> {
        match self.state() {
            MonitorState::Running | MonitorState::Paused => self.stop().await,
            MonitorState::Idle => {
                self.set_state(MonitorState::Stopped);
                self.persist().map(Some)
            }
            MonitorState::Stopped => Ok(None),
        }
    }

    /// Waits for the next sample, records it and hands it to the sink. Returns its index,
    /// or `None` when no loop is running. Cancel-safe.
    pub async fn next_sample(&mut self) -> Option<usize> {
        let sample = self.sample_rx.as_mut()?.recv().await?;
        Some(self.record(sample))
    }

    /// Records a sample only if one is already waiting.
    pub fn try_next_sample(&mut self) -> Option<usize> {
        let sample = self.sample_rx.as_mut()?.try_recv().ok()?;
        Some(self.record(sample))
    }

    fn next_state(&self, command: Command) -> Result<MonitorState, MonitorError> {
        let state = self.state();
        state
            .transition(command)
            .ok_or(MonitorError::InvalidTransition { command, state })
    }

    fn set_state(&mut self, state: MonitorState) {
        self.state_tx.send_replace(state);
        self.sink.state_changed(state);
    }

    fn record(&mut self, sample: Sample) -> usize {
        let index = self.series.push(sample);
        let is_drop = self.series.is_drop(index);
        let sample = &self.series.as_slice()[index];
        if is_drop {
            warn!(
                index,
                download = sample.download,
                trailing_mean = self.series.trailing_mean(index),
                "download drop"
            );
        }
        self.sink.deliver(&Delivery {
            index,
            sample,
            is_drop,
            series: &self.series,
        });
        index
    }

    /// Joins the sampling loop, recording whatever it produced before observing Stopped.
    async fn drain_sampler(&mut self) {
        let Some(mut sample_rx) = self.sample_rx.take() else {
            return;
        };
        if let Some(mut handle) = self.sampler.take() {
            loop {
                tokio::select! {
                    joined = &mut handle => {
                        if let Err(e) = joined {
                            warn!(error = %e, "sampling loop ended abnormally");
                        }
                        break;
                    }
                    Some(sample) = sample_rx.recv() => {
                        self.record(sample);
                    }
                }
            }
        }
        while let Ok(sample) = sample_rx.try_recv() {
            self.record(sample);
        }
    }

    fn persist(&mut self) -> Result<PathBuf, MonitorError> {
        let path = self.config.csv_path.clone();
        match export::write_csv(&self.series, &path) {
            Ok(rows) => {
                info!(rows, path = %path.display(), "series saved");
                Ok(path)
            }
            Err(e) => {
                tracing::error!(error = %e, operation = "save_series", "could not save series");
                Err(MonitorError::Persistence(e))
            }
        }
    }
}

/// Persistence outcome of a stop/close, for display.
pub fn describe_persistence(result: &Result<Option<PathBuf>, MonitorError>) -> Option<String> {
    match result {
        Ok(Some(path)) => Some(format!("Log saved to {}", path.display())),
        Ok(None) => None,
        Err(e) => Some(format!("Could not save log: {}", e)),
    }
}
