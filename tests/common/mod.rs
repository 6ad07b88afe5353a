// Shared test helpers: scripted providers and a recording sink

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use speedmon::error::MeasurementError;
use speedmon::models::{HostMetrics, MonitorState, Sample, SpeedResult};
use speedmon::monitor::{Delivery, MonitorConfig, MonitorDeps, SampleSink, SamplingMonitor};
use speedmon::speedtest_repo::SpeedProvider;
use speedmon::sysinfo_repo::HostMetricsProvider;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn at(hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 19, hour, min, sec).unwrap()
}

pub fn speed(download_mbps: f64) -> SpeedResult {
    SpeedResult {
        server: "test".into(),
        download_mbps,
        upload_mbps: download_mbps / 4.0,
        ping_ms: 12.34,
    }
}

pub fn host() -> HostMetrics {
    HostMetrics {
        cpu_percent: 17.26,
        mem_percent: 48.04,
        mem_used_gb: 7.6849,
        mem_total_gb: 15.999,
        cpu_temp: Some(51.26),
    }
}

pub fn ok_sample(download: f64) -> Sample {
    Sample::measured(at(12, 0, 0), &speed(download), &host())
}

/// Series-shaped sample with only a download value (or a failure when `None`).
pub fn download_sample(download: Option<f64>) -> Sample {
    match download {
        Some(d) => ok_sample(d),
        None => Sample::failed(at(12, 0, 0), "timeout"),
    }
}

/// Plays back a script of results; `None` entries fail. Reports 100 Mbps once exhausted.
pub struct ScriptedSpeed {
    script: Mutex<VecDeque<Option<f64>>>,
    calls: AtomicUsize,
    call_times: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedSpeed {
    pub fn new(script: impl IntoIterator<Item = Option<f64>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeedProvider for ScriptedSpeed {
    async fn measure(&self) -> Result<SpeedResult, MeasurementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Some(100.0));
        match next {
            Some(download) => Ok(speed(download)),
            None => Err(MeasurementError::NoServer),
        }
    }
}

/// Each measurement takes `delay` of (virtual) time before reporting 100 Mbps.
pub struct SlowSpeed {
    delay: std::time::Duration,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowSpeed {
    pub fn new(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeedProvider for SlowSpeed {
    async fn measure(&self) -> Result<SpeedResult, MeasurementError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(speed(100.0))
    }
}

pub struct StaticHost {
    pub fail: bool,
}

#[async_trait]
impl HostMetricsProvider for StaticHost {
    async fn collect(&self) -> Result<HostMetrics, MeasurementError> {
        if self.fail {
            return Err(MeasurementError::HostMetrics("sensors offline".into()));
        }
        Ok(host())
    }
}

#[derive(Debug, Clone)]
pub struct Delivered {
    pub index: usize,
    pub sample: Sample,
    pub is_drop: bool,
    pub series_len: usize,
}

/// Sink callbacks in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Sample(usize),
    State(MonitorState),
}

#[derive(Default, Clone)]
pub struct Recorded {
    pub deliveries: Arc<Mutex<Vec<Delivered>>>,
    pub states: Arc<Mutex<Vec<MonitorState>>>,
    pub events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl Recorded {
    pub fn deliveries(&self) -> Vec<Delivered> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<MonitorState> {
        self.states.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

pub struct RecordingSink(pub Recorded);

impl SampleSink for RecordingSink {
    fn deliver(&mut self, delivery: &Delivery<'_>) {
        self.0.deliveries.lock().unwrap().push(Delivered {
            index: delivery.index,
            sample: delivery.sample.clone(),
            is_drop: delivery.is_drop,
            series_len: delivery.series.len(),
        });
        self.0
            .events
            .lock()
            .unwrap()
            .push(SinkEvent::Sample(delivery.index));
    }

    fn state_changed(&mut self, state: MonitorState) {
        self.0.states.lock().unwrap().push(state);
        self.0.events.lock().unwrap().push(SinkEvent::State(state));
    }
}

/// Monitor over scripted providers writing to `dir/session.csv`.
pub fn monitor(
    speed: Arc<dyn SpeedProvider>,
    host_fails: bool,
    interval_secs: u64,
    dir: &Path,
) -> (SamplingMonitor, Recorded) {
    let recorded = Recorded::default();
    let monitor = SamplingMonitor::new(
        MonitorDeps {
            speed,
            host: Arc::new(StaticHost { fail: host_fails }),
            sink: Box::new(RecordingSink(recorded.clone())),
        },
        MonitorConfig {
            interval_secs,
            csv_path: dir.join("session.csv"),
        },
    );
    (monitor, recorded)
}
