// Terminal display sinks: live labels with a scrolling sparkline, or one JSON object per sample

use serde::Serialize;
use std::io::Write;

use crate::models::{MonitorState, Sample};
use crate::monitor::{Delivery, SampleSink};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MISSING_POINT: char = '·';

/// Label texts for one sample, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub download: String,
    pub upload: String,
    pub ping: String,
    pub cpu: String,
    pub memory: String,
    pub temperature: String,
}

impl Labels {
    pub fn for_sample(sample: &Sample) -> Self {
        let (Some(download), Some(upload), Some(ping)) = (sample.download, sample.upload, sample.ping)
        else {
            return Self {
                download: "Download: error".into(),
                upload: "Upload: error".into(),
                ping: "Ping: error".into(),
                cpu: "CPU: error".into(),
                memory: "Memory: error".into(),
                temperature: "CPU Temp: error".into(),
            };
        };
        Self {
            download: format!("Download: {:.2} Mbps", download),
            upload: format!("Upload: {:.2} Mbps", upload),
            ping: format!("Ping: {:.2} ms", ping),
            cpu: format!("CPU: {:.1} %", sample.cpu_percent.unwrap_or(0.0)),
            memory: format!(
                "Memory: {:.1} % ({:.2}/{:.2} GB)",
                sample.mem_percent.unwrap_or(0.0),
                sample.mem_used.unwrap_or(0.0),
                sample.mem_total.unwrap_or(0.0)
            ),
            temperature: match sample.cpu_temp {
                Some(t) => format!("CPU Temp: {:.1} °C", t),
                None => "CPU Temp: N/A".into(),
            },
        }
    }

    pub fn line(&self) -> String {
        [
            self.download.as_str(),
            self.upload.as_str(),
            self.ping.as_str(),
            self.cpu.as_str(),
            self.memory.as_str(),
            self.temperature.as_str(),
        ]
        .join("  |  ")
    }
}

/// One bar per value scaled to the window maximum; `None` renders as a dot.
pub fn sparkline(values: &[Option<f64>]) -> String {
    let max = values
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);
    values
        .iter()
        .map(|v| match v {
            None => MISSING_POINT,
            Some(_) if max <= 0.0 => BARS[0],
            Some(v) => {
                let level = ((v.max(0.0) / max) * (BARS.len() - 1) as f64).round() as usize;
                BARS[level.min(BARS.len() - 1)]
            }
        })
        .collect()
}

/// Labels, status and a download chart over the last `max_points` samples.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    max_points: usize,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, max_points: usize) -> Self {
        Self { out, max_points }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, delivery: &Delivery<'_>) -> std::io::Result<()> {
        let sample = delivery.sample;
        let labels = Labels::for_sample(sample);
        writeln!(
            self.out,
            "#{} {}  {}",
            delivery.index + 1,
            sample.timestamp.format("%H:%M:%S"),
            labels.line()
        )?;

        let (start, window) = delivery.series.window(self.max_points);
        let downloads: Vec<Option<f64>> = window.iter().map(|s| s.download).collect();
        let peak = downloads.iter().flatten().copied().fold(0.0_f64, f64::max);
        writeln!(
            self.out,
            "   download {}  (#{}-#{}, peak {:.2} Mbps)",
            sparkline(&downloads),
            start + 1,
            start + window.len(),
            peak
        )?;

        let markers: String = (start..start + window.len())
            .map(|i| if delivery.series.is_drop(i) { '!' } else { ' ' })
            .collect();
        if markers.contains('!') {
            writeln!(self.out, "   drops    {}", markers)?;
        }

        match &sample.error {
            Some(error) => writeln!(self.out, "   Error: Test failed ({})", error)?,
            None if delivery.is_drop => {
                writeln!(self.out, "   Critical drop: download below 30% of recent mean")?
            }
            None => {}
        }
        self.out.flush()
    }
}

impl<W: Write + Send> SampleSink for TerminalSink<W> {
    fn deliver(&mut self, delivery: &Delivery<'_>) {
        if let Err(e) = self.render(delivery) {
            tracing::debug!(error = %e, "display write failed");
        }
    }

    fn state_changed(&mut self, state: MonitorState) {
        let status = match state {
            MonitorState::Idle => return,
            MonitorState::Running => "Testing... Please wait",
            MonitorState::Paused => "Paused (p to resume)",
            MonitorState::Stopped => "Stopped",
        };
        if let Err(e) = writeln!(self.out, "{}", status).and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "display write failed");
        }
    }
}

#[derive(Serialize)]
struct JsonDelivery<'a> {
    index: usize,
    is_drop: bool,
    #[serde(flatten)]
    sample: &'a Sample,
}

/// One JSON object per sample, for piping into other tools.
pub struct JsonLinesSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> SampleSink for JsonLinesSink<W> {
    fn deliver(&mut self, delivery: &Delivery<'_>) {
        let line = JsonDelivery {
            index: delivery.index,
            is_drop: delivery.is_drop,
            sample: delivery.sample,
        };
        let result = serde_json::to_writer(&mut self.out, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!(error = %e, "display write failed");
        }
    }
}
