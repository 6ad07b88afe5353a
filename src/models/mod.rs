// Domain models: samples, provider results, monitor state

mod sample;
mod state;

pub use sample::{HostMetrics, Sample, SpeedResult};
pub use state::{Command, MonitorState};
