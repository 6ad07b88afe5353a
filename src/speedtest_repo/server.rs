// Speed test server definitions and best-server selection

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeedServer {
    pub name: String,
    /// Small request used for round-trip latency probes.
    pub latency_url: String,
    pub download_url: String,
    /// Accepts a POST body of arbitrary size.
    pub upload_url: String,
}

pub fn default_servers() -> Vec<SpeedServer> {
    vec![SpeedServer {
        name: "cloudflare".into(),
        latency_url: "https://speed.cloudflare.com/__down?bytes=0".into(),
        download_url: "https://speed.cloudflare.com/__down?bytes=25000000".into(),
        upload_url: "https://speed.cloudflare.com/__up".into(),
    }]
}

/// Lowest round-trip time among `(server index, rtt)` probes; first wins on ties.
pub(super) fn fastest(probes: &[(usize, Duration)]) -> Option<(usize, Duration)> {
    probes.iter().copied().min_by_key(|&(_, rtt)| rtt)
}
