// Network speed tests over HTTP: best-server selection, download, upload, latency

mod server;

pub use server::{SpeedServer, default_servers};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::config::SpeedtestConfig;
use crate::error::MeasurementError;
use crate::models::SpeedResult;

/// Latency probes per server; the fastest one counts.
const LATENCY_PROBES: usize = 3;

/// Source of network throughput and latency measurements.
#[async_trait]
pub trait SpeedProvider: Send + Sync {
    async fn measure(&self) -> Result<SpeedResult, MeasurementError>;
}

pub struct HttpSpeedTest {
    client: reqwest::Client,
    servers: Vec<SpeedServer>,
    upload_bytes: usize,
}

impl HttpSpeedTest {
    /// Every request made by the returned tester is bounded by `config.timeout_secs`.
    pub fn new(config: &SpeedtestConfig) -> Result<Self, MeasurementError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(crate::version::user_agent())
            .build()?;
        Ok(Self {
            client,
            servers: config.servers.clone(),
            upload_bytes: config.upload_bytes,
        })
    }

    #[instrument(skip(self, server), fields(server_name = %server.name))]
    async fn probe_latency(&self, server: &SpeedServer) -> Result<Duration, MeasurementError> {
        let mut best = Duration::MAX;
        for _ in 0..LATENCY_PROBES {
            let started = Instant::now();
            self.client
                .get(&server.latency_url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            best = best.min(started.elapsed());
        }
        Ok(best)
    }

    async fn best_server(&self) -> Result<(&SpeedServer, Duration), MeasurementError> {
        let mut probes = Vec::with_capacity(self.servers.len());
        let mut last_error = None;
        for (i, server) in self.servers.iter().enumerate() {
            match self.probe_latency(server).await {
                Ok(rtt) => probes.push((i, rtt)),
                Err(e) => {
                    debug!(server = %server.name, error = %e, "latency probe failed");
                    last_error = Some(e);
                }
            }
        }
        match server::fastest(&probes) {
            Some((i, rtt)) => Ok((&self.servers[i], rtt)),
            None => Err(last_error.unwrap_or(MeasurementError::NoServer)),
        }
    }

    #[instrument(skip(self, server), fields(server_name = %server.name))]
    async fn download(&self, server: &SpeedServer) -> Result<f64, MeasurementError> {
        let started = Instant::now();
        let response = self
            .client
            .get(&server.download_url)
            .send()
            .await?
            .error_for_status()?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            received += chunk?.len() as u64;
        }
        let elapsed = started.elapsed();
        debug!(bytes = received, elapsed_ms = elapsed.as_millis() as u64, "download done");
        Ok(mbps(received, elapsed))
    }

    #[instrument(skip(self, server), fields(server_name = %server.name))]
    async fn upload(&self, server: &SpeedServer) -> Result<f64, MeasurementError> {
        let payload = Bytes::from(vec![0u8; self.upload_bytes]);
        let started = Instant::now();
        self.client
            .post(&server.upload_url)
            .body(payload)
            .send()
            .await?
            .error_for_status()?;
        let elapsed = started.elapsed();
        debug!(bytes = self.upload_bytes, elapsed_ms = elapsed.as_millis() as u64, "upload done");
        Ok(mbps(self.upload_bytes as u64, elapsed))
    }
}

#[async_trait]
impl SpeedProvider for HttpSpeedTest {
    #[instrument(skip(self), fields(repo = "speedtest", operation = "measure"))]
    async fn measure(&self) -> Result<SpeedResult, MeasurementError> {
        let (server, rtt) = self.best_server().await?;
        let download_mbps = self.download(server).await?;
        let upload_mbps = self.upload(server).await?;
        Ok(SpeedResult {
            server: server.name.clone(),
            download_mbps,
            upload_mbps,
            ping_ms: rtt.as_secs_f64() * 1000.0,
        })
    }
}

/// Megabits per second for `bytes` moved in `elapsed`.
pub fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / secs / 1_000_000.0
}
