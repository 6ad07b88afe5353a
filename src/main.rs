use anyhow::Result;
use clap::Parser;
use speedmon::config::{AppConfig, DisplayFormat};
use speedmon::display::{JsonLinesSink, TerminalSink};
use speedmon::models::{Command, MonitorState};
use speedmon::monitor::{
    MonitorConfig, MonitorDeps, SampleSink, SamplingMonitor, describe_persistence,
};
use speedmon::speedtest_repo::HttpSpeedTest;
use speedmon::sysinfo_repo::SysinfoRepo;
use speedmon::version;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Periodic internet speed tests with host health metrics and a live terminal chart.
///
/// Commands on stdin: `s` start, `p` pause/resume, `q` stop and save. Ctrl-C saves and exits.
#[derive(Parser, Debug)]
#[command(name = "speedmon", version)]
struct Args {
    /// Config file (default: $CONFIG_FILE or ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between measurement cycles
    #[arg(long)]
    interval: Option<u64>,

    /// Directory for the session CSV log
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print one JSON object per sample instead of the chart
    #[arg(long)]
    json: bool,

    /// Start measuring immediately instead of waiting for `s`
    #[arg(long)]
    autostart: bool,
}

enum Event {
    Sample(Option<usize>),
    Input(Option<String>),
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut app_config = AppConfig::load(args.config.as_deref())?;
    if let Some(interval) = args.interval {
        app_config.monitor.interval_secs = interval;
    }
    if let Some(dir) = args.output_dir {
        app_config.output.directory = dir;
    }
    if args.json {
        app_config.display.format = DisplayFormat::Json;
    }
    app_config.validate()?;

    let speed = Arc::new(
        HttpSpeedTest::new(&app_config.speedtest)
            .map_err(|e| anyhow::anyhow!("speed test client: {}", e))?,
    );
    let host = Arc::new(SysinfoRepo::new());
    let sink: Box<dyn SampleSink> = match app_config.display.format {
        DisplayFormat::Text => Box::new(TerminalSink::new(
            std::io::stdout(),
            app_config.display.max_points,
        )),
        DisplayFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let mut monitor = SamplingMonitor::new(
        MonitorDeps { speed, host, sink },
        MonitorConfig::from_app_config(&app_config, chrono::Local::now()),
    );
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        log = %monitor.csv_path().display(),
        "ready; commands: s = start, p = pause/resume, q = stop & save"
    );
    if args.autostart {
        monitor.start()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = loop {
        let event = tokio::select! {
            delivered = monitor.next_sample(), if monitor.state().is_active() => Event::Sample(delivered),
            line = lines.next_line(), if stdin_open => Event::Input(line.ok().flatten()),
            _ = &mut shutdown => Event::Shutdown,
        };

        match event {
            Event::Sample(Some(_)) => {}
            Event::Sample(None) => {
                tracing::warn!("sampling loop ended unexpectedly; stopping");
                break monitor.stop().await;
            }
            Event::Input(None) => {
                tracing::debug!("stdin closed; Ctrl-C stops the monitor");
                stdin_open = false;
            }
            Event::Input(Some(line)) if line.trim().is_empty() => {}
            Event::Input(Some(line)) => match line.parse::<Command>() {
                Ok(Command::Start) => {
                    if let Err(e) = monitor.start() {
                        tracing::warn!(error = %e, "command rejected");
                    }
                }
                Ok(Command::TogglePause) => {
                    if let Err(e) = monitor.toggle_pause() {
                        tracing::warn!(error = %e, "command rejected");
                    }
                }
                Ok(Command::Stop) => {
                    if monitor.state() == MonitorState::Idle {
                        tracing::warn!("monitor not started; Ctrl-C exits");
                        continue;
                    }
                    break monitor.stop().await;
                }
                Err(e) => tracing::warn!("{}", e),
            },
            Event::Shutdown => {
                tracing::info!("Received shutdown signal");
                break monitor.close().await;
            }
        }
    };

    if let Some(message) = describe_persistence(&outcome) {
        println!("{}", message);
    }
    outcome?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
