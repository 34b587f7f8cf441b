use anyhow::Result;
use log::info;
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use fleet_monitor::{
    config::MonitorConfig,
    feed::FeedClient,
    pipeline::{JsonSurface, LogSurface, OutputSurface, Runtime},
    tracking::{CameraCommand, Direction},
};

#[derive(Parser)]
#[command(name = "fleet-monitor")]
#[command(about = "Live vehicle tracking with proximity and path-crossing alerts")]
struct Args {
    /// Feed configuration file
    #[arg(short, long, default_value = "feed.toml")]
    feed: String,

    /// Pipeline configuration file
    #[arg(short, long, default_value = "pipeline.toml")]
    pipeline: String,

    /// Override the feed WebSocket URL
    #[arg(short, long)]
    url: Option<String>,

    /// Where rendered positions and alerts go
    #[arg(short, long, value_enum, default_value_t = Output::Log)]
    output: Output,

    /// Read camera keys (w/a/s/d hold, x release, W/A/S/D single step) from stdin
    #[arg(long)]
    camera_input: bool,

    /// Enable verbose logging for detailed pipeline progress
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Output {
    /// Alerts and connectivity through the logger
    Log,
    /// One JSON event per line on stdout
    Json,
}

fn parse_camera_key(line: &str) -> Option<CameraCommand> {
    let key = line.trim().chars().next()?;
    if key == 'x' || key == 'X' {
        return Some(CameraCommand::Release);
    }
    let direction = Direction::from_key(key)?;
    if key.is_ascii_uppercase() {
        Some(CameraCommand::Nudge(direction))
    } else {
        Some(CameraCommand::Hold(direction))
    }
}

fn spawn_camera_input(tx: mpsc::Sender<CameraCommand>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_camera_key(&line) {
                    Some(command) => {
                        if tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    None => log::debug!("Ignoring camera input '{}'", line.trim()),
                },
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Camera input failed: {}", e);
                    break;
                }
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting Fleet Monitor");

    let mut config = MonitorConfig::load_from_files(&args.feed, &args.pipeline)?;
    if let Some(url) = args.url {
        config.feed.feed.url = url;
    }

    info!("=== Monitor Configuration ===");
    info!("Feed: {} ({})", config.feed.feed.name, config.feed.feed.url);
    info!("Vehicle animation: {}ms, proximity threshold: {:.1}m",
          config.pipeline.animation.vehicle_duration_ms,
          config.pipeline.detection.proximity_threshold_m);
    info!("Alert TTL: {}ms, swept every {}ms",
          config.pipeline.alerts.ttl_ms,
          config.pipeline.alerts.sweep_interval_ms);
    if args.verbose {
        info!("Tick interval: {}ms, intersections: {}",
              config.pipeline.scheduler.tick_interval_ms,
              if config.pipeline.detection.intersections { "on" } else { "off" });
        match config.pipeline.scheduler.stale_after_ms {
            Some(ms) => info!("Stale vehicles evicted after {}ms", ms),
            None => info!("Stale vehicle eviction disabled"),
        }
    }

    let surface = match args.output {
        Output::Log => OutputSurface::Log(LogSurface),
        Output::Json => OutputSurface::Json(JsonSurface::stdout()),
    };

    let (feed_tx, feed_rx) = mpsc::channel(256);
    let feed_task = FeedClient::new(config.feed.feed.clone()).spawn(feed_tx);

    let (camera_rx, camera_task) = if args.camera_input {
        let (tx, rx) = mpsc::channel(32);
        (Some(rx), Some(spawn_camera_input(tx)))
    } else {
        (None, None)
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let runtime = Runtime::new(config.pipeline.clone(), surface);
    let pipeline = runtime.run(feed_rx, camera_rx, shutdown).await;

    // Tear down collaborators so nothing keeps running after the loop
    feed_task.abort();
    if let Some(task) = camera_task {
        task.abort();
    }

    let counters = pipeline.performance().counters;
    info!("Monitor stopped");
    info!("Ticks: {}, messages: {} accepted / {} dropped",
          counters.ticks, counters.messages_accepted, counters.messages_dropped);
    info!("Alerts: {} raised, {} retracted, {} still active",
          counters.alerts_raised, counters.alerts_retracted, pipeline.alerts().len());

    Ok(())
}
