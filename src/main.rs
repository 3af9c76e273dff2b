//! USB Camera Client CLI
//!
//! Command-line interface for driving a photobooth camera service:
//! discovery, one-shot captures, settings and a live notification feed.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use usb_camera::{
    CameraApi, CameraSessionManager, CameraSetting, FileConfig, HttpCameraApi, MockCameraApi,
};

#[derive(Debug, Parser)]
#[command(name = "usb-camera", version, about = "Photobooth USB camera client")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Camera service base URL, overriding the configuration file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Use an in-memory service with two demo cameras.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the cameras the service can see.
    Detect,
    /// Connect a camera, take one photo and disconnect.
    Capture {
        /// Camera id as reported by `detect`.
        camera: String,
        /// Photobooth event the photo belongs to.
        #[arg(long)]
        event: Option<String>,
    },
    /// Read one camera setting.
    GetSetting {
        /// Camera id as reported by `detect`.
        camera: String,
        /// Setting name, e.g. `iso` or `battery_level`.
        name: CameraSetting,
    },
    /// Write one camera setting.
    SetSetting {
        /// Camera id as reported by `detect`.
        camera: String,
        /// Setting name, e.g. `iso` or `white_balance`.
        name: CameraSetting,
        /// JSON value; bare words are sent as strings.
        value: String,
    },
    /// Show the sessions the service has open.
    Status,
    /// Poll for cameras and print notifications until Ctrl-C.
    Watch {
        /// Milliseconds between discovery requests.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("USB Camera Client v{}", usb_camera::VERSION);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> CliResult {
    let config = load_config(&cli)?;

    let api: Arc<dyn CameraApi> = if cli.mock {
        info!("Using in-memory camera service");
        Arc::new(MockCameraApi::demo())
    } else {
        info!(base_url = %config.service.base_url, "Using camera service");
        Arc::new(HttpCameraApi::from_config(&config.service)?)
    };
    let manager =
        Arc::new(CameraSessionManager::new(api).with_event_capacity(config.events.capacity));

    match cli.command {
        Command::Detect => detect(&manager).await,
        Command::Capture { camera, event } => capture(&manager, &camera, event.as_deref()).await,
        Command::GetSetting { camera, name } => {
            manager.connect(&camera, None).await?;
            let result = manager.get_setting(name, None).await;
            manager.teardown().await;
            println!("{} = {}", name, result?);
            Ok(())
        }
        Command::SetSetting {
            camera,
            name,
            value,
        } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            manager.connect(&camera, None).await?;
            let result = manager.set_setting(name, value, None).await;
            manager.teardown().await;
            result?;
            println!("{} updated", name);
            Ok(())
        }
        Command::Status => {
            let sessions = manager.status().await?;
            if sessions.is_empty() {
                println!("No active sessions");
            }
            for session in sessions {
                println!(
                    "{}  {} {}  connected {:.0}s",
                    session.session_id,
                    session.vendor_name,
                    session.camera_model,
                    session.connection_duration
                );
            }
            Ok(())
        }
        Command::Watch { interval_ms } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.polling.interval());
            watch(&manager, &config, interval).await
        }
    }
}

async fn detect(manager: &CameraSessionManager) -> CliResult {
    let cameras = manager.try_detect().await?;
    if cameras.is_empty() {
        println!("No cameras detected");
    }
    for camera in cameras {
        println!("{}  {}  {}", camera.id, camera.vendor_name, camera.display_label());
    }
    Ok(())
}

async fn capture(manager: &CameraSessionManager, camera: &str, event: Option<&str>) -> CliResult {
    // Populates the descriptor attached to the session.
    manager.detect().await;
    manager.connect(camera, event).await?;

    let result = manager.capture(None).await;
    manager.teardown().await;

    let reply = result?;
    println!("{}", serde_json::to_string_pretty(&reply.payload)?);
    Ok(())
}

async fn watch(
    manager: &Arc<CameraSessionManager>,
    config: &FileConfig,
    interval: Duration,
) -> CliResult {
    #[cfg(feature = "metrics")]
    if config.metrics.port != 0 {
        use usb_camera::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

        let server = MetricsServer::new(
            MetricsServerConfig::with_port(config.metrics.port),
            MetricsRegistry::new()?,
            Arc::clone(manager),
        );
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                warn!("Metrics server stopped: {}", e);
            }
        });
    }

    let mut events = manager.subscribe();
    if config.polling.enabled {
        manager.init(interval).await;
    } else {
        manager.detect().await;
        info!("Polling disabled; showing the initial discovery only");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped notifications"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    manager.teardown().await;
    Ok(())
}
