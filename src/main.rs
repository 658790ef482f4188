//! Switcher Link - command line client for Switcher smart devices.

use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use serde::Serialize;
use switcher_link as app;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::protocol::{AckResponse, DeviceState, SwitcherBridge, SwitcherClient, Weekday};

/// Control Switcher devices over the local network.
#[derive(Parser)]
#[command(name = "switcher-link")]
struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Device IP address, overrides config
    #[arg(long)]
    ip: Option<String>,

    /// Device id, overrides config
    #[arg(long)]
    device_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the device state
    State,
    /// Turn the device on
    On {
        /// Turn off again after this many minutes
        #[arg(long)]
        timer: Option<u32>,
    },
    /// Turn the device off
    Off,
    /// Set the auto shutdown duration (HOURS:MINUTES)
    AutoShutdown { duration: String },
    /// Rename the device
    Name { name: String },
    /// List stored schedules
    Schedules,
    /// Create a schedule from START to END (HH:MM, local time)
    CreateSchedule {
        start: String,
        end: String,
        /// Comma separated days, omit for a one-shot schedule
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
    },
    /// Delete a schedule
    DeleteSchedule { id: String },
    /// Enable a schedule
    EnableSchedule { id: String },
    /// Disable a schedule
    DisableSchedule { id: String },
    /// Print device broadcasts until interrupted
    Listen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let (mut config, load_note) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, "Config loaded successfully".to_string()),
        ConfigLoadResult::Missing => (AppConfig::default(), "Config missing, using defaults".to_string()),
        ConfigLoadResult::Invalid(e) => bail!("Config invalid ({}): {e}", config_path.display()),
    };

    let _guard = init_logging(&config.logging)?;
    tracing::info!("Switcher Link starting...");
    tracing::info!("Config path: {:?}", config_path);
    tracing::info!("{load_note}");

    if let Some(ip) = cli.ip {
        config.device.ip_address = ip;
    }
    if let Some(device_id) = cli.device_id {
        config.device.device_id = device_id;
    }
    config.validate()?;

    match cli.command {
        Commands::Listen => listen(&config, cli.json).await,
        command => run_device_command(&config, command, cli.json).await,
    }
}

/// Initialize logging to stderr, or to daily rolling files when configured.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match &logging.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
            let appender = tracing_appender::rolling::daily(directory, "switcher-link.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn print_output<T: Serialize + std::fmt::Debug>(value: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value:#?}");
    }
    Ok(())
}

fn print_ack(ack: &AckResponse, json: bool) -> anyhow::Result<()> {
    if json {
        return print_output(ack, json);
    }
    if ack.successful {
        println!("{:?}: ok", ack.kind);
    } else {
        println!("{:?}: no response from device", ack.kind);
    }
    Ok(())
}

/// Parse `H:MM` into a duration.
fn parse_hours_minutes(value: &str) -> anyhow::Result<TimeDelta> {
    let (hours, minutes) = value
        .split_once(':')
        .with_context(|| format!("Expected HOURS:MINUTES, got {value:?}"))?;
    let hours: i64 = hours.trim().parse().context("Invalid hours")?;
    let minutes: i64 = minutes.trim().parse().context("Invalid minutes")?;
    if minutes >= 60 {
        bail!("Minutes must be below 60");
    }
    Ok(TimeDelta::hours(hours) + TimeDelta::minutes(minutes))
}

async fn run_device_command(config: &AppConfig, command: Commands, json: bool) -> anyhow::Result<()> {
    let device = &config.device;
    if device.ip_address.is_empty() || device.device_id.is_empty() {
        bail!("Device ip address and device id are required (config or --ip/--device-id)");
    }

    let mut client =
        SwitcherClient::connect(&device.ip_address, device.tcp_port, device.tcp_timeout_secs, device.target()).await?;

    let result = execute(&mut client, command, json).await;
    client.disconnect().await?;
    result
}

async fn execute(client: &mut SwitcherClient, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::State => print_output(&client.get_state().await?, json),
        Commands::On { timer } => print_ack(&client.control(DeviceState::On, timer).await?, json),
        Commands::Off => print_ack(&client.control(DeviceState::Off, None).await?, json),
        Commands::AutoShutdown { duration } => {
            let duration = parse_hours_minutes(&duration)?;
            print_ack(&client.set_auto_shutdown(duration).await?, json)
        }
        Commands::Name { name } => print_ack(&client.set_name(&name).await?, json),
        Commands::Schedules => print_output(&client.get_schedules().await?.slots, json),
        Commands::CreateSchedule { start, end, days } => {
            print_ack(&client.create_schedule(&days, &start, &end).await?, json)
        }
        Commands::DeleteSchedule { id } => print_ack(&client.delete_schedule(&id).await?, json),
        Commands::EnableSchedule { id } => toggle_schedule(client, &id, true, json).await,
        Commands::DisableSchedule { id } => toggle_schedule(client, &id, false, json).await,
        Commands::Listen => bail!("listen does not take a device connection"),
    }
}

async fn toggle_schedule(client: &mut SwitcherClient, id: &str, enabled: bool, json: bool) -> anyhow::Result<()> {
    let schedules = client.get_schedules().await?;
    let Some(slot) = schedules.slots.iter().find(|slot| slot.schedule_id == id) else {
        bail!("Schedule {id} not found");
    };
    print_ack(&client.enable_disable_schedule(slot, enabled).await?, json)
}

async fn listen(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(config.bridge.channel_capacity);
    let bridge = SwitcherBridge::new(config.bridge.udp_ports.clone(), config.device.protocol);
    let handle = bridge.start(tx).await?;

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => print_output(&message, json)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    handle.stop();
    Ok(())
}
