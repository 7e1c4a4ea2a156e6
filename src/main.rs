use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use light_reminder::config::{self, Config, SensorSource};
use light_reminder::console;
use light_reminder::coordinator::{Coordinator, UiEvent};
use light_reminder::error::{AppError, Result};
use light_reminder::reminder::{self, AlarmStore, DesktopNotifier, Notifier, Reminders};
use light_reminder::report::HttpReporter;
use light_reminder::sensors::{self, NORMAL_SAMPLING_PERIOD, SensorHub};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "light-reminder")]
#[command(about = "Forward bright light readings and remind every two hours")]
struct Cli {
    /// Endpoint receiving `{"lightLevel": ...}` posts
    #[arg(long, env = "LIGHT_ENDPOINT_URL")]
    endpoint: Option<String>,

    /// Sensor source: auto, simulated, none, or an IIO device directory
    #[arg(long, env = "LIGHT_SENSOR")]
    sensor: Option<String>,

    /// Directory holding the alarm registration
    #[arg(long, env = "LIGHT_REMINDER_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator, background reminders and alarm (default)
    Run,
    /// Deliver one alarm firing, for cron or systemd timers
    FireAlarm,
    /// Print the next firing of the registered alarm
    NextAlarm,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(endpoint) = &self.endpoint {
            config.report.endpoint_url = endpoint.clone();
        }
        if let Some(sensor) = &self.sensor {
            config.sensor.source = SensorSource::parse(sensor);
        }
        if let Some(dir) = &self.state_dir {
            config.reminder.state_dir = Some(dir.clone());
        }
        config
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // `.env` mutates the environment, so it is applied before the runtime
    // starts worker threads. That rules out `#[tokio::main]`.
    config::load_dotenv();
    init_logger();

    if let Err(e) = run(Cli::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config();
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async {
        match cli.command.unwrap_or(Commands::Run) {
            Commands::Run => run_daemon(config).await,
            Commands::FireAlarm => fire_alarm(config).await,
            Commands::NextAlarm => next_alarm(config),
        }
    });

    // stdin reads may still be parked on a blocking thread
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

fn alarm_store(config: &Config) -> Result<AlarmStore> {
    let dir = config.reminder.state_dir.as_ref().ok_or(AppError::NoStateDir)?;
    Ok(AlarmStore::in_dir(dir))
}

async fn run_daemon(config: Config) -> Result<()> {
    info!("Starting light reminder");
    info!("  Endpoint: {}", config.report.endpoint_url);
    info!("  Sensor: {:?}", config.sensor.source);

    let reporter = Arc::new(HttpReporter::new(&config.report.endpoint_url)?);
    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(&config.reminder.app_name));
    let reminders = Reminders::new(notifier, alarm_store(&config)?);

    let (sample_tx, sample_rx) = mpsc::channel(64);
    let sensor = sensors::open_sensor(&config.sensor.source)?;
    let hub = SensorHub::new(sensor, sample_tx, NORMAL_SAMPLING_PERIOD);

    let coordinator = Coordinator::launch(hub, reporter, reminders)?;

    let (ui_tx, ui_rx) = mpsc::channel(16);
    let console = console::spawn(ui_tx.clone(), coordinator.label_updates());

    let quit_tx = ui_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = quit_tx.send(UiEvent::Quit).await;
    });

    // The surface starts out visible
    let _ = ui_tx.send(UiEvent::Shown).await;
    drop(ui_tx);

    coordinator.run(ui_rx, sample_rx).await;
    console.abort();

    info!("Light reminder stopped");
    Ok(())
}

async fn fire_alarm(config: Config) -> Result<()> {
    let store = alarm_store(&config)?;
    let notifier = DesktopNotifier::new(&config.reminder.app_name);

    match reminder::alarm::fire_if_due(&store, &notifier, Utc::now()).await? {
        Some(outcome) => info!("[Alarm] {:?}", outcome),
        None => info!("[Alarm] No slot due since the last firing"),
    }
    Ok(())
}

fn next_alarm(config: Config) -> Result<()> {
    let registration = alarm_store(&config)?.require()?;
    let next = registration.next_fire_after(Utc::now())?;
    println!("{}", next.with_timezone(&Local).to_rfc3339());
    Ok(())
}
