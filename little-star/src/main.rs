use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};
use serde_json::{json, Value};

use little_star_lib::control_interface::{ControlInterface, DeviceMode};
use little_star_lib::led::led_color::TwinklyColor;
use little_star_lib::util::config::{ApiVersion, DeviceConfig, DEFAULT_HTTP_PORT};
use little_star_lib::util::movie::Movie;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    handle_cli(cli).await
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "little-star",
    about = "Controls Twinkly LED devices",
    version
)]
pub struct Cli {
    /// Hostname or IP address of the device
    #[clap(long)]
    pub host: String,

    /// HTTP port of the device
    #[clap(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Request timeout in milliseconds
    #[clap(long, value_parser = parse_duration, default_value = "3000")]
    pub timeout: Duration,

    /// API version, detected when omitted
    #[clap(long, value_enum)]
    pub api_version: Option<ApiVersion>,

    /// Log debug output
    #[clap(long)]
    pub debug: bool,

    /// Print compact JSON
    #[clap(long)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let millis = s
        .parse::<u64>()
        .map_err(|_| "could not parse duration in milliseconds")?;
    Ok(Duration::from_millis(millis))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Gets or sets the device name.
    Name {
        #[clap(long)]
        name: Option<String>,
    },
    /// Gets the network status.
    Network,
    /// Gets the firmware version.
    Firmware,
    /// Gets the device details.
    Details,
    /// Gets or sets the power state.
    Power {
        #[clap(long, value_enum)]
        state: Option<PowerState>,
    },
    /// Gets or sets the brightness in percent.
    Brightness {
        #[clap(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        value: Option<u8>,
    },
    /// Gets or sets the device mode.
    Mode {
        #[clap(long, value_enum)]
        mode: Option<DeviceMode>,
    },
    /// Gets or sets the MQTT configuration.
    Mqtt {
        /// New configuration as a JSON object
        #[clap(long = "json")]
        config: Option<String>,
    },
    /// Uploads and plays a movie, or shows the movie configuration.
    Movie {
        /// Raw movie file, frames of LEDs in device channel order
        #[clap(long)]
        file: Option<PathBuf>,

        /// Milliseconds between frames
        #[clap(long, default_value_t = 100)]
        delay: u32,
    },
    /// Shows one color on all LEDs.
    #[clap(name = "static")]
    Static {
        /// `r,g,b`, `r,g,b,w`, `r,g,b,w,cw` or a color name
        #[clap(long, alias = "colour")]
        color: TwinklyColor,
    },
    /// Gets the device summary.
    Summary,
    /// Controls the sound reactive drivers.
    Music {
        #[clap(subcommand)]
        action: MusicAction,
    },
}

/// Actions available under the `music` subcommand
#[derive(Subcommand)]
pub enum MusicAction {
    On,
    Off,
    Next,
    Prev,
    /// Shows the current driver.
    Current,
    /// Selects a driver by name.
    Set {
        #[clap(long)]
        driver: String,
    },
    /// Lists the known drivers.
    List,
}

fn print_value(value: &Value, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", output);
    Ok(())
}

fn device_config(cli: &Cli) -> DeviceConfig {
    let config = DeviceConfig::new(cli.host.clone())
        .with_http_port(cli.port)
        .with_timeout(cli.timeout);
    match cli.api_version {
        Some(version) => config.with_api_version(version),
        None => config,
    }
}

async fn handle_cli(cli: Cli) -> Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let device = ControlInterface::connect(device_config(&cli)).await?;
    debug!("Connected to {} using API {}", device.host(), device.api_version());

    let output = match command {
        Commands::Name { name: Some(name) } => device.set_name(name).await?,
        Commands::Name { name: None } => device.get_name().await?,
        Commands::Network => device.get_network_status().await?,
        Commands::Firmware => device.get_firmware_version().await?,
        Commands::Details => device.get_details().await?,
        Commands::Power { state: Some(PowerState::On) } => device.turn_on().await?,
        Commands::Power { state: Some(PowerState::Off) } => device.turn_off().await?,
        Commands::Power { state: None } => json!({ "on": device.is_on().await? }),
        Commands::Brightness { value: Some(value) } => device.set_brightness(*value).await?,
        Commands::Brightness { value: None } => device.get_brightness().await?,
        Commands::Mode { mode: Some(mode) } => device.set_mode(*mode).await?,
        Commands::Mode { mode: None } => device.get_mode().await?,
        Commands::Mqtt { config: Some(config) } => {
            let config: Value = serde_json::from_str(config)
                .map_err(|e| anyhow!("MQTT configuration is not valid JSON: {}", e))?;
            device.set_mqtt(config).await?
        }
        Commands::Mqtt { config: None } => device.get_mqtt().await?,
        Commands::Movie {
            file: Some(file),
            delay,
        } => {
            let details = device.details().await?;
            let movie = Movie::load(file, details.number_of_led, details.led_profile).await?;
            debug!(
                "Playing {} frames of {} LEDs from {}",
                movie.frames_number,
                movie.leds_number,
                file.display()
            );
            device.play_movie(&movie, *delay).await?
        }
        Commands::Movie { file: None, .. } => device.get_movie_config().await?,
        Commands::Static { color } => device.set_static_color(*color).await?,
        Commands::Summary => device.summary().await?,
        Commands::Music { action } => match action {
            MusicAction::On => device.music_on().await?,
            MusicAction::Off => device.music_off().await?,
            MusicAction::Next => device.next_music_driver().await?,
            MusicAction::Prev => device.previous_music_driver().await?,
            MusicAction::Current => device.get_current_music_driver().await?,
            MusicAction::Set { driver } => device.set_current_music_driver(driver).await?,
            MusicAction::List => device
                .music_drivers()
                .iter()
                .map(|driver| {
                    json!({
                        "name": driver.name,
                        "unique_id": driver.id_string(),
                        "official": driver.official,
                    })
                })
                .collect(),
        },
    };

    print_value(&output, cli.json)
}
