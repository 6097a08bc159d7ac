use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use clap::ValueEnum;
use derivative::Derivative;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::led::led_color::TwinklyColor;
use crate::util::config::{ApiVersion, DeviceConfig};
use crate::util::error::{Result, TwinklyError};
use crate::util::movie::{Movie, MovieConfig};
use crate::util::realtime::{FrameFormat, RealtimeStreamer};
use crate::util::session::Session;
use crate::util::traits::valid_response;

pub mod music;

use music::{find_driver, MusicDriver, MUSIC_DRIVERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceMode {
    Movie,
    Playlist,
    #[value(name = "rt")]
    RealTime,
    Demo,
    Effect,
    Color,
    Off,
}

impl FromStr for DeviceMode {
    type Err = TwinklyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(DeviceMode::Movie),
            "playlist" => Ok(DeviceMode::Playlist),
            "rt" => Ok(DeviceMode::RealTime),
            "demo" => Ok(DeviceMode::Demo),
            "effect" => Ok(DeviceMode::Effect),
            "color" => Ok(DeviceMode::Color),
            "off" => Ok(DeviceMode::Off),
            _ => Err(TwinklyError::protocol(format!("Invalid mode: {}", s))),
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode_str = match self {
            DeviceMode::Movie => "movie",
            DeviceMode::Playlist => "playlist",
            DeviceMode::RealTime => "rt",
            DeviceMode::Demo => "demo",
            DeviceMode::Effect => "effect",
            DeviceMode::Color => "color",
            DeviceMode::Off => "off",
        };
        write!(f, "{}", mode_str)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedProfile {
    RGB,
    RGBW,
    RGBWW,
}

impl LedProfile {
    pub fn bytes_per_led(&self) -> usize {
        match self {
            LedProfile::RGB => 3,
            LedProfile::RGBW => 4,
            LedProfile::RGBWW => 5,
        }
    }

    /// Rejects colors whose channel count does not fit this profile.
    pub fn check(&self, color: &TwinklyColor) -> Result<()> {
        if color.arity() == self.bytes_per_led() {
            Ok(())
        } else {
            Err(TwinklyError::validation(format!(
                "color {} has {} channels, {} LEDs take {}",
                color,
                color.arity(),
                self,
                self.bytes_per_led()
            )))
        }
    }
}

impl fmt::Display for LedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedProfile::RGB => "RGB",
            LedProfile::RGBW => "RGBW",
            LedProfile::RGBWW => "RGBWW",
        };
        write!(f, "{}", name)
    }
}

/// Power usage reported by some devices.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[allow(non_snake_case)]
pub struct DevicePower {
    /// Milliampere.
    pub mA: i64,
    /// Millivolt.
    pub mV: i64,
}

#[allow(non_snake_case)]
impl DevicePower {
    /// Milliwatt.
    pub fn mW(&self) -> i64 {
        (self.mA * self.mV) / 1_000
    }
}

/// The device's self description, as returned by `gestalt`.
#[derive(Derivative)]
#[derivative(PartialEq)]
#[derive(Deserialize, Debug, Clone)]
pub struct DeviceDetails {
    pub product_name: String,
    #[serde(default)]
    pub hardware_version: String,
    #[serde(default)]
    pub bytes_per_led: usize,
    #[serde(default)]
    pub hw_id: String,
    pub flash_size: Option<usize>,
    #[serde(default)]
    pub led_type: usize,
    #[serde(default)]
    pub product_code: String,
    #[serde(default)]
    pub fw_family: String,
    #[serde(default)]
    pub device_name: String,

    // Changes while the device stays the same.
    #[derivative(PartialEq = "ignore")]
    #[serde(default, deserialize_with = "deserialize_duration_millis")]
    pub uptime: Duration,

    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub max_supported_led: usize,
    pub number_of_led: usize,

    #[derivative(PartialEq = "ignore")]
    pub pwr: Option<DevicePower>,

    pub led_profile: LedProfile,
    #[serde(default)]
    pub frame_rate: f64,

    #[derivative(PartialEq = "ignore")]
    #[serde(default)]
    pub measured_frame_rate: f64,

    #[serde(default)]
    pub movie_capacity: usize,
    #[serde(default)]
    pub max_movies: usize,
    #[serde(default)]
    pub wire_type: usize,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub code: u32,
}

// Uptime arrives as a string of milliseconds on most firmware, as a number on some.
fn deserialize_duration_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Text(String),
        Number(u64),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Number(millis) => Ok(Duration::from_millis(millis)),
        Millis::Text(text) => text
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize, Debug)]
struct ModeResponse {
    mode: String,
}

/// A handle on one Twinkly device.
///
/// Owns the authenticated [`Session`], the [`RealtimeStreamer`] and the cached
/// device details. All state is per handle.
pub struct ControlInterface {
    config: DeviceConfig,
    api_version: ApiVersion,
    session: Session,
    streamer: RealtimeStreamer,
    details: RwLock<Option<DeviceDetails>>,
    default_mode: RwLock<DeviceMode>,
}

impl ControlInterface {
    /// Creates a handle for a known API version, falling back to v1 when the
    /// config leaves it open. Nothing is sent until the first call.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let version = config.api_version.unwrap_or(ApiVersion::V1);
        ControlInterface::with_api_version(config, version)
    }

    pub fn with_api_version(config: DeviceConfig, api_version: ApiVersion) -> Result<Self> {
        let session = Session::new(&config, api_version)?;
        let streamer = RealtimeStreamer::from_config(&config);
        let default_mode = config.default_mode;
        Ok(ControlInterface {
            config,
            api_version,
            session,
            streamer,
            details: RwLock::new(None),
            default_mode: RwLock::new(default_mode),
        })
    }

    /// Creates a handle, probing the API version when the config does not fix it.
    ///
    /// Each candidate version is tried by logging in and fetching `gestalt`; the
    /// first one that answers with a valid response wins.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        if let Some(version) = config.api_version {
            return ControlInterface::with_api_version(config, version);
        }
        for version in [ApiVersion::V1, ApiVersion::V2] {
            let candidate = ControlInterface::with_api_version(config.clone(), version)?;
            match candidate.get_details().await {
                Ok(_) => {
                    debug!("Device at {} speaks API {}", config.host, version);
                    return Ok(candidate);
                }
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => debug!("API {} probe failed: {}", version, e),
            }
        }
        Err(TwinklyError::protocol(format!(
            "could not detect the API version of {}",
            config.host
        )))
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn endpoint(&self, v1: &'static str, v2: &'static str) -> &'static str {
        match self.api_version {
            ApiVersion::V1 => v1,
            ApiVersion::V2 => v2,
        }
    }

    fn require_v1(&self, operation: &str) -> Result<()> {
        match self.api_version {
            ApiVersion::V1 => Ok(()),
            version => Err(TwinklyError::protocol(format!(
                "{} is not supported by API {}",
                operation, version
            ))),
        }
    }

    fn valid(&self, response: Value) -> Result<Value> {
        valid_response(response, self.api_version, None)
    }

    async fn get_valid(&self, endpoint: &str) -> Result<Value> {
        let response = self.session.get(endpoint).await?;
        self.valid(response)
    }

    /// Loads the device details into the cache, unless they are cached already
    /// and `force` is false. Also adopts the current mode as default mode when
    /// the device is on.
    pub async fn interview(&self, force: bool) -> Result<DeviceDetails> {
        if !force {
            if let Some(details) = self.details.read().await.as_ref() {
                return Ok(details.clone());
            }
        }

        let response = self.get_details().await?;
        let details: DeviceDetails = serde_json::from_value(response.clone()).map_err(|e| {
            TwinklyError::validation(format!("Invalid device details {}: {}", response, e))
        })?;
        if details.number_of_led == 0 {
            return Err(TwinklyError::validation(format!(
                "Invalid device details, no LEDs: {}",
                response
            )));
        }

        let mode = self.current_mode().await?;
        if mode != DeviceMode::Off {
            *self.default_mode.write().await = mode;
        }
        *self.details.write().await = Some(details.clone());
        Ok(details)
    }

    /// Cached details, interviewing the device first if needed.
    pub async fn details(&self) -> Result<DeviceDetails> {
        self.interview(false).await
    }

    pub async fn length(&self) -> Result<usize> {
        Ok(self.details().await?.number_of_led)
    }

    pub async fn led_profile(&self) -> Result<LedProfile> {
        Ok(self.details().await?.led_profile)
    }

    pub async fn default_mode(&self) -> DeviceMode {
        *self.default_mode.read().await
    }

    pub async fn set_default_mode(&self, mode: DeviceMode) {
        if mode == DeviceMode::Off {
            warn!("Setting default mode to off");
        }
        *self.default_mode.write().await = mode;
    }

    pub async fn get_details(&self) -> Result<Value> {
        self.get_valid("gestalt").await
    }

    pub async fn get_name(&self) -> Result<Value> {
        self.get_valid(self.endpoint("device_name", "device/name"))
            .await
    }

    pub async fn set_name(&self, name: &str) -> Result<Value> {
        self.session
            .post(
                self.endpoint("device_name", "device/name"),
                json!({ "name": name }),
            )
            .await
    }

    pub async fn reset(&self) -> Result<Value> {
        self.get_valid("reset").await
    }

    pub async fn get_network_status(&self) -> Result<Value> {
        self.get_valid(self.endpoint("network/status", "network/eth/status"))
            .await
    }

    pub async fn get_firmware_version(&self) -> Result<Value> {
        self.get_valid(self.endpoint("fw/version", "fw/ct1/version"))
            .await
    }

    pub async fn summary(&self) -> Result<Value> {
        self.get_valid("summary").await
    }

    pub async fn logout(&self) -> Result<Value> {
        self.session.logout().await
    }

    pub async fn get_mode(&self) -> Result<Value> {
        self.get_valid(self.endpoint("led/mode", "application/mode"))
            .await
    }

    /// The current mode, parsed.
    pub async fn current_mode(&self) -> Result<DeviceMode> {
        let response = self.get_mode().await?;
        let mode: ModeResponse = serde_json::from_value(response.clone()).map_err(|_| {
            TwinklyError::validation(format!("Invalid response from Twinkly: {}", response))
        })?;
        mode.mode.parse()
    }

    pub async fn set_mode(&self, mode: DeviceMode) -> Result<Value> {
        self.session
            .post(
                self.endpoint("led/mode", "application/mode"),
                json!({ "mode": mode.to_string() }),
            )
            .await
    }

    pub async fn is_on(&self) -> Result<bool> {
        Ok(self.current_mode().await? != DeviceMode::Off)
    }

    /// Switches to the default mode.
    pub async fn turn_on(&self) -> Result<Value> {
        let mode = self.default_mode().await;
        self.set_mode(mode).await
    }

    pub async fn turn_off(&self) -> Result<Value> {
        self.set_mode(DeviceMode::Off).await
    }

    pub async fn get_brightness(&self) -> Result<Value> {
        self.get_valid("led/out/brightness").await
    }

    /// # Arguments
    /// - `percent`: Range is 0..=100.
    pub async fn set_brightness(&self, percent: u8) -> Result<Value> {
        if percent > 100 {
            return Err(TwinklyError::protocol(format!(
                "brightness {} is outside 0..=100",
                percent
            )));
        }
        let mut args = json!({ "value": percent, "type": "A" });
        if self.api_version >= ApiVersion::V2 {
            args["mode"] = json!("enabled");
        }
        self.session.post("led/out/brightness", args).await
    }

    pub async fn get_mqtt(&self) -> Result<Value> {
        self.get_valid("mqtt/config").await
    }

    pub async fn set_mqtt(&self, config: Value) -> Result<Value> {
        self.session.post("mqtt/config", config).await
    }

    /// Sends a realtime frame in the single-datagram format.
    pub async fn send_frame(&self, frame: &[TwinklyColor]) -> Result<usize> {
        self.send_frame_with(frame, FrameFormat::Simple).await
    }

    /// Sends a realtime frame split into segments of at most 300 LEDs.
    pub async fn send_frame_segmented(&self, frame: &[TwinklyColor]) -> Result<usize> {
        self.send_frame_with(frame, FrameFormat::Segmented).await
    }

    pub async fn send_frame_v3(&self, frame: &[TwinklyColor]) -> Result<usize> {
        self.send_frame_with(frame, FrameFormat::SegmentedV3).await
    }

    pub async fn send_frame_with(
        &self,
        frame: &[TwinklyColor],
        format: FrameFormat,
    ) -> Result<usize> {
        let details = self.details().await?;
        self.streamer
            .send_frame(
                &self.session,
                frame,
                details.number_of_led,
                details.led_profile,
                format,
            )
            .await
    }

    pub async fn get_movie_config(&self) -> Result<Value> {
        self.require_v1("get_movie_config")?;
        self.get_valid("led/movie/config").await
    }

    pub async fn set_movie_config(&self, config: &MovieConfig) -> Result<Value> {
        self.session
            .post("led/movie/config", serde_json::to_value(config)?)
            .await
    }

    /// Uploads raw movie bytes.
    pub async fn upload_movie(&self, movie: impl Into<Bytes>) -> Result<Value> {
        self.session.post_octets("led/movie/full", movie).await
    }

    /// Switches to movie mode, configures and uploads `movie`.
    pub async fn play_movie(&self, movie: &Movie, frame_delay: u32) -> Result<Value> {
        self.set_mode(DeviceMode::Movie).await?;
        self.set_movie_config(&movie.config(frame_delay)).await?;
        self.upload_movie(movie.data.clone()).await
    }

    pub async fn get_saved_movies(&self) -> Result<Value> {
        let response = self.session.get("movies").await?;
        valid_response(response, self.api_version, Some("movies"))
    }

    pub async fn get_current_movie(&self) -> Result<Value> {
        self.get_valid("movies/current").await
    }

    pub async fn set_current_movie(&self, movie_id: u32) -> Result<Value> {
        self.session
            .post("movies/current", json!({ "id": movie_id }))
            .await
    }

    /// Shows one color on every LED.
    ///
    /// API v1 wants the color before the mode switch, v2 the other way round.
    pub async fn set_static_color(&self, color: TwinklyColor) -> Result<Value> {
        self.details().await?;
        match self.api_version {
            ApiVersion::V1 => {
                let response = self.session.post("led/color", color.as_json()).await?;
                self.set_mode(DeviceMode::Color).await?;
                Ok(response)
            }
            ApiVersion::V2 => {
                self.set_mode(DeviceMode::Color).await?;
                self.session.post("led/color", color.as_json()).await
            }
        }
    }

    /// Repeats `colors` along the strip as a one-frame movie.
    pub async fn set_cycle_colors(&self, colors: &[TwinklyColor]) -> Result<Value> {
        let details = self.details().await?;
        let movie = Movie::color_cycle(colors, details.number_of_led, details.led_profile)?;
        self.upload_movie(movie.data.clone()).await?;
        let config = MovieConfig {
            loop_type: Some(0),
            ..movie.config(1000)
        };
        self.set_movie_config(&config).await?;
        self.set_mode(DeviceMode::Movie).await
    }

    pub async fn get_current_color(&self) -> Result<Value> {
        self.get_valid("led/color").await
    }

    pub async fn music_on(&self) -> Result<Value> {
        self.session
            .post("music/enabled", json!({ "enabled": 1 }))
            .await
    }

    pub async fn music_off(&self) -> Result<Value> {
        self.session
            .post("music/enabled", json!({ "enabled": 0 }))
            .await
    }

    pub async fn next_music_driver(&self) -> Result<Value> {
        self.session
            .post("music/drivers/current", json!({ "action": "next" }))
            .await
    }

    pub async fn previous_music_driver(&self) -> Result<Value> {
        self.session
            .post("music/drivers/current", json!({ "action": "prev" }))
            .await
    }

    pub async fn get_current_music_driver(&self) -> Result<Value> {
        self.require_v1("get_current_music_driver")?;
        self.get_valid("music/drivers/current").await
    }

    /// Selects a music driver by name.
    ///
    /// The device refuses an explicit driver until next/previous has been used
    /// once, which shows as a current handle of -1.
    pub async fn set_current_music_driver(&self, driver_name: &str) -> Result<Value> {
        let driver = find_driver(driver_name)?;
        let current = self.get_current_music_driver().await?;
        if current["handle"].as_i64() == Some(-1) {
            self.next_music_driver().await?;
        }
        self.session
            .post(
                "music/drivers/current",
                json!({ "unique_id": driver.id_string() }),
            )
            .await
    }

    pub fn music_drivers(&self) -> &'static [MusicDriver] {
        &MUSIC_DRIVERS
    }

    pub async fn get_predefined_effects(&self) -> Result<Value> {
        self.require_v1("get_predefined_effects")?;
        self.get_valid("led/effects").await
    }

    pub async fn get_current_predefined_effect(&self) -> Result<Value> {
        self.require_v1("get_current_predefined_effect")?;
        self.get_valid("led/effects/current").await
    }

    pub async fn set_current_predefined_effect(&self, effect_id: u32) -> Result<Value> {
        self.session
            .post("led/effects/current", json!({ "effect_id": effect_id }))
            .await
    }

    pub async fn get_playlist(&self) -> Result<Value> {
        self.get_valid(self.endpoint("playlist", "playlists"))
            .await
    }

    pub async fn get_current_playlist_entry(&self) -> Result<Value> {
        self.require_v1("get_current_playlist_entry")?;
        self.get_valid("playlist/current").await
    }

    /// Jumps to an entry of the playlist.
    pub async fn set_current_playlist_entry(&self, entry_id: u32) -> Result<Value> {
        self.session
            .post("playlist/current", json!({ "id": entry_id }))
            .await
    }
}
