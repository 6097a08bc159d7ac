use std::fmt;
use std::time::Duration;

use clap::ValueEnum;

use crate::control_interface::DeviceMode;

/// Default timeout for every HTTP request and realtime datagram.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// UDP port the device listens on for realtime frames.
pub const DEFAULT_RT_PORT: u16 = 7777;
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Version of the `/xled` REST API spoken by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum ApiVersion {
    #[value(name = "1")]
    V1,
    #[value(name = "2")]
    V2,
}

impl ApiVersion {
    pub fn number(&self) -> u8 {
        match self {
            ApiVersion::V1 => 1,
            ApiVersion::V2 => 2,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Connection settings for one device handle.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub host: String,
    pub http_port: u16,
    pub rt_port: u16,
    pub timeout: Duration,
    /// `None` lets [`crate::control_interface::ControlInterface::connect`] probe for it.
    pub api_version: Option<ApiVersion>,
    /// Mode restored by `turn_on`.
    pub default_mode: DeviceMode,
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> Self {
        DeviceConfig {
            host: host.into(),
            http_port: DEFAULT_HTTP_PORT,
            rt_port: DEFAULT_RT_PORT,
            timeout: DEFAULT_TIMEOUT,
            api_version: None,
            default_mode: DeviceMode::Movie,
        }
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_rt_port(mut self, port: u16) -> Self {
        self.rt_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    pub fn with_default_mode(mut self, mode: DeviceMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Root of the REST API, e.g. `http://192.168.4.1/xled/v1`.
    pub fn base_url(&self, version: ApiVersion) -> String {
        if self.http_port == DEFAULT_HTTP_PORT {
            format!("http://{}/xled/v{}", self.host, version.number())
        } else {
            format!(
                "http://{}:{}/xled/v{}",
                self.host,
                self.http_port,
                version.number()
            )
        }
    }
}
