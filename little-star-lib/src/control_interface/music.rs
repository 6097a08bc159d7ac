use log::warn;
use uuid::{uuid, Uuid};

use crate::util::error::{Result, TwinklyError};

/// A sound-reactive effect built into the device firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicDriver {
    pub name: &'static str,
    pub unique_id: Uuid,
    /// Unofficial drivers exist on the device but are not offered by the app.
    pub official: bool,
}

impl MusicDriver {
    const fn official(name: &'static str, unique_id: Uuid) -> Self {
        MusicDriver {
            name,
            unique_id,
            official: true,
        }
    }

    const fn unofficial(name: &'static str, unique_id: Uuid) -> Self {
        MusicDriver {
            name,
            unique_id,
            official: false,
        }
    }

    /// The id as the device spells it: hyphenated upper-case hex.
    pub fn id_string(&self) -> String {
        self.unique_id.hyphenated().to_string().to_uppercase()
    }
}

pub static MUSIC_DRIVERS: [MusicDriver; 26] = [
    MusicDriver::official("VU Meter", uuid!("00000000-0000-0000-0000-000000000001")),
    MusicDriver::official("Beat Hue", uuid!("00000000-0000-0000-0000-000000000002")),
    MusicDriver::official("Psychedelica", uuid!("00000000-0000-0000-0000-000000000003")),
    MusicDriver::official("Red Vertigo", uuid!("00000000-0000-0000-0000-000000000004")),
    MusicDriver::official("Dancing Bands", uuid!("00000000-0000-0000-0000-000000000005")),
    MusicDriver::official("Diamond Swirl", uuid!("00000000-0000-0000-0000-000000000006")),
    MusicDriver::official("Joyful Stripes", uuid!("00000000-0000-0000-0000-000000000007")),
    MusicDriver::official("Angel Fade", uuid!("00000000-0000-0000-0000-000000000008")),
    MusicDriver::official("Clockwork", uuid!("00000000-0000-0000-0000-000000000009")),
    MusicDriver::official("Sipario", uuid!("00000000-0000-0000-0000-00000000000A")),
    MusicDriver::official("Sunset", uuid!("00000000-0000-0000-0000-00000000000B")),
    MusicDriver::official("Elevator", uuid!("00000000-0000-0000-0000-00000000000C")),
    MusicDriver::unofficial("VU Meter 2", uuid!("00000000-0000-0000-0000-000001000001")),
    MusicDriver::unofficial("Beat Hue 2", uuid!("00000000-0000-0000-0000-000001000002")),
    MusicDriver::unofficial("Psychedelica 2", uuid!("00000000-0000-0000-0000-000001000003")),
    MusicDriver::unofficial("Sparkle", uuid!("00000000-0000-0000-0000-000001000005")),
    MusicDriver::unofficial("Sparkle Hue", uuid!("00000000-0000-0000-0000-000001000006")),
    MusicDriver::unofficial("Psycho Sparkle", uuid!("00000000-0000-0000-0000-000001000007")),
    MusicDriver::unofficial("Psycho Hue", uuid!("00000000-0000-0000-0000-000001000008")),
    MusicDriver::unofficial("Red Line", uuid!("00000000-0000-0000-0000-000001000009")),
    MusicDriver::unofficial("Red Vertigo 2", uuid!("00000000-0000-0000-0000-000002000004")),
    MusicDriver::unofficial("Dancing Bands 2", uuid!("00000000-0000-0000-0000-000002000005")),
    MusicDriver::unofficial("Diamond Swirl 2", uuid!("00000000-0000-0000-0000-000002000006")),
    MusicDriver::unofficial("Angel Fade 2", uuid!("00000000-0000-0000-0000-000002000008")),
    MusicDriver::unofficial("Clockwork 2", uuid!("00000000-0000-0000-0000-000002000009")),
    MusicDriver::unofficial("Sunset 2", uuid!("00000000-0000-0000-0000-00000200000B")),
];

/// Looks a driver up by its display name.
pub fn find_driver(name: &str) -> Result<&'static MusicDriver> {
    let driver = MUSIC_DRIVERS
        .iter()
        .find(|driver| driver.name == name)
        .ok_or_else(|| TwinklyError::protocol(format!("'{}' is an invalid music driver", name)))?;
    if !driver.official {
        warn!(
            "Music driver '{}' is defined, but is not officially supported",
            name
        );
    }
    Ok(driver)
}
