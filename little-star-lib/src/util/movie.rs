use std::path::Path;

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::control_interface::LedProfile;
use crate::led::led_color::TwinklyColor;
use crate::util::error::{Result, TwinklyError};

/// A movie in the device's binary layout: frames back to back, every LED in
/// wire channel order.
#[derive(Debug, Clone)]
pub struct Movie {
    pub data: Bytes,
    pub leds_number: usize,
    pub frames_number: usize,
}

/// Body for the `led/movie/config` endpoint.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MovieConfig {
    /// Milliseconds between two frames.
    pub frame_delay: u32,
    pub leds_number: usize,
    pub frames_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_type: Option<u8>,
}

impl Movie {
    /// Wraps an already encoded movie, deriving the frame count from its size.
    pub fn from_bytes(
        data: impl Into<Bytes>,
        leds_number: usize,
        led_profile: LedProfile,
    ) -> Result<Self> {
        let data = data.into();
        let frame_size = leds_number * led_profile.bytes_per_led();
        if frame_size == 0 || data.is_empty() || data.len() % frame_size != 0 {
            return Err(TwinklyError::validation(format!(
                "movie of {} bytes does not hold whole frames of {} LEDs ({})",
                data.len(),
                leds_number,
                led_profile
            )));
        }
        Ok(Movie {
            frames_number: data.len() / frame_size,
            data,
            leds_number,
        })
    }

    /// Reads a raw movie file from disk.
    pub async fn load<P: AsRef<Path>>(
        path: P,
        leds_number: usize,
        led_profile: LedProfile,
    ) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        Movie::from_bytes(data, leds_number, led_profile)
    }

    /// Encodes frames of colors. Every frame must have `leds_number` LEDs of the
    /// profile's arity.
    pub fn from_frames(
        frames: &[Vec<TwinklyColor>],
        leds_number: usize,
        led_profile: LedProfile,
    ) -> Result<Self> {
        let mut data =
            BytesMut::with_capacity(frames.len() * leds_number * led_profile.bytes_per_led());
        for frame in frames {
            if frame.len() != leds_number {
                return Err(TwinklyError::validation(format!(
                    "Invalid frame length: expected {}, got {}",
                    leds_number,
                    frame.len()
                )));
            }
            for color in frame {
                led_profile.check(color)?;
                color.put_wire(&mut data);
            }
        }
        Movie::from_bytes(data.freeze(), leds_number, led_profile)
    }

    /// A single frame repeating `colors` along the whole strip.
    pub fn color_cycle(
        colors: &[TwinklyColor],
        leds_number: usize,
        led_profile: LedProfile,
    ) -> Result<Self> {
        if colors.is_empty() {
            return Err(TwinklyError::validation("at least one color is required"));
        }
        let frame: Vec<TwinklyColor> = colors.iter().cycle().take(leds_number).copied().collect();
        Movie::from_frames(&[frame], leds_number, led_profile)
    }

    pub fn config(&self, frame_delay: u32) -> MovieConfig {
        MovieConfig {
            frame_delay,
            leds_number: self.leds_number,
            frames_number: self.frames_number,
            loop_type: None,
        }
    }
}
