//! Realtime frame streaming over UDP.
//!
//! Frames are pushed fire-and-forget to the device's realtime port. There is no
//! acknowledgment; a lost datagram is simply superseded by the next frame.

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use clap::ValueEnum;
use log::{debug, warn};
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::control_interface::LedProfile;
use crate::led::led_color::TwinklyColor;
use crate::util::config::DeviceConfig;
use crate::util::error::{Result, TwinklyError};
use crate::util::session::Session;

/// Most LEDs carried by one segmented datagram.
pub const RT_PAYLOAD_MAX_LIGHTS: usize = 300;

/// Datagram layout understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FrameFormat {
    /// One datagram: `0x01, token, led count (one byte), payload`.
    Simple,
    /// Up to 300 LEDs per datagram: `segment count, token, 0x00, 0x00, index, payload`.
    Segmented,
    /// Like `Segmented` with a constant `0x03` in place of the segment count.
    SegmentedV3,
}

/// Checks a frame against the device before anything is sent.
pub fn validate_frame(frame: &[TwinklyColor], led_count: usize, profile: LedProfile) -> Result<()> {
    if frame.len() != led_count {
        return Err(TwinklyError::validation(format!(
            "Invalid frame length: expected {} LEDs, got {}",
            led_count,
            frame.len()
        )));
    }
    frame.iter().try_for_each(|color| profile.check(color))
}

fn put_payload(packet: &mut BytesMut, leds: &[TwinklyColor]) {
    for color in leds {
        color.put_wire(packet);
    }
}

/// Encodes the single-datagram format.
///
/// The LED count field is one byte wide and wraps for strips of more than 255
/// LEDs.
pub fn encode_simple(token: &[u8], frame: &[TwinklyColor]) -> Bytes {
    let payload_len: usize = frame.iter().map(TwinklyColor::arity).sum();
    let mut packet = BytesMut::with_capacity(2 + token.len() + payload_len);
    packet.put_u8(0x01);
    packet.extend_from_slice(token);
    packet.put_u8(frame.len() as u8);
    put_payload(&mut packet, frame);
    packet.freeze()
}

/// Encodes a frame as consecutive segments of at most [`RT_PAYLOAD_MAX_LIGHTS`] LEDs.
pub fn encode_segmented(
    token: &[u8],
    frame: &[TwinklyColor],
    format: FrameFormat,
) -> Result<Vec<Bytes>> {
    let segment_count = frame.len().div_ceil(RT_PAYLOAD_MAX_LIGHTS);
    if segment_count > u8::MAX as usize {
        return Err(TwinklyError::protocol(format!(
            "frame of {} LEDs needs {} segments, at most {} fit the header",
            frame.len(),
            segment_count,
            u8::MAX
        )));
    }

    let lead = match format {
        FrameFormat::SegmentedV3 => 0x03,
        _ => segment_count as u8,
    };
    let datagrams = frame
        .chunks(RT_PAYLOAD_MAX_LIGHTS)
        .enumerate()
        .map(|(index, segment)| {
            let mut packet = BytesMut::new();
            packet.put_u8(lead);
            packet.extend_from_slice(token);
            packet.put_u16(0);
            packet.put_u8(index as u8);
            put_payload(&mut packet, segment);
            packet.freeze()
        })
        .collect();
    Ok(datagrams)
}

/// Encodes a frame into the datagrams of `format`, in send order.
pub fn encode_frame(
    format: FrameFormat,
    token: &[u8],
    frame: &[TwinklyColor],
) -> Result<Vec<Bytes>> {
    match format {
        FrameFormat::Simple => Ok(vec![encode_simple(token, frame)]),
        FrameFormat::Segmented | FrameFormat::SegmentedV3 => {
            encode_segmented(token, frame, format)
        }
    }
}

/// Sends frames to one device over a single lazily bound UDP socket.
pub struct RealtimeStreamer {
    host: String,
    port: u16,
    timeout: Duration,
    socket: OnceCell<UdpSocket>,
}

impl RealtimeStreamer {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        RealtimeStreamer {
            host: host.into(),
            port,
            timeout,
            socket: OnceCell::new(),
        }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        RealtimeStreamer::new(config.host.clone(), config.rt_port, config.timeout)
    }

    // Unconnected, so ICMP errors caused by earlier datagrams do not fail later sends.
    async fn socket(&self) -> Result<&UdpSocket> {
        self.socket
            .get_or_try_init(|| async {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                debug!("Realtime socket bound to {}", socket.local_addr()?);
                Ok::<_, TwinklyError>(socket)
            })
            .await
    }

    /// Validates and sends one frame.
    ///
    /// Nothing is written unless the frame matches `led_count` and `profile` and a
    /// valid token could be obtained. Returns the number of bytes written; a
    /// datagram refused by the host counts as lost.
    pub async fn send_frame(
        &self,
        session: &Session,
        frame: &[TwinklyColor],
        led_count: usize,
        profile: LedProfile,
        format: FrameFormat,
    ) -> Result<usize> {
        validate_frame(frame, led_count, profile)?;
        let token = session.ensure_token().await?;
        let raw_token = token.raw_bytes()?;

        if format == FrameFormat::Simple && led_count > u8::MAX as usize {
            warn!(
                "Simple realtime framing truncates the LED count of {} to one byte, use segmented framing",
                led_count
            );
        }
        let datagrams = encode_frame(format, &raw_token, frame)?;

        let socket = self.socket().await?;
        let target = (self.host.as_str(), self.port);
        let mut written = 0;
        for (index, datagram) in datagrams.iter().enumerate() {
            let sent = timeout(self.timeout, socket.send_to(datagram, target))
                .await
                .map_err(|_| TwinklyError::Timeout(format!("realtime datagram {}", index)))?;
            match sent {
                Ok(bytes) => written += bytes,
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!("Realtime datagram {} dropped: {}", index, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!("Sent {} realtime datagram(s), {} bytes", datagrams.len(), written);
        Ok(written)
    }
}
