//! # Little Star: a client library for Twinkly LEDs
//!
//! `little-star-lib` talks to a single Twinkly LED controller on the local network.
//! It keeps an authenticated HTTP session with the device, wraps the `/xled` REST
//! API in named operations and streams realtime frames over UDP.
//!
//! ## Features
//!
//! - Token based sessions with transparent re-login on expiry and on `401`
//! - Realtime frame streaming in the single-datagram and segmented formats
//! - Mode, brightness, movie, static color, playlist and music driver control
//!
//! ## Example
//!
//! ```no_run
//! use little_star_lib::control_interface::{ControlInterface, DeviceMode};
//! use little_star_lib::led::led_color::TwinklyColor;
//! use little_star_lib::util::config::DeviceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = ControlInterface::connect(DeviceConfig::new("192.168.4.1")).await?;
//!     device.set_mode(DeviceMode::RealTime).await?;
//!
//!     let length = device.length().await?;
//!     let frame = vec![TwinklyColor::rgb(255, 64, 0); length];
//!     device.send_frame_segmented(&frame).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Disclaimer
//!
//! This project is not affiliated with, authorized by, endorsed by, or in any way officially connected
//! with Twinkly or its affiliates. The official Twinkly website can be found at [https://www.twinkly.com](https://www.twinkly.com).
//!
//! ## License
//!
//! This project is dual-licensed under the MIT License and the Apache License, Version 2.0.
//! You may choose to use either license, depending on your project needs.

// The `control_interface` module is the device handle: every REST operation,
// the cached device details and realtime frame pushes.
//
// Example usage:
//
// ```
// use little_star_lib::control_interface::{ControlInterface, DeviceMode};
// use little_star_lib::util::config::DeviceConfig;
//
// #[tokio::main]
// async fn main() {
//     let control = ControlInterface::connect(DeviceConfig::new("192.168.1.100")).await.unwrap();
//     control.set_mode(DeviceMode::Color).await.unwrap();
// }
// ```
pub mod control_interface;

// The `led` module holds the per-LED color type and its logical and wire
// channel orders.
pub mod led;

// The `util` module contains the session manager, the realtime streamer,
// configuration, errors, response validation and movie helpers.
pub mod util;
