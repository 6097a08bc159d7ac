use std::fmt;
use std::str::FromStr;

use bytes::BufMut;
use palette::Srgb;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::control_interface::LedProfile;
use crate::util::error::{Result, TwinklyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RGB {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl From<(u8, u8, u8)> for RGB {
    fn from(tuple: (u8, u8, u8)) -> Self {
        RGB {
            red: tuple.0,
            green: tuple.1,
            blue: tuple.2,
        }
    }
}

impl From<RGB> for (u8, u8, u8) {
    fn from(rgb: RGB) -> Self {
        (rgb.red, rgb.green, rgb.blue)
    }
}

/// The color of one LED.
///
/// Logical channel order is always R, G, B followed by the white channels. The
/// device expects the white channels first on the wire: `(W, R, G, B)` for RGBW
/// and `(CW, W, R, G, B)` for RGBWW. Use [`TwinklyColor::as_twinkly_tuple`] and
/// [`TwinklyColor::from_twinkly_tuple`] to cross that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwinklyColor {
    Rgb {
        red: u8,
        green: u8,
        blue: u8,
    },
    Rgbw {
        red: u8,
        green: u8,
        blue: u8,
        white: u8,
    },
    Rgbww {
        red: u8,
        green: u8,
        blue: u8,
        white: u8,
        cool_white: u8,
    },
}

impl TwinklyColor {
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        TwinklyColor::Rgb { red, green, blue }
    }

    pub fn rgbw(red: u8, green: u8, blue: u8, white: u8) -> Self {
        TwinklyColor::Rgbw {
            red,
            green,
            blue,
            white,
        }
    }

    pub fn rgbww(red: u8, green: u8, blue: u8, white: u8, cool_white: u8) -> Self {
        TwinklyColor::Rgbww {
            red,
            green,
            blue,
            white,
            cool_white,
        }
    }

    /// Number of channels: 3, 4 or 5.
    pub fn arity(&self) -> usize {
        match self {
            TwinklyColor::Rgb { .. } => 3,
            TwinklyColor::Rgbw { .. } => 4,
            TwinklyColor::Rgbww { .. } => 5,
        }
    }

    /// The LED profile this color is meant for.
    pub fn profile(&self) -> LedProfile {
        match self {
            TwinklyColor::Rgb { .. } => LedProfile::RGB,
            TwinklyColor::Rgbw { .. } => LedProfile::RGBW,
            TwinklyColor::Rgbww { .. } => LedProfile::RGBWW,
        }
    }

    pub fn to_rgb(&self) -> RGB {
        match *self {
            TwinklyColor::Rgb { red, green, blue }
            | TwinklyColor::Rgbw {
                red, green, blue, ..
            }
            | TwinklyColor::Rgbww {
                red, green, blue, ..
            } => RGB { red, green, blue },
        }
    }

    /// Logical order: `(R, G, B[, W[, CW]])`.
    pub fn as_tuple(&self) -> Vec<u8> {
        match *self {
            TwinklyColor::Rgb { red, green, blue } => vec![red, green, blue],
            TwinklyColor::Rgbw {
                red,
                green,
                blue,
                white,
            } => vec![red, green, blue, white],
            TwinklyColor::Rgbww {
                red,
                green,
                blue,
                white,
                cool_white,
            } => vec![red, green, blue, white, cool_white],
        }
    }

    /// Wire order: `([CW, ][W, ]R, G, B)`.
    pub fn as_twinkly_tuple(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.arity());
        self.put_wire(&mut out);
        out
    }

    /// Appends the wire-order channel bytes to `buf`.
    pub fn put_wire<B: BufMut>(&self, buf: &mut B) {
        match *self {
            TwinklyColor::Rgb { red, green, blue } => {
                buf.put_slice(&[red, green, blue]);
            }
            TwinklyColor::Rgbw {
                red,
                green,
                blue,
                white,
            } => {
                buf.put_slice(&[white, red, green, blue]);
            }
            TwinklyColor::Rgbww {
                red,
                green,
                blue,
                white,
                cool_white,
            } => {
                buf.put_slice(&[cool_white, white, red, green, blue]);
            }
        }
    }

    pub fn from_tuple(channels: &[u8]) -> Result<Self> {
        match channels {
            &[r, g, b] => Ok(TwinklyColor::rgb(r, g, b)),
            &[r, g, b, w] => Ok(TwinklyColor::rgbw(r, g, b, w)),
            &[r, g, b, w, cw] => Ok(TwinklyColor::rgbww(r, g, b, w, cw)),
            _ => Err(unknown_arity(channels.len())),
        }
    }

    pub fn from_twinkly_tuple(channels: &[u8]) -> Result<Self> {
        match channels {
            &[r, g, b] => Ok(TwinklyColor::rgb(r, g, b)),
            &[w, r, g, b] => Ok(TwinklyColor::rgbw(r, g, b, w)),
            &[cw, w, r, g, b] => Ok(TwinklyColor::rgbww(r, g, b, w, cw)),
            _ => Err(unknown_arity(channels.len())),
        }
    }

    /// Body for the `led/color` endpoint.
    pub fn as_json(&self) -> Value {
        match *self {
            TwinklyColor::Rgb { red, green, blue } => {
                json!({ "red": red, "green": green, "blue": blue })
            }
            TwinklyColor::Rgbw {
                red,
                green,
                blue,
                white,
            } => json!({ "red": red, "green": green, "blue": blue, "white": white }),
            TwinklyColor::Rgbww {
                red,
                green,
                blue,
                white,
                cool_white,
            } => json!({
                "red": red,
                "green": green,
                "blue": blue,
                "white": white,
                "cool_white": cool_white,
            }),
        }
    }

    /// Looks up a CSS/SVG color name such as `"orange"` or `"lightseagreen"`.
    pub fn from_name(name: &str) -> Result<Self> {
        palette::named::from_str(&name.to_lowercase())
            .map(TwinklyColor::from)
            .ok_or_else(|| TwinklyError::protocol(format!("unknown color name: {}", name)))
    }
}

fn unknown_arity(len: usize) -> TwinklyError {
    TwinklyError::protocol(format!(
        "unknown color format: expected 3, 4 or 5 channels, got {}",
        len
    ))
}

impl From<RGB> for TwinklyColor {
    fn from(rgb: RGB) -> Self {
        TwinklyColor::rgb(rgb.red, rgb.green, rgb.blue)
    }
}

impl From<(u8, u8, u8)> for TwinklyColor {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        TwinklyColor::rgb(red, green, blue)
    }
}

impl From<(u8, u8, u8, u8)> for TwinklyColor {
    fn from((red, green, blue, white): (u8, u8, u8, u8)) -> Self {
        TwinklyColor::rgbw(red, green, blue, white)
    }
}

impl From<Srgb<u8>> for TwinklyColor {
    fn from(color: Srgb<u8>) -> Self {
        TwinklyColor::rgb(color.red, color.green, color.blue)
    }
}

/// Parses `"r,g,b"`, `"r,g,b,w"`, `"r,g,b,w,cw"` or a color name.
impl FromStr for TwinklyColor {
    type Err = TwinklyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.contains(',') {
            return TwinklyColor::from_name(s);
        }
        let channels = s
            .split(',')
            .map(|part| {
                part.trim().parse::<u8>().map_err(|e| {
                    TwinklyError::protocol(format!("invalid channel value '{}': {}", part, e))
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        TwinklyColor::from_tuple(&channels)
    }
}

impl fmt::Display for TwinklyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<String> = self.as_tuple().iter().map(u8::to_string).collect();
        write!(f, "({})", channels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_order() {
        assert_eq!(TwinklyColor::rgb(1, 2, 3).as_twinkly_tuple(), vec![1, 2, 3]);
        assert_eq!(
            TwinklyColor::rgbw(1, 2, 3, 4).as_twinkly_tuple(),
            vec![4, 1, 2, 3]
        );
        assert_eq!(
            TwinklyColor::rgbww(1, 2, 3, 4, 5).as_twinkly_tuple(),
            vec![5, 4, 1, 2, 3]
        );
    }

    #[test]
    fn test_logical_order() {
        assert_eq!(TwinklyColor::rgb(1, 2, 3).as_tuple(), vec![1, 2, 3]);
        assert_eq!(TwinklyColor::rgbw(1, 2, 3, 4).as_tuple(), vec![1, 2, 3, 4]);
        assert_eq!(
            TwinklyColor::rgbww(1, 2, 3, 4, 5).as_tuple(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_round_trip_through_wire_order() {
        let tuples: [&[u8]; 3] = [&[10, 20, 30], &[10, 20, 30, 40], &[10, 20, 30, 40, 50]];
        for tuple in tuples {
            let color = TwinklyColor::from_tuple(tuple).unwrap();
            let wire = color.as_twinkly_tuple();
            let back = TwinklyColor::from_twinkly_tuple(&wire).unwrap();
            assert_eq!(back, color);
            assert_eq!(back.as_tuple(), tuple.to_vec());
        }
    }

    #[test]
    fn test_unknown_arity() {
        assert!(matches!(
            TwinklyColor::from_tuple(&[1, 2]),
            Err(TwinklyError::Protocol(_))
        ));
        assert!(TwinklyColor::from_twinkly_tuple(&[1, 2, 3, 4, 5, 6]).is_err());
    }

    #[test]
    fn test_arity_and_profile() {
        assert_eq!(TwinklyColor::rgb(0, 0, 0).arity(), 3);
        assert_eq!(TwinklyColor::rgbw(0, 0, 0, 0).profile(), LedProfile::RGBW);
        assert_eq!(
            TwinklyColor::rgbww(0, 0, 0, 0, 0).profile().bytes_per_led(),
            5
        );
    }

    #[test]
    fn test_json_body() {
        assert_eq!(
            TwinklyColor::rgb(255, 0, 10).as_json(),
            json!({"red": 255, "green": 0, "blue": 10})
        );
        assert_eq!(
            TwinklyColor::rgbw(1, 2, 3, 4).as_json(),
            json!({"red": 1, "green": 2, "blue": 3, "white": 4})
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "255,128,0".parse::<TwinklyColor>().unwrap(),
            TwinklyColor::rgb(255, 128, 0)
        );
        assert_eq!(
            " 1, 2, 3, 4 ".parse::<TwinklyColor>().unwrap(),
            TwinklyColor::rgbw(1, 2, 3, 4)
        );
        assert_eq!(
            "Red".parse::<TwinklyColor>().unwrap(),
            TwinklyColor::rgb(255, 0, 0)
        );
        assert!("256,0,0".parse::<TwinklyColor>().is_err());
        assert!("not-a-color".parse::<TwinklyColor>().is_err());
    }

    #[test]
    fn test_from_tuples() {
        assert_eq!(TwinklyColor::from((1, 2, 3)), TwinklyColor::rgb(1, 2, 3));
        assert_eq!(
            TwinklyColor::from((1, 2, 3, 4)),
            TwinklyColor::rgbw(1, 2, 3, 4)
        );
        let rgb: RGB = (7, 8, 9).into();
        assert_eq!(TwinklyColor::from(rgb).to_rgb(), rgb);
    }
}
