// src/color.rs

//! Defines the 24-bit `Rgb` color used on the wire, its hex text form, and the
//! random-color policy used to pick draw colors.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest value representable in 24 bits.
pub const MAX_RGB: u32 = 0x00FF_FFFF;

/// Number of hex digits in the canonical color form.
const HEX_DIGITS: usize = 6;

/// Number of hex digits when a server appends an alpha byte (`rrggbbaa`).
const HEX_DIGITS_WITH_ALPHA: usize = 8;

/// Error returned when a color token cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color {0:?} must have 6 hex digits")]
    InvalidLength(String),
    #[error("color {0:?} contains non-hex characters")]
    InvalidDigit(String),
}

/// A packed 24-bit RGB color (`0x00RRGGBB`).
///
/// The canonical text form, used by the pixelflut protocol, is six lowercase
/// zero-padded hex digits (`Display`). Parsing goes through `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(u32);

impl Rgb {
    /// Black, also the fallback for pixels whose color could not be read.
    pub const BLACK: Rgb = Rgb(0);
    pub const WHITE: Rgb = Rgb(MAX_RGB);

    /// Creates a color from a packed value. Bits above 24 are discarded.
    pub const fn from_u32(value: u32) -> Self {
        Rgb(value & MAX_RGB)
    }

    pub const fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// Returns the `(r, g, b)` channels.
    pub const fn channels(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }

    /// Picks a color uniformly over the whole 24-bit range.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Rgb(rng.gen_range(0..=MAX_RGB))
    }

    /// Parses a hex color token.
    ///
    /// Accepts exactly six hex digits in either case. Eight digits are also
    /// accepted; the trailing alpha byte is dropped.
    pub fn from_hex(token: &str) -> Result<Self, ColorParseError> {
        if token.len() != HEX_DIGITS && token.len() != HEX_DIGITS_WITH_ALPHA {
            return Err(ColorParseError::InvalidLength(token.to_string()));
        }
        // Checked before slicing so the slice below always lands on a char boundary.
        if !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError::InvalidDigit(token.to_string()));
        }
        u32::from_str_radix(&token[..HEX_DIGITS], 16)
            .map(Rgb)
            .map_err(|_| ColorParseError::InvalidDigit(token.to_string()))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}
