// src/canvas/protocol.rs

//! Text encoding of pixelflut commands and parsing of the server's answers.
//!
//! Commands are newline-terminated lines of whitespace-separated tokens:
//!
//! - `PX <x> <y> <rrggbb>` sets a pixel; the server sends nothing back.
//! - `PX <x> <y>` asks for a pixel; the server answers `PX <x> <y> <rrggbb>`.

use super::{Coord, ProtocolError};
use crate::color::Rgb;
use std::fmt;
use std::io::{self, Write};

const PIXEL_KEYWORD: &str = "PX";

/// A client-issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPixel { coord: Coord, color: Rgb },
    GetPixel { coord: Coord },
}

impl Command {
    /// Writes the command, including its trailing newline.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetPixel { coord, color } => {
                write!(f, "{} {} {} {}", PIXEL_KEYWORD, coord.x, coord.y, color)
            }
            Command::GetPixel { coord } => write!(f, "{} {} {}", PIXEL_KEYWORD, coord.x, coord.y),
        }
    }
}

/// Parses a `PX <x> <y> <rrggbb>` response line.
///
/// Trailing whitespace (including the line terminator) is ignored. Extra
/// fields after the color are tolerated.
pub fn parse_pixel_response(line: &str) -> Result<(Coord, Rgb), ProtocolError> {
    let line = line.trim_end();
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(ProtocolError::TooFewFields(line.to_string()));
    }
    if fields[0] != PIXEL_KEYWORD {
        return Err(ProtocolError::UnexpectedKeyword(line.to_string()));
    }
    let x = fields[1]
        .parse::<u32>()
        .map_err(|_| ProtocolError::InvalidCoordinate(line.to_string()))?;
    let y = fields[2]
        .parse::<u32>()
        .map_err(|_| ProtocolError::InvalidCoordinate(line.to_string()))?;
    let color = Rgb::from_hex(fields[3]).map_err(|_| ProtocolError::InvalidColor(line.to_string()))?;
    Ok((Coord::new(x, y), color))
}
