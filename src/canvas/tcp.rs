// src/canvas/tcp.rs

//! `CanvasLink` over a single long-lived TCP connection.

use super::protocol::{self, Command};
use super::{CanvasError, CanvasLink, Coord, LinkError};
use crate::color::Rgb;
use crate::config::ServerConfig;
use log::*;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, MutexGuard};

/// Answers for other pixels a get will skip before giving up on the stream.
pub const MAX_STALE_RESPONSES: usize = 16;

/// Both halves of the socket. Kept together behind one mutex so a get's
/// request and response are never interleaved with another thread's writes.
struct Connection {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
    response: String,
}

/// A pixelflut connection shared by the scroll driver and its restore workers.
pub struct TcpCanvasLink {
    peer: String,
    conn: Mutex<Option<Connection>>,
}

impl TcpCanvasLink {
    /// Connects to `config.host:config.port`, trying each resolved address.
    pub fn connect(config: &ServerConfig) -> Result<Self, LinkError> {
        let addr = format!("{}:{}", config.host, config.port);
        info!("TcpCanvasLink: Connecting to {}", addr);
        let candidates = addr
            .to_socket_addrs()
            .map_err(|source| LinkError::Connect { addr: addr.clone(), source })?;

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, config.connect_timeout()) {
                Ok(stream) => {
                    stream.set_read_timeout(config.read_timeout())?;
                    return Self::from_stream(stream, addr);
                }
                Err(e) => {
                    debug!("TcpCanvasLink: {} refused: {}", candidate, e);
                    last_err = Some(e);
                }
            }
        }
        Err(LinkError::Connect {
            addr,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }

    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream, peer: impl Into<String>) -> Result<Self, LinkError> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let peer = peer.into();
        info!("TcpCanvasLink: Connected to {}", peer);
        Ok(TcpCanvasLink {
            peer,
            conn: Mutex::new(Some(Connection {
                writer: BufWriter::new(stream),
                reader,
                response: String::new(),
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic while holding the lock leaves the buffers in an unknown state,
        // but the socket itself is still usable; keep going with it.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CanvasLink for TcpCanvasLink {
    fn set_pixel(&self, coord: Coord, color: Rgb) -> Result<(), LinkError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(LinkError::Closed)?;
        Command::SetPixel { coord, color }.write_to(&mut conn.writer)?;
        Ok(())
    }

    fn get_pixel(&self, coord: Coord) -> Result<Rgb, CanvasError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(LinkError::Closed)?;
        Command::GetPixel { coord }
            .write_to(&mut conn.writer)
            .map_err(LinkError::from)?;
        conn.writer.flush().map_err(LinkError::from)?;

        // Answers for other pixels are left over from an earlier get whose own
        // answer was unreadable, or were never asked for. Ours comes after them.
        for _ in 0..=MAX_STALE_RESPONSES {
            conn.response.clear();
            let read = conn
                .reader
                .read_line(&mut conn.response)
                .map_err(LinkError::from)?;
            if read == 0 {
                return Err(LinkError::Disconnected.into());
            }
            trace!("TcpCanvasLink: {} -> {:?}", coord, conn.response.trim_end());
            let (answered, color) = protocol::parse_pixel_response(&conn.response)?;
            if answered == coord {
                return Ok(color);
            }
            debug!(
                "TcpCanvasLink: Skipping stale answer {:?} while reading {}",
                conn.response.trim_end(),
                coord
            );
        }
        Err(LinkError::OutOfSync {
            requested: coord,
            skipped: MAX_STALE_RESPONSES + 1,
        }
        .into())
    }

    fn flush(&self) -> Result<(), LinkError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(LinkError::Closed)?;
        conn.writer.flush()?;
        Ok(())
    }

    fn close(&self) {
        let Some(mut conn) = self.lock().take() else {
            return;
        };
        if let Err(e) = conn.writer.flush() {
            warn!("TcpCanvasLink: Failed to flush pending commands on close: {}", e);
        }
        if let Err(e) = conn.writer.get_ref().shutdown(Shutdown::Both) {
            // The peer may already be gone.
            debug!("TcpCanvasLink: Shutdown of {} reported: {}", self.peer, e);
        }
        info!("TcpCanvasLink: Connection to {} closed", self.peer);
    }
}

impl Drop for TcpCanvasLink {
    fn drop(&mut self) {
        self.close();
    }
}
