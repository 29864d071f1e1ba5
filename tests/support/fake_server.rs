//! A pixelflut server over loopback TCP, backed by an in-memory grid.
//!
//! Serves a single client connection. Set commands update the grid, get
//! commands are answered from it, and anything else is ignored.

use pixelflut_client::canvas::Coord;
use pixelflut_client::color::Rgb;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub struct FakeCanvasServer {
    pub addr: SocketAddr,
    width: u32,
    pixels: Arc<Mutex<Vec<Rgb>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeCanvasServer {
    pub fn spawn(width: u32, height: u32, paint: impl Fn(Coord) -> Rgb) -> Self {
        Self::spawn_with_greeting(width, height, &[], paint)
    }

    /// Like `spawn`, but sends `greeting` to the client unasked right after
    /// accepting it.
    pub fn spawn_with_greeting(
        width: u32,
        height: u32,
        greeting: &[&str],
        paint: impl Fn(Coord) -> Rgb,
    ) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(paint(Coord::new(x, y)));
            }
        }
        let pixels = Arc::new(Mutex::new(pixels));

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");
        let grid = Arc::clone(&pixels);
        let greeting: Vec<String> = greeting.iter().map(|line| line.to_string()).collect();
        let handle = thread::Builder::new()
            .name("fake-canvas".to_string())
            .spawn(move || {
                let Ok((stream, _)) = listener.accept() else { return };
                let mut writer = stream.try_clone().expect("clone fake server stream");
                for line in &greeting {
                    if writeln!(writer, "{}", line).is_err() {
                        return;
                    }
                }
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    let fields: Vec<&str> = line.split_whitespace().collect();
                    if fields.first() != Some(&"PX") || fields.len() < 3 {
                        continue;
                    }
                    let (Ok(x), Ok(y)) = (fields[1].parse::<u32>(), fields[2].parse::<u32>()) else {
                        continue;
                    };
                    if x >= width || y >= height {
                        continue;
                    }
                    let idx = (y * width + x) as usize;
                    let mut grid = grid.lock().unwrap();
                    match fields.get(3) {
                        Some(color) => {
                            if let Ok(color) = Rgb::from_hex(color) {
                                grid[idx] = color;
                            }
                        }
                        None => {
                            if writeln!(writer, "PX {} {} {}", x, y, grid[idx]).is_err() {
                                break;
                            }
                        }
                    }
                }
            })
            .expect("spawn fake server");

        FakeCanvasServer {
            addr,
            width,
            pixels,
            handle: Some(handle),
        }
    }

    pub fn pixel(&self, coord: Coord) -> Rgb {
        self.pixels.lock().unwrap()[(coord.y * self.width + coord.x) as usize]
    }

    /// Waits until the client has disconnected and every command is applied.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake server panicked");
        }
    }
}
