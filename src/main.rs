// src/main.rs

use pixelflut_client::{
    cancel::CancelToken,
    canvas::{CanvasLink, TcpCanvasLink},
    color::Rgb,
    config::CONFIG,
    scroller::ScrollLine,
    shapes,
};

use anyhow::{bail, Context, Result};
use log::{error, info};
use nix::sys::signal::{SigSet, Signal};
use std::sync::Arc;
use std::thread;

/// What the client should draw, picked from the first command-line argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Scrolling line with restore workers (default).
    Line,
    Rect,
    Gradient,
    Jump,
    Flood,
}

impl Action {
    fn from_arg(arg: Option<&str>) -> Result<Self> {
        Ok(match arg {
            None | Some("line") => Action::Line,
            Some("rect") => Action::Rect,
            Some("gradient") => Action::Gradient,
            Some("jump") => Action::Jump,
            Some("flood") => Action::Flood,
            Some(other) => bail!(
                "Unknown action '{}'. Expected one of: line, rect, gradient, jump, flood",
                other
            ),
        })
    }

    /// Whether the action runs until interrupted.
    fn runs_until_cancelled(self) -> bool {
        matches!(self, Action::Line | Action::Jump)
    }
}

/// Main entry point for the pixelflut client.
fn main() -> Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let arg = std::env::args().nth(1);
    let action = Action::from_arg(arg.as_deref())?;
    info!("Starting pixelflut client ({:?})...", action);

    // --- Configuration ---
    let config = &*CONFIG;
    info!(
        "Target {}:{}, canvas {}x{}",
        config.server.host, config.server.port, config.canvas.width, config.canvas.height
    );

    // --- Cancellation ---
    // Block SIGINT/SIGTERM before any other thread exists so every thread
    // inherits the mask and only the watcher receives them. One-shot fills
    // keep the default handling so Ctrl-C still kills them.
    let cancel = CancelToken::new();
    if action.runs_until_cancelled() {
        spawn_signal_watcher(cancel.clone())?;
    }

    // --- Connection ---
    let link = Arc::new(
        TcpCanvasLink::connect(&config.server).context("Failed to connect to the canvas server")?,
    );

    let result = run(action, Arc::clone(&link), cancel);

    // --- Cleanup ---
    link.close();
    match &result {
        Ok(()) => info!("Pixelflut client exited successfully."),
        Err(e) => error!("Pixelflut client stopped: {:#}", e),
    }
    result
}

fn run(action: Action, link: Arc<TcpCanvasLink>, cancel: CancelToken) -> Result<()> {
    let config = &*CONFIG;
    let mut rng = rand::thread_rng();

    match action {
        Action::Line => {
            let line = ScrollLine::start(link.clone(), config.canvas, &config.scroll, cancel)?;
            let frames = line.join()?;
            info!("Scrolling line drew {} frames.", frames);
        }
        Action::Rect => {
            let color = Rgb::random(&mut rng);
            shapes::fill_rect(&*link, config.shapes.rect.into(), color)
                .context("Failed to draw rectangle")?;
        }
        Action::Gradient => {
            shapes::gradient_rect(&*link, config.shapes.rect.into())
                .context("Failed to draw gradient")?;
        }
        Action::Jump => {
            let drawn = shapes::jumping_rect(&*link, config.canvas, &config.shapes.jump, &mut rng, &cancel)
                .context("Jumping rectangle stopped")?;
            info!("Drew {} jumping rectangles.", drawn);
        }
        Action::Flood => {
            let color = Rgb::random(&mut rng);
            shapes::flood(&*link, config.canvas, color).context("Failed to flood the canvas")?;
        }
    }
    link.flush().context("Failed to flush pending commands")?;
    Ok(())
}

/// Blocks SIGINT and SIGTERM on the calling thread and waits for them on a
/// dedicated thread, which cancels `cancel` when one arrives.
fn spawn_signal_watcher(cancel: CancelToken) -> Result<()> {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals
        .thread_block()
        .context("Failed to block termination signals")?;

    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || match signals.wait() {
            Ok(signal) => {
                info!("Received {:?}, stopping.", signal);
                cancel.cancel();
            }
            Err(e) => error!("Waiting for termination signals failed: {}", e),
        })
        .context("Failed to spawn signal watcher thread")?;
    Ok(())
}
