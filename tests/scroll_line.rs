// tests/scroll_line.rs

mod support;

use pixelflut_client::cancel::CancelToken;
use pixelflut_client::canvas::{CanvasLink, Coord, TcpCanvasLink};
use pixelflut_client::color::Rgb;
use pixelflut_client::config::{CanvasConfig, Config, ScrollConfig, ServerConfig};
use pixelflut_client::scroller::{ScrollDriver, ScrollLine};
use pixelflut_client::shapes::{self, Rect};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use support::fake_server::FakeCanvasServer;
use test_log::test;

const WIDTH: u32 = 32;
const HEIGHT: u32 = 16;

fn background(coord: Coord) -> Rgb {
    Rgb::from_channels((coord.x * 8) as u8, (coord.y * 16) as u8, 0x40)
}

fn connect(server: &FakeCanvasServer) -> Arc<TcpCanvasLink> {
    let config = ServerConfig {
        host: server.addr.ip().to_string(),
        port: server.addr.port(),
        ..ServerConfig::default()
    };
    Arc::new(TcpCanvasLink::connect(&config).expect("connect to fake server"))
}

fn canvas() -> CanvasConfig {
    CanvasConfig {
        width: WIDTH,
        height: HEIGHT,
    }
}

#[test]
fn test_scrolling_line_leaves_the_canvas_as_it_found_it() {
    let mut server = FakeCanvasServer::spawn(WIDTH, HEIGHT, background);
    let link = connect(&server);

    // Frames are far enough apart for each wave to finish before the next
    // frame reads the canvas.
    let scroll = ScrollConfig {
        band_width: 4,
        worker_count: 2,
        restore_base_delay_ms: 10,
        restore_worker_skew_ms: 5,
        frame_interval_ms: 250,
        max_frames: Some(3),
        draw_color: Some(Rgb::from_u32(0xff00ff)),
    };
    let line = ScrollLine::start(link.clone(), canvas(), &scroll, CancelToken::new())
        .expect("start scrolling line");
    assert_eq!(line.join().expect("scrolling line failed"), 3);

    link.close();
    server.join();
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let coord = Coord::new(x, y);
            assert_eq!(server.pixel(coord), background(coord), "pixel {}", coord);
        }
    }
}

#[test]
fn test_scrolling_line_stops_promptly_when_cancelled() {
    let mut server = FakeCanvasServer::spawn(WIDTH, HEIGHT, background);
    let link = connect(&server);
    let scroll = ScrollConfig {
        band_width: 2,
        draw_color: Some(Rgb::WHITE),
        ..ScrollConfig::default()
    };
    let line = ScrollLine::start(link.clone(), canvas(), &scroll, CancelToken::new())
        .expect("start scrolling line");

    thread::sleep(Duration::from_millis(150));
    let start = Instant::now();
    line.cancel();
    let frames = line.join().expect("scrolling line failed");

    assert!(frames >= 1);
    // Default waves wait at least 500 ms; cancelling must not wait them out.
    assert!(start.elapsed() < Duration::from_millis(450), "{:?}", start.elapsed());
    link.close();
    server.join();
}

#[test]
fn test_stray_answer_does_not_blacken_the_band() {
    let mut server = FakeCanvasServer::spawn_with_greeting(8, 4, &["PX 7 3 abcdef"], |_| {
        Rgb::from_u32(0x123456)
    });
    let link = connect(&server);
    let scroll = ScrollConfig {
        band_width: 2,
        worker_count: 1,
        restore_base_delay_ms: 0,
        restore_worker_skew_ms: 0,
        frame_interval_ms: 0,
        max_frames: None,
        draw_color: Some(Rgb::WHITE),
    };
    let mut driver = ScrollDriver::new(
        link.clone(),
        CanvasConfig { width: 8, height: 4 },
        &scroll,
        CancelToken::new(),
    )
    .expect("build driver");

    let report = driver.run_frame().expect("run frame");
    assert_eq!(report.unreadable, 0);
    driver.finish().expect("restore band");
    link.close();
    server.join();

    for y in 0..4 {
        for x in 0..2 {
            assert_eq!(server.pixel(Coord::new(x, y)), Rgb::from_u32(0x123456), "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn test_shapes_reach_the_server() {
    let mut server = FakeCanvasServer::spawn(WIDTH, HEIGHT, |_| Rgb::BLACK);
    let link = connect(&server);

    shapes::fill_rect(&*link, Rect::new(1, 1, 3, 3), Rgb::WHITE).expect("fill rect");
    shapes::gradient_rect(&*link, Rect::new(10, 0, 10, 10)).expect("gradient");
    link.close();
    server.join();

    assert_eq!(server.pixel(Coord::new(3, 3)), Rgb::WHITE);
    assert_eq!(server.pixel(Coord::new(4, 4)), Rgb::BLACK);
    assert_eq!(server.pixel(Coord::new(19, 0)), Rgb::from_u32(0xe50000));
}

#[test]
fn test_default_config_targets_the_full_hd_canvas() {
    let config = Config::default();
    assert_eq!((config.canvas.width, config.canvas.height), (1920, 1080));
    assert_eq!(config.scroll.worker_count, 10);
}
