//! Demonstration run for a lightbox controller
//!
//! Cycles all outputs through the primary colors, fades them, blinks and
//! cuts random outputs, then keeps fading outputs to random colors until
//! interrupted.
//!
//! Usage: `lightbox-demo [text|binary]`

use std::process::ExitCode;
use std::thread::sleep;
use std::time::{Duration, Instant};

use lightbox::color::{BLACK, Rgb, random_color};
use lightbox::config::DEFAULT_CANDIDATES;
use lightbox::{CommandOptions, Controller, ControllerConfig, ProtocolKind};
use rand::Rng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
const GREEN: Rgb = Rgb { r: 0, g: 255, b: 0 };
const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let kind = match std::env::args().nth(1) {
        Some(name) => match ProtocolKind::parse_from_str(&name) {
            Some(kind) => kind,
            None => {
                error!(protocol = %name, "unknown protocol");
                return ExitCode::FAILURE;
            }
        },
        None => ProtocolKind::default(),
    };

    info!(protocol = kind.as_str(), "starting demonstration");
    let controller =
        match Controller::connect_first(&DEFAULT_CANDIDATES, kind, ControllerConfig::default()) {
            Ok(controller) => controller,
            Err(err) => {
                error!(error = %err, "could not find a suitable device");
                return ExitCode::FAILURE;
            }
        };

    match run(&controller) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "demonstration aborted");
            ExitCode::FAILURE
        }
    }
}

/// Snap every output to black and wait a moment
fn pause(controller: &Controller) -> lightbox::Result<()> {
    sleep(Duration::from_millis(200));
    for index in 0..controller.output_count() {
        controller
            .output(index)?
            .lock()
            .constant(&CommandOptions::color(BLACK))?;
    }
    sleep(Duration::from_secs(1));
    Ok(())
}

fn fade_all(controller: &Controller, color: Rgb, steps: u32) -> lightbox::Result<()> {
    let options = CommandOptions::color(color).with_opacity(1.0).with_steps(steps);
    for index in 0..controller.output_count() {
        controller.output(index)?.lock().fade(&options)?;
    }
    Ok(())
}

fn run(controller: &Controller) -> lightbox::Result<()> {
    info!("switching all outputs through red, green and blue");
    for _ in 0..3 {
        for color in [RED, BLACK, GREEN, BLACK, BLUE, BLACK] {
            controller.set_all(color)?;
            sleep(Duration::from_millis(400));
        }
    }

    info!("fading all outputs through red, green and blue");
    pause(controller)?;
    for color in [RED, GREEN, BLUE, BLACK] {
        fade_all(controller, color, 40)?;
        sleep(Duration::from_millis(2200));
    }

    info!("double-blinking random outputs");
    pause(controller)?;
    for _ in 0..30 {
        let options = CommandOptions::color(random_color(true)).with_count(2);
        controller.random_output()?.lock().blink(&options)?;
        sleep(Duration::from_millis(350));
    }

    info!("instantly changing colors on random outputs");
    pause(controller)?;
    let begin = Instant::now();
    for _ in 0..1000 {
        let options = CommandOptions::color(random_color(true));
        controller.random_output()?.lock().constant(&options)?;
        sleep(Duration::from_millis(10));
    }
    info!(elapsed = ?begin.elapsed(), "1000 instant color changes done");

    info!("fading outputs to random colors in turn, enjoy your blinky lights");
    pause(controller)?;
    let mut rng = rand::thread_rng();
    loop {
        let options = CommandOptions::color(random_color(true)).with_steps(40);
        controller.next_output()?.lock().fade(&options)?;
        sleep(Duration::from_millis(500));
        if rng.gen_range(0..50) == 0 {
            sleep(Duration::from_secs(1));
            fade_all(controller, random_color(true), 80)?;
            sleep(Duration::from_secs(4));
        }
    }
}
