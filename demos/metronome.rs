//! Metronome with a text pulse indicator, then a retuned tone
//!
//! Run with: cargo run --example metronome --features cpal_sink

use std::io::Write;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use taktgeber::{CpalOutput, Frame, Mode, PlaybackController, RenderLoop};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let mut controller = PlaybackController::new(CpalOutput::default_device());
    controller.set_rate(100.0)?;
    controller.start(Mode::Metronome)?;

    println!("Metronome at {} BPM", controller.rate());
    let render_loop = RenderLoop::new(60);
    draw_for(&render_loop, &mut controller, Duration::from_secs(6));

    controller.set_frequency(440.0)?;
    controller.start(Mode::Tone)?;
    println!("\nTone at {} Hz", controller.frequency());
    draw_for(&render_loop, &mut controller, Duration::from_secs(2));

    controller.set_frequency(660.0)?;
    println!("\nTone at {} Hz", controller.frequency());
    draw_for(&render_loop, &mut controller, Duration::from_secs(2));

    controller.stop();
    println!();
    Ok(())
}

fn draw_for(render_loop: &RenderLoop, controller: &mut PlaybackController, duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut stdout = std::io::stdout();

    render_loop.run(controller, |frame| {
        let line = match frame {
            Frame::Pulse { decay } => "#".repeat((decay * 40.0) as usize),
            Frame::Waveform { samples } => {
                let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                "~".repeat((peak * 40.0) as usize)
            }
        };
        let _ = write!(stdout, "\r{line:<40}");
        let _ = stdout.flush();

        if Instant::now() >= deadline {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
}
