//! # frametrace - Replay Entry Point
//!
//! Replays a JSON recording through the full capture path (listener, ring,
//! partitioner) and reports whether the frames stabilize.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use frametrace::analysis::{FrameStabilizer, FrameVerdict, VSyncWindow};
use frametrace::capture::Recording;
use frametrace::cli::Args;
use frametrace::listener::FrameListener;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_UNSTABLE: i32 = 3;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_UNSTABLE,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[derive(Debug, Serialize)]
struct WindowSummary {
    frame_index: i64,
    next_frame_index: i64,
    v1: f64,
    v2: f64,
    interval_ms: f64,
    events: usize,
    verdict: &'static str,
}

impl WindowSummary {
    fn new(window: &VSyncWindow<'_>, verdict: FrameVerdict) -> Self {
        Self {
            frame_index: window.frame_index,
            next_frame_index: window.next_frame_index,
            v1: window.v1,
            v2: window.v2,
            interval_ms: window.target_interval() * 1e3,
            events: window.events.len(),
            verdict: match verdict {
                FrameVerdict::Valid => "valid",
                FrameVerdict::Overrun => "overrun",
                FrameVerdict::FrameGap => "frame-gap",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    recording: String,
    records: usize,
    stable: bool,
    streak: u32,
    target_frames: u32,
    windows: Vec<WindowSummary>,
    errors: Vec<String>,
}

fn run() -> Result<bool> {
    let args = Args::parse();
    let config = args
        .stabilization_config()
        .context("Invalid stabilization settings")?;

    let recording = Recording::load(&args.recording)
        .with_context(|| format!("Failed to load recording {}", args.recording.display()))?;
    let records = recording.len();
    info!("Loaded {records} records from {}", args.recording.display());

    let source = recording.into_source().paced(args.speed);
    let listener = FrameListener::start(source, &config.listener)
        .context("Failed to start listener")?;

    let mut windows = Vec::new();
    let mut stabilizer = FrameStabilizer::from_config(&config);
    let print_lines = !args.json && !args.quiet;
    let stable = stabilizer.run(&listener, Duration::from_millis(config.timeout_ms), |window, verdict| {
        let summary = WindowSummary::new(window, verdict);
        if print_lines {
            println!(
                "frame {:>6}  {:>8.3} ms  {:>4} events  {}",
                summary.frame_index, summary.interval_ms, summary.events, summary.verdict
            );
        }
        windows.push(summary);
    });
    let errors: Vec<String> = listener
        .get_and_clear_errors()
        .iter()
        .map(ToString::to_string)
        .collect();
    drop(listener);

    if args.json {
        let report = Report {
            recording: args.recording.display().to_string(),
            records,
            stable,
            streak: stabilizer.streak(),
            target_frames: config.target_frames,
            windows,
            errors,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for error in &errors {
            eprintln!("warning: {error}");
        }
        if stable {
            println!(
                "stable: {} consecutive valid frames after {} windows",
                stabilizer.streak(),
                stabilizer.frames_seen()
            );
        } else {
            println!(
                "not stable: streak {} of {} after {} windows",
                stabilizer.streak(),
                config.target_frames,
                stabilizer.frames_seen()
            );
        }
    }
    Ok(stable)
}
