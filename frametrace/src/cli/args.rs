//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "frametrace",
    about = "Replay a trace recording and check compositor frame stabilization",
    after_help = "\
EXAMPLES:
    frametrace capture.json                      Replay in real time, default settings
    frametrace capture.json --speed 0 --json     Replay unpaced, print a JSON report
    frametrace capture.json --refresh-rate 75    Judge frames against a 75 Hz display"
)]
pub struct Args {
    /// Recording to replay (JSON, see `cargo xtask synth`)
    #[arg(value_name = "RECORDING")]
    pub recording: PathBuf,

    /// Load stabilization settings from a JSON file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Consecutive valid frames required
    #[arg(short = 'n', long)]
    pub target_frames: Option<u32>,

    /// Display refresh rate in Hz (sets the expected VSync period)
    #[arg(long, value_name = "HZ")]
    pub refresh_rate: Option<f64>,

    /// Give up after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Events captured between consumer wake-ups
    #[arg(long)]
    pub signal_threshold: Option<usize>,

    /// Replay speed relative to recorded timestamps (0 = as fast as possible)
    #[arg(long, default_value = "1.0")]
    pub speed: f64,

    /// Print a JSON report instead of per-window lines
    #[arg(long)]
    pub json: bool,

    /// Only print the final verdict
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,
}
