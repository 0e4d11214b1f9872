use anyhow::{Context, Result};
use clap::Parser;
use frametrace::capture::VSyncStream;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Write a synthetic VSync recording for `frametrace` to replay
    Synth {
        /// Output file
        #[arg(short, long, default_value = "synthetic.json")]
        output: PathBuf,
        /// Number of VSyncs
        #[arg(long, default_value = "120")]
        frames: u32,
        /// Display refresh rate in Hz
        #[arg(long, default_value = "90")]
        refresh_rate: f64,
        /// Frame indices to drop (repeatable)
        #[arg(long = "skip", value_name = "FRAME")]
        skip: Vec<u32>,
        /// Frame indices whose interval runs two periods long (repeatable)
        #[arg(long = "stall", value_name = "FRAME")]
        stall: Vec<u32>,
        /// Distortion events per interval
        #[arg(long, default_value = "4")]
        fillers: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Cmd::Synth { output, frames, refresh_rate, skip, stall, fillers } => {
            synth(&output, frames, refresh_rate, &skip, &stall, fillers)?;
        }
    }

    Ok(())
}

fn synth(
    output: &Path,
    frames: u32,
    refresh_rate: f64,
    skip: &[u32],
    stall: &[u32],
    fillers: u32,
) -> Result<()> {
    if !(refresh_rate.is_finite() && refresh_rate > 0.0) {
        anyhow::bail!("--refresh-rate must be positive, got {refresh_rate}");
    }

    let mut stream = VSyncStream::new(1.0 / refresh_rate, frames).fillers_per_frame(fillers);
    for &frame in skip {
        stream = stream.skip_frame(frame);
    }
    for &frame in stall {
        stream = stream.stretch_frame(frame, 2.0);
    }

    let recording = stream.recording();
    info!("Generated {} records", recording.len());
    recording
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Synthetic recording written");
    println!("  Output: {}", output.display());
    println!("  VSyncs: {frames} at {refresh_rate} Hz");
    println!("  Records: {}", recording.len());

    Ok(())
}
