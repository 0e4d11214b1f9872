//! Stabilization driver against live channel-fed listeners.

use std::time::{Duration, Instant};

use frametrace::analysis::{FrameStabilizer, FrameVerdict, StabilizationState};
use frametrace::api;
use frametrace::capture::{ChannelSource, VSyncStream};
use frametrace::config::{ListenerConfig, StabilizationConfig};
use frametrace::listener::FrameListener;

const PERIOD: f64 = 1.0 / 90.0;
const TIMEOUT: Duration = Duration::from_secs(5);

fn run_stream(stream: &VSyncStream, target_frames: u32) -> (bool, FrameStabilizer, Vec<(i64, FrameVerdict)>) {
    let (source, sender) = ChannelSource::new();
    let listener = FrameListener::start(source, &ListenerConfig::default()).unwrap();
    stream.send_to(&sender);
    drop(sender);

    let mut stabilizer = FrameStabilizer::new(target_frames, PERIOD);
    let mut verdicts = Vec::new();
    let stable = stabilizer.run(&listener, TIMEOUT, |window, verdict| {
        verdicts.push((window.frame_index, verdict));
    });
    (stable, stabilizer, verdicts)
}

#[test]
fn test_steady_stream_stabilizes() {
    let (stable, stabilizer, verdicts) = run_stream(&VSyncStream::new(PERIOD, 30).fillers_per_frame(4), 10);

    assert!(stable);
    assert_eq!(stabilizer.state(), StabilizationState::Stable);
    assert!(stabilizer.streak() >= 10);
    assert!(verdicts.iter().all(|(_, v)| v.is_valid()));
    // First analysed window targets the second interval
    assert_eq!(verdicts[0].0, 2);
}

#[test]
fn test_skipped_frame_resets_streak() {
    let stream = VSyncStream::new(PERIOD, 14).skip_frame(5);
    let (stable, stabilizer, verdicts) = run_stream(&stream, 10);

    assert!(!stable);
    assert_eq!(stabilizer.state(), StabilizationState::TimedOut);
    assert!(verdicts.contains(&(6, FrameVerdict::FrameGap)));
    assert_eq!(stabilizer.streak(), 7);
}

#[test]
fn test_long_intervals_count_as_overruns() {
    let mut stream = VSyncStream::new(PERIOD, 30);
    for frame in (5..30).step_by(5) {
        stream = stream.stretch_frame(frame, 2.0);
    }
    let (stable, _, verdicts) = run_stream(&stream, 10);

    assert!(!stable);
    let overruns: Vec<i64> = verdicts
        .iter()
        .filter(|(_, v)| *v == FrameVerdict::Overrun)
        .map(|(f, _)| *f)
        .collect();
    assert_eq!(overruns, vec![5, 10, 15, 20, 25]);
}

#[test]
fn test_silent_source_gives_up_after_budget() {
    let (source, _sender) = ChannelSource::new();
    let listener = FrameListener::start(source, &ListenerConfig::default()).unwrap();

    let started = Instant::now();
    let mut stabilizer = FrameStabilizer::new(10, PERIOD);
    let stable = stabilizer.run(&listener, Duration::from_millis(100), |_, _| {});

    assert!(!stable);
    assert_eq!(stabilizer.frames_seen(), 0);
    assert!(started.elapsed() < TIMEOUT);
}

#[test]
fn test_live_source_times_out_after_skipped_frame() {
    let (source, sender) = ChannelSource::new();
    let listener = FrameListener::start(source, &ListenerConfig::default()).unwrap();
    // Sender stays alive: the stream never ends, only the budget can
    VSyncStream::new(PERIOD, 14).skip_frame(5).send_to(&sender);

    let budget = Duration::from_millis(300);
    let started = Instant::now();
    let mut stabilizer = FrameStabilizer::new(10, PERIOD);
    let stable = stabilizer.run(&listener, budget, |_, _| {});

    assert!(!stable);
    assert!(!listener.capture_terminated());
    assert_eq!(stabilizer.streak(), 7);
    assert_eq!(stabilizer.state(), StabilizationState::TimedOut);
    assert!(started.elapsed() >= budget);
    assert!(started.elapsed() < TIMEOUT);
    drop(sender);
}

#[test]
fn test_flat_entry_point() {
    let (source, sender) = ChannelSource::new();
    VSyncStream::new(PERIOD, 40).fillers_per_frame(2).send_to(&sender);
    drop(sender);

    assert!(api::wait_for_frame_stabilization(source, 10, PERIOD, 5_000, "StabilizeTest"));
}

#[test]
fn test_start_failure_reports_unstable() {
    let (source, _sender) = ChannelSource::new();
    let config = StabilizationConfig::default();
    let source = source.fail_open("access denied");

    assert!(!frametrace::analysis::wait_for_stabilization(source, &config));
}
