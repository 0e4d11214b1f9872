//! Synthetic VSync streams.
//!
//! Builds the raw records a compositor would emit: one `VSync` per display
//! refresh, optionally with skipped frame indices, stretched intervals and
//! distortion events between refreshes. Used by tests and `cargo xtask synth`.

use frametrace_common::{DistortionBegin, DistortionEnd, TracePayload, VSync};

use super::channel::RecordSender;
use super::clock::MonotonicClock;
use super::recording::{OwnedRecord, Recording};

/// Builder for a synthetic VSync stream.
#[derive(Debug, Clone)]
pub struct VSyncStream {
    period: f64,
    frames: u32,
    first_frame: u32,
    start_time: f64,
    tick_frequency: u64,
    skipped: Vec<u32>,
    stretched: Vec<(u32, f64)>,
    fillers_per_frame: u32,
}

impl VSyncStream {
    /// `frames` VSyncs spaced `period` seconds apart, frame indices from 0.
    #[must_use]
    pub fn new(period: f64, frames: u32) -> Self {
        Self {
            period,
            frames,
            first_frame: 0,
            start_time: 1.0,
            tick_frequency: MonotonicClock::FREQUENCY,
            skipped: Vec::new(),
            stretched: Vec::new(),
            fillers_per_frame: 0,
        }
    }

    #[must_use]
    pub fn first_frame(mut self, frame_index: u32) -> Self {
        self.first_frame = frame_index;
        self
    }

    /// Time of the first VSync, in seconds.
    #[must_use]
    pub fn start_time(mut self, seconds: f64) -> Self {
        self.start_time = seconds;
        self
    }

    #[must_use]
    pub fn tick_frequency(mut self, tick_frequency: u64) -> Self {
        self.tick_frequency = tick_frequency;
        self
    }

    /// Never emit `frame_index`; the stream jumps from `n - 1` to `n + 1`.
    #[must_use]
    pub fn skip_frame(mut self, frame_index: u32) -> Self {
        self.skipped.push(frame_index);
        self
    }

    /// Make the interval ending at `frame_index` last `factor` periods.
    #[must_use]
    pub fn stretch_frame(mut self, frame_index: u32, factor: f64) -> Self {
        self.stretched.push((frame_index, factor));
        self
    }

    /// Emit `count` distortion events inside every interval.
    #[must_use]
    pub fn fillers_per_frame(mut self, count: u32) -> Self {
        self.fillers_per_frame = count;
        self
    }

    /// `(time, frame_index)` of every VSync in the stream.
    ///
    /// The stream ends early if the frame index would pass `u32::MAX`.
    #[must_use]
    pub fn vsyncs(&self) -> Vec<(f64, u32)> {
        let mut out = Vec::with_capacity(self.frames as usize);
        let mut time = self.start_time;
        for frame in self.first_frame..=u32::MAX {
            if out.len() >= self.frames as usize {
                break;
            }
            if self.skipped.contains(&frame) {
                continue;
            }
            if !out.is_empty() {
                let factor = self
                    .stretched
                    .iter()
                    .find(|(f, _)| *f == frame)
                    .map_or(1.0, |(_, factor)| *factor);
                time += self.period * factor;
            }
            out.push((time, frame));
        }
        out
    }

    /// Raw records in delivery order.
    #[must_use]
    pub fn records(&self) -> Vec<OwnedRecord> {
        let mut records = Vec::new();
        let mut previous: Option<f64> = None;
        for (time, frame) in self.vsyncs() {
            if let Some(begin) = previous {
                let step = (time - begin) / f64::from(self.fillers_per_frame + 1);
                for k in 0..self.fillers_per_frame {
                    let at = begin + step * f64::from(k + 1);
                    let record = if k % 2 == 0 {
                        self.record(at, &DistortionBegin { id: k, frame_index: frame })
                    } else {
                        self.record(at, &DistortionEnd { id: k, frame_index: frame })
                    };
                    records.push(record);
                }
            }
            let vsync = VSync {
                vsync_time: time,
                frame_index: frame,
                tw_gpu_end_time: time + self.period * 0.5,
            };
            records.push(self.record(time, &vsync));
            previous = Some(time);
        }
        records
    }

    #[must_use]
    pub fn recording(&self) -> Recording {
        Recording { tick_frequency: self.tick_frequency, records: self.records() }
    }

    /// Queue every record on `sender`. Returns how many were accepted.
    pub fn send_to(&self, sender: &RecordSender) -> usize {
        self.records().into_iter().take_while(|r| sender.send(r.clone())).count()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn record<T: TracePayload>(&self, seconds: f64, payload: &T) -> OwnedRecord {
        let ticks = (seconds * self.tick_frequency as f64).round() as i64;
        OwnedRecord::from_payload(ticks, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_stream() {
        let stream = VSyncStream::new(0.01, 4);
        let vsyncs = stream.vsyncs();
        assert_eq!(vsyncs.iter().map(|v| v.1).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!((vsyncs[3].0 - 1.03).abs() < 1e-9);
    }

    #[test]
    fn test_skip_keeps_time_spacing() {
        let vsyncs = VSyncStream::new(0.01, 4).skip_frame(2).vsyncs();
        assert_eq!(vsyncs.iter().map(|v| v.1).collect::<Vec<_>>(), vec![0, 1, 3, 4]);
        assert!((vsyncs[2].0 - vsyncs[1].0 - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_stretch_lengthens_interval() {
        let vsyncs = VSyncStream::new(0.01, 3).stretch_frame(1, 2.0).vsyncs();
        assert!((vsyncs[1].0 - vsyncs[0].0 - 0.02).abs() < 1e-9);
        assert!((vsyncs[2].0 - vsyncs[1].0 - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_frame_index_stops_at_u32_max() {
        let vsyncs = VSyncStream::new(0.01, 5).first_frame(u32::MAX - 1).vsyncs();
        assert_eq!(vsyncs.iter().map(|v| v.1).collect::<Vec<_>>(), vec![u32::MAX - 1, u32::MAX]);

        let skipped = VSyncStream::new(0.01, 2)
            .first_frame(u32::MAX - 1)
            .skip_frame(u32::MAX - 1)
            .skip_frame(u32::MAX)
            .vsyncs();
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_fillers_sit_between_vsyncs() {
        let records = VSyncStream::new(0.01, 3).fillers_per_frame(2).records();
        // 3 vsyncs + 2 fillers in each of the 2 intervals
        assert_eq!(records.len(), 7);
        let ids: Vec<u16> = records.iter().map(|r| r.event_id).collect();
        assert_eq!(ids, vec![5, 1, 2, 5, 1, 2, 5]);
        assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }
}
