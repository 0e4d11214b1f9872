//! VSync partitioning.
//!
//! Splits a drained event stream into analysis windows spanning the last
//! three display refresh intervals:
//!
//! ```text
//!   v0          v1          v2          v3
//!   │  oldest   │  target   │  newest   │
//!   ├───────────┼───────────┼───────────┤
//!   └──────── window events in (v0, v3] ┘
//! ```
//!
//! Each VSync closes an interval `(previous vsync, this vsync]` tagged with
//! the VSync's frame index. Once three intervals are known, every further
//! VSync emits a [`VSyncWindow`] whose *target* is the middle interval.
//!
//! Non-VSync events are kept in a bounded store (oldest overwritten) so they
//! can be attached to the windows that cover them. Membership is evaluated
//! over the whole store, so events delivered slightly out of order are still
//! assigned by timestamp.

use frametrace_common::VSync;
use log::{debug, warn};

use crate::event::Event;
use crate::ring::OverwriteRing;

/// Non-VSync events retained for window assembly.
pub const STORED_EVENTS: usize = 2048;

/// Intervals needed before a window can be analysed.
pub const PAIRS_TO_ANALYZE: usize = 3;

/// One display refresh interval, closed by the VSync carrying `frame_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VSyncPair {
    pub begin: f64,
    pub end: f64,
    /// `-1` marks an unfilled slot
    pub frame_index: i64,
}

impl Default for VSyncPair {
    fn default() -> Self {
        Self { begin: 0.0, end: 0.0, frame_index: -1 }
    }
}

impl VSyncPair {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.frame_index != -1
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.begin
    }
}

/// Timing and events for one analysed interval.
#[derive(Debug, Clone, Copy)]
pub struct VSyncWindow<'a> {
    pub v0: f64,
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    /// Frame index of the target interval `(v1, v2]`
    pub frame_index: i64,
    /// Frame index of the newest interval `(v2, v3]`
    pub next_frame_index: i64,
    /// Stored events with time in `(v0, v3]`, in arrival order
    pub events: &'a [Event],
}

impl VSyncWindow<'_> {
    /// Length of the target interval.
    #[must_use]
    pub fn target_interval(&self) -> f64 {
        self.v2 - self.v1
    }
}

/// Groups events into three-interval VSync windows.
#[derive(Debug, Clone)]
pub struct VSyncPartitioner {
    stored: OverwriteRing<Event>,
    /// Oldest at index 0, newest at index 2
    pairs: OverwriteRing<VSyncPair>,
    last_vsync: Option<f64>,
    last_analyzed: Option<i64>,
    window_events: Vec<Event>,
    skipped_frames: u64,
    windows_emitted: u64,
}

impl Default for VSyncPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl VSyncPartitioner {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(STORED_EVENTS)
    }

    /// Partitioner retaining up to `stored_events` non-VSync events.
    ///
    /// # Panics
    ///
    /// Panics if `stored_events` is 0.
    #[must_use]
    pub fn with_capacity(stored_events: usize) -> Self {
        Self {
            stored: OverwriteRing::with_capacity(stored_events),
            pairs: OverwriteRing::with_capacity(PAIRS_TO_ANALYZE),
            last_vsync: None,
            last_analyzed: None,
            window_events: Vec::new(),
            skipped_frames: 0,
            windows_emitted: 0,
        }
    }

    /// Feed a batch of events in delivery order, calling `on_window` for
    /// every window completed by a VSync in the batch.
    pub fn handle_events<F>(&mut self, events: &[Event], mut on_window: F)
    where
        F: FnMut(&VSyncWindow<'_>),
    {
        for event in events {
            if let Some(vsync) = event.payload::<VSync>() {
                self.handle_vsync(vsync.vsync_time, vsync.frame_index, &mut on_window);
            } else if event.is_valid() {
                self.stored.push(*event);
            }
        }
    }

    fn handle_vsync<F>(&mut self, time: f64, frame_index: u32, on_window: &mut F)
    where
        F: FnMut(&VSyncWindow<'_>),
    {
        // The first VSync only opens the first interval
        let Some(previous) = self.last_vsync.replace(time) else {
            return;
        };

        self.pairs.push(VSyncPair { begin: previous, end: time, frame_index: i64::from(frame_index) });
        if self.pairs.len() < PAIRS_TO_ANALYZE {
            return;
        }
        let (Some(&oldest), Some(&target), Some(&newest)) =
            (self.pairs.get(0), self.pairs.get(1), self.pairs.get(2))
        else {
            return;
        };

        if let Some(last) = self.last_analyzed {
            let gap = target.frame_index - last;
            if gap > 1 {
                warn!("Skipped frame analysis for {gap} frames ({last} -> {})", target.frame_index);
                self.skipped_frames += gap.unsigned_abs() - 1;
            }
        }
        self.last_analyzed = Some(target.frame_index);

        self.window_events.clear();
        self.window_events.extend(
            self.stored
                .iter()
                .filter(|e| e.time > oldest.begin && e.time <= newest.end)
                .copied(),
        );

        let window = VSyncWindow {
            v0: oldest.begin,
            v1: target.begin,
            v2: newest.begin,
            v3: newest.end,
            frame_index: target.frame_index,
            next_frame_index: newest.frame_index,
            events: &self.window_events,
        };
        self.windows_emitted += 1;
        debug!(
            "Window for frame {} ({:.3} ms, {} events)",
            window.frame_index,
            window.target_interval() * 1e3,
            window.events.len()
        );
        on_window(&window);
    }

    /// Frames whose analysis was skipped because the target frame index
    /// jumped by more than one.
    #[must_use]
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    #[must_use]
    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    /// Non-VSync events currently retained.
    #[must_use]
    pub fn stored_events(&self) -> usize {
        self.stored.len()
    }

    /// Retained intervals, oldest first.
    pub fn pairs(&self) -> impl Iterator<Item = &VSyncPair> + '_ {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frametrace_common::{AppConnect, DistortionBegin};

    fn vsync(time: f64, frame_index: u32) -> Event {
        Event::from_payload(time, &VSync { vsync_time: time, frame_index, tw_gpu_end_time: 0.0 })
    }

    fn marker(time: f64, id: u32) -> Event {
        Event::from_payload(time, &DistortionBegin { id, frame_index: 0 })
    }

    fn ids(events: &[Event]) -> Vec<u32> {
        events.iter().map(|e| e.payload::<DistortionBegin>().unwrap().id).collect()
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Seen {
        v: [f64; 4],
        frame: i64,
        next: i64,
        ids: Vec<u32>,
    }

    fn run(partitioner: &mut VSyncPartitioner, events: &[Event]) -> Vec<Seen> {
        let mut seen = Vec::new();
        partitioner.handle_events(events, |w| {
            seen.push(Seen {
                v: [w.v0, w.v1, w.v2, w.v3],
                frame: w.frame_index,
                next: w.next_frame_index,
                ids: ids(w.events),
            });
        });
        seen
    }

    #[test]
    fn test_no_window_before_three_pairs() {
        let mut p = VSyncPartitioner::new();
        let mut events: Vec<Event> = (0..500).map(|i| marker(0.5 + f64::from(i) * 1e-4, i)).collect();
        events.extend([vsync(1.0, 0), vsync(2.0, 1), vsync(3.0, 2)]);
        assert!(run(&mut p, &events).is_empty());
        assert_eq!(p.windows_emitted(), 0);
        assert_eq!(p.pairs().count(), 2);

        let seen = run(&mut p, &[vsync(4.0, 3)]);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].v, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(seen[0].frame, 2);
        assert_eq!(seen[0].next, 3);
    }

    #[test]
    fn test_boundary_event_belongs_to_interval_it_ends() {
        let mut p = VSyncPartitioner::new();
        let events = [
            vsync(1.0, 0),
            marker(1.0, 10), // on v0 of the first window: excluded
            marker(1.5, 11),
            vsync(2.0, 1),
            marker(2.0, 12), // ends (1, 2]: in the first window, not the second
            vsync(3.0, 2),
            marker(4.0, 13), // exactly v3: included
            vsync(4.0, 3),
            vsync(5.0, 4),
        ];
        let seen = run(&mut p, &events);
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].ids, vec![11, 12, 13]);
        assert_eq!(seen[1].v, [2.0, 3.0, 4.0, 5.0]);
        assert_eq!(seen[1].ids, vec![13]);
    }

    #[test]
    fn test_out_of_order_events_still_assigned() {
        let mut p = VSyncPartitioner::new();
        let events = [
            vsync(1.0, 0),
            vsync(2.0, 1),
            marker(3.5, 1), // delivered early
            vsync(3.0, 2),
            marker(1.5, 2), // delivered late
            vsync(4.0, 3),
        ];
        let seen = run(&mut p, &events);
        assert_eq!(seen[0].ids, vec![1, 2]);
    }

    #[test]
    fn test_vsyncs_are_not_stored_and_invalid_events_ignored() {
        let mut p = VSyncPartitioner::new();
        run(&mut p, &[vsync(1.0, 0), Event::default(), Event::from_payload(1.1, &AppConnect { pid: 1 })]);
        assert_eq!(p.stored_events(), 1);
    }

    #[test]
    fn test_store_overwrites_oldest() {
        let mut p = VSyncPartitioner::with_capacity(4);
        let mut events = vec![vsync(1.0, 0), vsync(2.0, 1), vsync(3.0, 2)];
        events.extend((0..6).map(|i| marker(3.1 + f64::from(i) * 0.1, i)));
        events.push(vsync(4.0, 3));
        let seen = run(&mut p, &events);
        assert_eq!(seen[0].ids, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_frame_skip_counted() {
        let mut p = VSyncPartitioner::new();
        let events = [
            vsync(1.0, 0),
            vsync(2.0, 1),
            vsync(3.0, 2),
            vsync(4.0, 3), // window target 2
            vsync(5.0, 6), // window target 3
            vsync(6.0, 7), // window target 6: skips 4 and 5
        ];
        let seen = run(&mut p, &events);
        assert_eq!(seen.iter().map(|s| s.frame).collect::<Vec<_>>(), vec![2, 3, 6]);
        assert_eq!(p.skipped_frames(), 2);
        assert_eq!(p.windows_emitted(), 3);
    }

    #[test]
    fn test_default_pair_is_invalid() {
        assert!(!VSyncPair::default().is_valid());
        let pair = VSyncPair { begin: 1.0, end: 1.5, frame_index: 0 };
        assert!(pair.is_valid());
        assert!((pair.duration() - 0.5).abs() < 1e-12);
    }
}
