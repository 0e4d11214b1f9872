//! Typed queries and timestamp searches over event slices.
//!
//! The timestamp searches expect `events` sorted by `time` and return
//! indices into the slice. They are iterative bisections that keep a
//! `(lo, len)` window:
//!
//! - [`find_exact_event`] narrows to `[lo, mid)` or `(mid, end)`.
//! - [`find_left_event`] / [`find_right_event`] keep the probed midpoint in
//!   the window (`[lo, mid]` or `[mid, end)`) and resolve the final
//!   two-element window toward the left or right neighbour respectively.
//!
//! `find_right_event` resolves a two-element window `[a, a + 1]` to `a + 1`
//! whenever `time(a + 1) >= t`, otherwise to `a`. For `n >= 2` that means a
//! time before every event yields index 1 and a time after every event
//! yields `n - 2`.

// Exact timestamp equality is part of the search contract
#![allow(clippy::float_cmp)]

use frametrace_common::TracePayload;

use super::Event;

/// All events in `events` carrying payload layout `T`, in slice order.
pub fn events_of_type<T: TracePayload>(events: &[Event]) -> impl Iterator<Item = &Event> + '_ {
    events.iter().filter(|event| event.is::<T>())
}

/// Index of the first event of type `T` whose payload satisfies `predicate`.
pub fn find_event<T, P>(events: &[Event], mut predicate: P) -> Option<usize>
where
    T: TracePayload,
    P: FnMut(&T) -> bool,
{
    events
        .iter()
        .position(|event| event.payload::<T>().is_some_and(|payload| predicate(&payload)))
}

/// Index of an event whose time is exactly `time`.
#[must_use]
pub fn find_exact_event(time: f64, events: &[Event]) -> Option<usize> {
    let mut lo = 0;
    let mut len = events.len();
    loop {
        match len {
            0 => return None,
            1 => return (events[lo].time == time).then_some(lo),
            _ => {}
        }
        let half = len / 2;
        let mid = lo + half;
        let t = events[mid].time;
        if t == time {
            return Some(mid);
        }
        if time < t {
            len = half;
        } else {
            lo = mid + 1;
            len -= half + 1;
        }
    }
}

/// Index of the event at or directly before `time` (errs left).
///
/// Returns 0 when `time` precedes every event.
#[must_use]
pub fn find_left_event(time: f64, events: &[Event]) -> Option<usize> {
    let mut lo = 0;
    let mut len = events.len();
    loop {
        match len {
            0 => return None,
            1 => return Some(lo),
            2 => return Some(if events[lo + 1].time <= time { lo + 1 } else { lo }),
            _ => {}
        }
        let half = len / 2;
        let mid = lo + half;
        let t = events[mid].time;
        if t == time {
            return Some(mid);
        }
        if time < t {
            len = half + 1;
        } else {
            lo = mid;
            len -= half;
        }
    }
}

/// Index of the event at or directly after `time` (errs right).
///
/// See the module docs for how the final two-element window resolves.
#[must_use]
pub fn find_right_event(time: f64, events: &[Event]) -> Option<usize> {
    let mut lo = 0;
    let mut len = events.len();
    loop {
        match len {
            0 => return None,
            1 => return Some(lo),
            2 => return Some(if events[lo + 1].time >= time { lo + 1 } else { lo }),
            _ => {}
        }
        let half = len / 2;
        let mid = lo + half;
        let t = events[mid].time;
        if t == time {
            return Some(mid);
        }
        if time < t {
            len = half + 1;
        } else {
            lo = mid;
            len -= half;
        }
    }
}
