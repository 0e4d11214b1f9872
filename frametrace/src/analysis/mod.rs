//! Frame timing analysis over drained events
//!
//! - [`partitioner`] - groups events into three-interval VSync windows
//! - [`stabilization`] - waits for a run of consecutive valid frames

pub mod partitioner;
pub mod stabilization;

pub use partitioner::{VSyncPair, VSyncPartitioner, VSyncWindow, PAIRS_TO_ANALYZE, STORED_EVENTS};
pub use stabilization::{
    wait_for_stabilization, FrameStabilizer, FrameVerdict, StabilizationState, OVERRUN_FACTOR,
};
