//! # Shared Payload Layouts (Compositor ↔ Listener)
//!
//! Defines the fixed-layout payloads emitted by the compositor/SDK trace
//! provider and the identifiers used to route them. Every payload is
//! `#[repr(C, packed)]` so its in-memory image is byte-identical to what the
//! provider writes into a trace record.
//!
//! ## Key Types
//!
//! - [`Provider`] - Internal id of a known trace provider
//! - [`ProviderGuid`] - Platform identity of a provider
//! - [`TracePayload`] - Ties a payload layout to its (provider, event id, version)
//! - [`VSync`], [`PoseLatchCpuWrite`], ... - The eleven known payloads

#![cfg_attr(not(test), no_std)]

use core::fmt;

// ============================================================================
// Providers
// ============================================================================

/// All known trace providers. Events from any other provider are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Provider {
    /// The SDK runtime / compositor provider (`OVR-SDK-LibOVR`)
    Sdk,
    /// Provider we have no layouts for
    #[default]
    Unknown,
}

/// 128-bit provider identity as delivered by the platform trace facility.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderGuid(pub u128);

/// Identity of the SDK provider.
pub const SDK_PROVIDER_GUID: ProviderGuid = ProviderGuid(0x553787fc_d3d7_4f5e_acb2_1597c7209b3c);

/// Registered name of the SDK provider.
pub const SDK_PROVIDER_NAME: &str = "OVR-SDK-LibOVR";

impl Provider {
    /// Platform identity, if the provider has one.
    #[must_use]
    pub fn guid(self) -> Option<ProviderGuid> {
        match self {
            Provider::Sdk => Some(SDK_PROVIDER_GUID),
            Provider::Unknown => None,
        }
    }
}

impl ProviderGuid {
    /// Map a platform provider identity onto an internal [`Provider`].
    #[must_use]
    pub fn provider(self) -> Provider {
        if self == SDK_PROVIDER_GUID {
            Provider::Sdk
        } else {
            Provider::Unknown
        }
    }

    /// Parse the hyphenated form produced by `Display`.
    ///
    /// Hyphens are ignored; exactly 32 hex digits are required.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut value: u128 = 0;
        let mut digits = 0;
        for c in text.chars().filter(|&c| c != '-') {
            let nibble = c.to_digit(16)?;
            value = (value << 4) | u128::from(nibble);
            digits += 1;
            if digits > 32 {
                return None;
            }
        }
        (digits == 32).then_some(Self(value))
    }
}

impl fmt::Display for ProviderGuid {
    #[allow(clippy::cast_possible_truncation)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            (v & 0xffff_ffff_ffff) as u64
        )
    }
}

impl fmt::Debug for ProviderGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderGuid({self})")
    }
}

// ============================================================================
// Event Id Constants (SDK provider manifest)
// ============================================================================

pub const EVENT_DISTORTION_BEGIN: u16 = 1;
pub const EVENT_DISTORTION_END: u16 = 2;
pub const EVENT_POSE_LATCH_CPU_WRITE: u16 = 3;
pub const EVENT_POSE_LATCH_GPU_READBACK: u16 = 4;
pub const EVENT_VSYNC: u16 = 5;
pub const EVENT_APP_COMPOSITOR_FOCUS: u16 = 6;
pub const EVENT_APP_CONNECT: u16 = 7;
pub const EVENT_APP_DISCONNECT: u16 = 8;
pub const EVENT_APP_NO_OP: u16 = 9;
pub const EVENT_LATENCY_TIMING: u16 = 10;
pub const EVENT_END_FRAME_APP_TIMING: u16 = 11;

/// Largest payload an event can carry.
///
/// Every layout below must fit; `PoseLatchCpuWrite` (84 bytes) is currently
/// the largest.
pub const MAX_PAYLOAD_BYTES: usize = 96;

// ============================================================================
// Payload Trait
// ============================================================================

/// A fixed-layout payload bound to one (provider, event id, version).
///
/// # Safety
///
/// Implementors must be `#[repr(C, packed)]` plain-old-data: no padding, no
/// pointers, and every bit pattern must be a valid value. The listener reads
/// payloads with `ptr::read_unaligned` from raw trace bytes.
#[allow(unsafe_code)]
pub unsafe trait TracePayload: Copy + 'static {
    const PROVIDER: Provider;
    const EVENT_ID: u16;
    const VERSION: u8;
    const SIZE: usize = core::mem::size_of::<Self>();

    /// Raw byte image of the payload, as a provider would emit it.
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: implementors are packed POD, so all SIZE bytes are initialized.
        #[allow(unsafe_code)]
        unsafe {
            core::slice::from_raw_parts((self as *const Self).cast::<u8>(), Self::SIZE)
        }
    }
}

macro_rules! trace_payload {
    ($ty:ty, $id:expr) => {
        #[allow(unsafe_code)]
        unsafe impl TracePayload for $ty {
            const PROVIDER: Provider = Provider::Sdk;
            const EVENT_ID: u16 = $id;
            const VERSION: u8 = 0;
        }
    };
}

// ============================================================================
// Payload Layouts
// ============================================================================

/// Compositor started distortion rendering for a frame.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DistortionBegin {
    pub id: u32,
    pub frame_index: u32,
}

/// Compositor finished distortion rendering for a frame.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DistortionEnd {
    pub id: u32,
    pub frame_index: u32,
}

/// Head pose written by the CPU for a layer.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoseLatchCpuWrite {
    pub sequence: u32,
    pub layer: i32,
    pub motion_sensor_time: f32,
    pub predicted_scanline_first: f32,
    pub predicted_scanline_last: f32,
    pub time_to_scanline_first: f32,
    pub time_to_scanline_last: f32,
    pub start_position: [f32; 3],
    pub end_position: [f32; 3],
    pub start_quat: [f32; 4],
    pub end_quat: [f32; 4],
}

/// Head pose latched and read back by the GPU for a layer.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PoseLatchGpuReadback {
    pub sequence: u32,
    pub layer: i32,
    pub motion_sensor_time: f32,
    pub predicted_scanline_first: f32,
    pub predicted_scanline_last: f32,
    pub time_to_scanline_first: f32,
    pub time_to_scanline_last: f32,
}

/// Display vertical sync.
///
/// `vsync_time` is in seconds on the same clock as record timestamps.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VSync {
    pub vsync_time: f64,
    pub frame_index: u32,
    pub tw_gpu_end_time: f64,
}

/// An application gained compositor focus.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppCompositorFocus {
    pub pid: u64,
}

/// An application connected to the compositor.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppConnect {
    pub pid: u64,
}

/// An application disconnected from the compositor.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppDisconnect {
    pub pid: u64,
}

/// Keep-alive from a connected application.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AppNoOp {
    pub pid: u64,
}

/// Motion-to-photon latency breakdown for one frame.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencyTiming {
    pub latency_render_cpu_begin: f64,
    pub latency_render_cpu_end: f64,
    pub latency_render_imu: f64,
    pub latency_timewarp_cpu: f64,
    pub latency_timewarp_latched: f64,
    pub latency_timewarp_gpu_end: f64,
    pub latency_post_present: f64,
    pub error_render: f64,
    pub error_timewarp: f64,
}

/// Application-side timing reported at end of frame.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EndFrameAppTiming {
    pub app_frame_index: u32,
    pub app_render_imu_time: f64,
    pub app_scanout_start_time: f64,
    pub app_gpu_render_duration: f64,
    pub app_begin_rendering_time: f64,
    pub app_end_rendering_time: f64,
    pub queue_ahead_seconds: f64,
    pub distortion_gpu_duration: f64,
}

trace_payload!(DistortionBegin, EVENT_DISTORTION_BEGIN);
trace_payload!(DistortionEnd, EVENT_DISTORTION_END);
trace_payload!(PoseLatchCpuWrite, EVENT_POSE_LATCH_CPU_WRITE);
trace_payload!(PoseLatchGpuReadback, EVENT_POSE_LATCH_GPU_READBACK);
trace_payload!(VSync, EVENT_VSYNC);
trace_payload!(AppCompositorFocus, EVENT_APP_COMPOSITOR_FOCUS);
trace_payload!(AppConnect, EVENT_APP_CONNECT);
trace_payload!(AppDisconnect, EVENT_APP_DISCONNECT);
trace_payload!(AppNoOp, EVENT_APP_NO_OP);
trace_payload!(LatencyTiming, EVENT_LATENCY_TIMING);
trace_payload!(EndFrameAppTiming, EVENT_END_FRAME_APP_TIMING);

const _: () = assert!(PoseLatchCpuWrite::SIZE <= MAX_PAYLOAD_BYTES);
const _: () = assert!(LatencyTiming::SIZE <= MAX_PAYLOAD_BYTES);
const _: () = assert!(EndFrameAppTiming::SIZE <= MAX_PAYLOAD_BYTES);
