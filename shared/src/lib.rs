/*!
# Shared Types and Utilities

This crate contains the trace access layer, the VGA timing decoder and the
frame emitter used to rebuild display frames from a recorded simulation
waveform.

## Core Types

- [`Trace`] - In-memory store of named signal traces
- [`SignalTrace`] - Ordered value changes of a single signal
- [`TimingDecoder`] - Sync/display-enable state machine
- [`FrameBuffer`] - One reconstructed RGB frame

## Modules

- [`trace`] - Signal traces and last-value-at-or-before lookup
- [`timing`] - Edge-triggered raster decoder
- [`frame`] - Frame buffer storage
- [`emit`] - PNG frame sink
- [`vcd`] - Waveform file loading
- [`error`] - Common error types
*/

pub mod trace;
pub mod timing;
pub mod frame;
pub mod emit;
pub mod vcd;
pub mod error;

// Re-export commonly used types
pub use trace::{SampleValue, SignalTrace, Trace, TraceCursor};
pub use timing::{DecodeSummary, DecoderConfig, FrameSink, TimingDecoder, VgaSignals};
pub use frame::{FrameBuffer, Rgb};
pub use emit::PngFrameWriter;
pub use error::{SharedError, Result};

/// Version information for the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Video constants
pub mod video {
    /// Visible pixels per row in 640x480 VGA
    pub const H_DISPLAY: usize = 640;

    /// Visible rows per frame in 640x480 VGA
    pub const V_DISPLAY: usize = 480;

    /// Largest accepted frame width or height
    pub const MAX_DIMENSION: usize = 16_384;

    /// Multiplier mapping a 4-bit channel onto 0..=255 (15 * 17 = 255)
    pub const COLOR_SCALE: u8 = 17;

    /// Mask for the 4-bit color channels driven by the generator
    pub const COLOR_MASK: u64 = 0x0F;

    /// Number of processed instants between progress reports
    pub const PROGRESS_INTERVAL: usize = 100_000;

    /// Default output filename prefix
    pub const DEFAULT_PREFIX: &str = "frame";
}
