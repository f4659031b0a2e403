/*!
Edge-triggered VGA raster decoder.

This module replays the recorded sync, color and display-enable signals over
the merged timeline of all their changes and rebuilds the frames a VGA timing
generator drove to the display:

- A falling edge on hsync starts a new row (x = 0).
- A falling edge on vsync closes the current frame and starts a new one.
- While display-enable is high, every instant writes one pixel and advances
  x, wrapping to the next row after `width` pixels.

Capture is gated by display-enable only. Pulse widths and porch lengths are
never checked, so irregular or truncated traces still decode.
*/

use crate::error::Result;
use crate::frame::{FrameBuffer, Rgb};
use crate::trace::{merged_timeline, SampleValue, SignalTrace, Trace, TraceCursor};
use crate::video::{COLOR_MASK, COLOR_SCALE, H_DISPLAY, PROGRESS_INTERVAL, V_DISPLAY};
use serde::{Deserialize, Serialize};
use std::mem;
use tracing::{debug, info};

/// Raster geometry and reporting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Visible pixels per row
    pub width: usize,

    /// Visible rows per frame
    pub height: usize,

    /// Processed instants between progress reports (0 disables them)
    pub progress_interval: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            width: H_DISPLAY,
            height: V_DISPLAY,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// Names of the six signals the decoder reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMap {
    /// Hierarchical scope prepended to every local name (may be empty)
    pub scope: String,
    pub hsync: String,
    pub vsync: String,
    pub red: String,
    pub green: String,
    pub blue: String,
    pub display_enable: String,
}

impl SignalMap {
    /// Full hierarchical name of a local signal name
    pub fn qualified(&self, local: &str) -> String {
        if self.scope.is_empty() {
            local.to_string()
        } else {
            format!("{}.{}", self.scope, local)
        }
    }
}

impl Default for SignalMap {
    fn default() -> Self {
        Self {
            scope: "image_controller_tb.uut".to_string(),
            hsync: "hsync".to_string(),
            vsync: "vsync".to_string(),
            red: "red[3:0]".to_string(),
            green: "green[3:0]".to_string(),
            blue: "blue[3:0]".to_string(),
            display_enable: "display_enable".to_string(),
        }
    }
}

/// The six traces driving the decoder
#[derive(Debug, Clone, Copy)]
pub struct VgaSignals<'a> {
    pub hsync: &'a SignalTrace,
    pub vsync: &'a SignalTrace,
    pub red: &'a SignalTrace,
    pub green: &'a SignalTrace,
    pub blue: &'a SignalTrace,
    pub display_enable: &'a SignalTrace,
}

impl<'a> VgaSignals<'a> {
    /// Look up every required signal, failing on the first one missing
    pub fn resolve(trace: &'a Trace, names: &SignalMap) -> Result<Self> {
        Ok(Self {
            hsync: trace.signal(&names.qualified(&names.hsync))?,
            vsync: trace.signal(&names.qualified(&names.vsync))?,
            red: trace.signal(&names.qualified(&names.red))?,
            green: trace.signal(&names.qualified(&names.green))?,
            blue: trace.signal(&names.qualified(&names.blue))?,
            display_enable: trace.signal(&names.qualified(&names.display_enable))?,
        })
    }

    pub fn all(&self) -> [&'a SignalTrace; 6] {
        [
            self.hsync,
            self.vsync,
            self.red,
            self.green,
            self.blue,
            self.display_enable,
        ]
    }
}

/// Receiver of completed frames
pub trait FrameSink {
    /// Take ownership of a completed, non-blank frame
    fn emit(&mut self, index: u32, frame: FrameBuffer) -> Result<()>;
}

/// Expand a 4-bit color channel to 8 bits; undefined reads as 0
pub fn expand_channel(value: SampleValue) -> u8 {
    match value {
        SampleValue::Defined(level) => (level & COLOR_MASK) as u8 * COLOR_SCALE,
        SampleValue::Undefined => 0,
    }
}

/// Signal levels resolved at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub hsync: u64,
    pub vsync: u64,
    pub color: Rgb,
    pub display_enable: bool,
}

/// Per-sweep decoder state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    /// Instants processed so far
    pub index: usize,
    pub last_hsync: u64,
    pub last_vsync: u64,
    pub x: usize,
    pub y: usize,
    pub in_display_area: bool,
    /// Advances on every vsync falling edge
    pub frame: u32,
}

impl Default for ScanCursor {
    fn default() -> Self {
        Self {
            index: 0,
            last_hsync: 1,
            last_vsync: 1,
            x: 0,
            y: 0,
            in_display_area: false,
            frame: 0,
        }
    }
}

/// Resolves a [`Snapshot`] per instant using one cursor per signal
struct Sampler<'a> {
    hsync: TraceCursor<'a>,
    vsync: TraceCursor<'a>,
    red: TraceCursor<'a>,
    green: TraceCursor<'a>,
    blue: TraceCursor<'a>,
    display_enable: TraceCursor<'a>,
}

impl<'a> Sampler<'a> {
    fn new(signals: &VgaSignals<'a>) -> Self {
        Self {
            hsync: signals.hsync.cursor(),
            vsync: signals.vsync.cursor(),
            red: signals.red.cursor(),
            green: signals.green.cursor(),
            blue: signals.blue.cursor(),
            display_enable: signals.display_enable.cursor(),
        }
    }

    fn sample(&mut self, time: u64, state: &ScanCursor) -> Snapshot {
        // Syncs hold their previous level until driven, including through x/z
        let hsync = self
            .hsync
            .value_at(time, SampleValue::Defined(state.last_hsync))
            .unwrap_or(state.last_hsync);
        let vsync = self
            .vsync
            .value_at(time, SampleValue::Defined(state.last_vsync))
            .unwrap_or(state.last_vsync);

        let black = SampleValue::Defined(0);
        let color = Rgb::new(
            expand_channel(self.red.value_at(time, black)),
            expand_channel(self.green.value_at(time, black)),
            expand_channel(self.blue.value_at(time, black)),
        );

        let display_enable = self.display_enable.value_at(time, black) == SampleValue::Defined(1);

        Snapshot {
            hsync,
            vsync,
            color,
            display_enable,
        }
    }
}

/// Raster state machine: scan cursor plus the frame being filled
#[derive(Debug, Clone)]
pub struct Scanner {
    width: usize,
    height: usize,
    cursor: ScanCursor,
    buffer: FrameBuffer,
}

impl Scanner {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cursor: ScanCursor::default(),
            buffer: FrameBuffer::new(width, height),
        }
    }

    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    /// Frame currently being filled
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Apply one instant. Returns the frame closed by a vsync edge, if it
    /// should be emitted.
    pub fn step(&mut self, sample: Snapshot) -> Option<(u32, FrameBuffer)> {
        let state = &mut self.cursor;
        let mut completed = None;

        if state.last_hsync == 1 && sample.hsync == 0 {
            state.x = 0;
            state.in_display_area = state.y < self.height;
        }

        if state.last_vsync == 1 && sample.vsync == 0 {
            let finished = mem::replace(&mut self.buffer, FrameBuffer::new(self.width, self.height));
            // The first edge has no previous frame to close
            if state.frame > 0 && !finished.is_blank() {
                completed = Some((state.frame, finished));
            }

            debug!("vsync edge at instant {}: frame {} -> {}", state.index, state.frame, state.frame + 1);
            state.x = 0;
            state.y = 0;
            state.frame += 1;
            state.in_display_area = true;
        }

        if sample.display_enable && state.in_display_area && state.x < self.width && state.y < self.height {
            self.buffer.set(state.y, state.x, sample.color);
            state.x += 1;

            if state.x >= self.width {
                state.x = 0;
                state.y += 1;
                state.in_display_area = state.y < self.height;
            }
        }

        state.last_hsync = sample.hsync;
        state.last_vsync = sample.vsync;
        state.index += 1;

        completed
    }

    /// End of trace: hand back the frame in progress unless it is blank
    pub fn finish(self) -> Option<(u32, FrameBuffer)> {
        if self.buffer.is_blank() {
            None
        } else {
            Some((self.cursor.frame, self.buffer))
        }
    }
}

/// Outcome of one decoding sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Instants on the merged timeline
    pub instants: usize,
    /// Final value of the frame counter (number of vsync falling edges)
    pub frame_counter: u32,
    /// Indices handed to the sink, in order
    pub emitted: Vec<u32>,
}

impl DecodeSummary {
    pub fn frames_emitted(&self) -> usize {
        self.emitted.len()
    }

    pub fn first_emitted(&self) -> Option<u32> {
        self.emitted.first().copied()
    }

    pub fn last_emitted(&self) -> Option<u32> {
        self.emitted.last().copied()
    }
}

/// Single-pass decoder over a recorded trace
#[derive(Debug, Clone, Default)]
pub struct TimingDecoder {
    config: DecoderConfig,
}

impl TimingDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Replay `signals` and hand every completed frame to `sink`
    pub fn decode<S: FrameSink + ?Sized>(&self, signals: &VgaSignals<'_>, sink: &mut S) -> Result<DecodeSummary> {
        let timeline = merged_timeline(&signals.all());
        let total = timeline.len();
        info!(
            "Decoding {} time points into {}x{} frames",
            total, self.config.width, self.config.height
        );

        let mut sampler = Sampler::new(signals);
        let mut scanner = Scanner::new(self.config.width, self.config.height);
        let mut summary = DecodeSummary {
            instants: total,
            ..Default::default()
        };

        for (i, &time) in timeline.iter().enumerate() {
            let sample = sampler.sample(time, scanner.cursor());

            if let Some((index, frame)) = scanner.step(sample) {
                sink.emit(index, frame)?;
                summary.emitted.push(index);
            }

            if self.config.progress_interval > 0 && i % self.config.progress_interval == 0 {
                let cursor = scanner.cursor();
                info!(
                    "  Processed {}/{} time points, frame {}, y={}",
                    i, total, cursor.frame, cursor.y
                );
            }
        }

        summary.frame_counter = scanner.cursor().frame;

        // A trace can end mid-frame without a closing vsync edge
        if let Some((index, frame)) = scanner.finish() {
            sink.emit(index, frame)?;
            summary.emitted.push(index);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SharedError;
    use super::SampleValue::{Defined, Undefined};

    /// Frame sink keeping everything in memory
    #[derive(Default)]
    struct Collector {
        frames: Vec<(u32, FrameBuffer)>,
    }

    impl FrameSink for Collector {
        fn emit(&mut self, index: u32, frame: FrameBuffer) -> Result<()> {
            self.frames.push((index, frame));
            Ok(())
        }
    }

    /// Hand-built stimulus for the six signals
    struct Stimulus {
        hsync: SignalTrace,
        vsync: SignalTrace,
        red: SignalTrace,
        green: SignalTrace,
        blue: SignalTrace,
        de: SignalTrace,
    }

    impl Stimulus {
        fn new() -> Self {
            Self {
                hsync: SignalTrace::new("hsync"),
                vsync: SignalTrace::new("vsync"),
                red: SignalTrace::new("red"),
                green: SignalTrace::new("green"),
                blue: SignalTrace::new("blue"),
                de: SignalTrace::new("de"),
            }
        }

        /// Falling edge at `t`, back high at `t + 1`
        fn hsync_pulse(&mut self, t: u64) {
            self.hsync.push(t, Defined(0));
            self.hsync.push(t + 1, Defined(1));
        }

        fn vsync_pulse(&mut self, t: u64) {
            self.vsync.push(t, Defined(0));
            self.vsync.push(t + 1, Defined(1));
        }

        /// Drive one pixel at `t` with display-enable high
        fn pixel(&mut self, t: u64, r: SampleValue, g: SampleValue, b: SampleValue) {
            self.red.push(t, r);
            self.green.push(t, g);
            self.blue.push(t, b);
            self.de.push(t, Defined(1));
        }

        fn blank(&mut self, t: u64) {
            self.de.push(t, Defined(0));
        }

        fn signals(&self) -> VgaSignals<'_> {
            VgaSignals {
                hsync: &self.hsync,
                vsync: &self.vsync,
                red: &self.red,
                green: &self.green,
                blue: &self.blue,
                display_enable: &self.de,
            }
        }
    }

    fn small(width: usize, height: usize) -> TimingDecoder {
        TimingDecoder::new(DecoderConfig {
            width,
            height,
            progress_interval: 0,
        })
    }

    fn gray(level: u64) -> (SampleValue, SampleValue, SampleValue) {
        (Defined(level), Defined(level), Defined(level))
    }

    fn snapshot(hsync: u64, vsync: u64, de: bool) -> Snapshot {
        Snapshot {
            hsync,
            vsync,
            color: Rgb::new(17, 17, 17),
            display_enable: de,
        }
    }

    #[test]
    fn test_channel_expansion() {
        assert_eq!(expand_channel(Defined(0)), 0);
        assert_eq!(expand_channel(Defined(1)), 17);
        assert_eq!(expand_channel(Defined(8)), 136);
        assert_eq!(expand_channel(Defined(15)), 255);
        assert_eq!(expand_channel(Undefined), 0);

        for level in 0..16u64 {
            assert_eq!(expand_channel(Defined(level)) as u64, level * 17);
        }
    }

    #[test]
    fn test_initial_cursor() {
        let cursor = ScanCursor::default();
        assert_eq!((cursor.x, cursor.y, cursor.frame), (0, 0, 0));
        assert_eq!((cursor.last_hsync, cursor.last_vsync), (1, 1));
        assert!(!cursor.in_display_area);
    }

    #[test]
    fn test_hsync_falling_edge_resets_x() {
        let mut scanner = Scanner::new(8, 4);
        scanner.step(snapshot(1, 0, false));
        for _ in 0..5 {
            scanner.step(snapshot(1, 1, true));
        }
        assert_eq!(scanner.cursor().x, 5);

        scanner.step(snapshot(0, 1, false));
        assert_eq!(scanner.cursor().x, 0);
        assert!(scanner.cursor().in_display_area);

        // Held low is not an edge
        scanner.step(snapshot(0, 1, true));
        scanner.step(snapshot(0, 1, false));
        assert_eq!(scanner.cursor().x, 1);
    }

    #[test]
    fn test_vsync_falling_edge_resets_frame() {
        let mut scanner = Scanner::new(4, 4);

        assert!(scanner.step(snapshot(1, 0, false)).is_none());
        assert_eq!(scanner.cursor().frame, 1);
        assert!(scanner.cursor().in_display_area);

        scanner.step(snapshot(1, 1, true));
        scanner.step(snapshot(1, 1, true));
        assert_eq!(scanner.cursor().x, 2);

        let (index, frame) = scanner.step(snapshot(1, 0, false)).expect("frame closed");
        assert_eq!(index, 1);
        assert_eq!(frame.get(0, 1), Some(Rgb::new(17, 17, 17)));
        assert_eq!((scanner.cursor().x, scanner.cursor().y), (0, 0));
        assert_eq!(scanner.cursor().frame, 2);
        assert!(scanner.buffer().is_blank());
    }

    #[test]
    fn test_first_vsync_edge_never_emits() {
        let mut stim = Stimulus::new();
        // Pixels captured before any vsync edge (hsync opens the display area)
        stim.hsync_pulse(0);
        let (r, g, b) = gray(9);
        stim.pixel(2, r, g, b);
        stim.pixel(3, r, g, b);
        stim.blank(4);
        stim.vsync_pulse(10);

        let mut sink = Collector::default();
        let summary = small(4, 4).decode(&stim.signals(), &mut sink).unwrap();

        assert!(sink.frames.is_empty());
        assert_eq!(summary.frame_counter, 1);
    }

    #[test]
    fn test_frame_counter_and_emission() {
        let mut stim = Stimulus::new();
        let mut t = 0;
        for frame in 1..=3u64 {
            stim.vsync_pulse(t);
            stim.hsync_pulse(t + 2);
            let (r, g, b) = gray(frame);
            stim.pixel(t + 4, r, g, b);
            stim.blank(t + 5);
            t += 10;
        }

        let mut sink = Collector::default();
        let summary = small(4, 4).decode(&stim.signals(), &mut sink).unwrap();

        let indices: Vec<u32> = sink.frames.iter().map(|(i, _)| *i).collect();
        // Frames 1 and 2 are closed by vsync, frame 3 is flushed at the end
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(summary.emitted, vec![1, 2, 3]);
        assert_eq!(summary.frame_counter, 3);
        assert_eq!(sink.frames[0].1.get(0, 0), Some(Rgb::new(17, 17, 17)));
        assert_eq!(sink.frames[2].1.get(0, 0), Some(Rgb::new(51, 51, 51)));
    }

    #[test]
    fn test_blank_frame_is_skipped_but_counted() {
        let mut stim = Stimulus::new();
        stim.vsync_pulse(0);
        // Frame 1 stays blank
        stim.vsync_pulse(10);
        stim.hsync_pulse(12);
        let (r, g, b) = gray(4);
        stim.pixel(14, r, g, b);
        stim.blank(15);
        stim.vsync_pulse(20);

        let mut sink = Collector::default();
        let summary = small(4, 4).decode(&stim.signals(), &mut sink).unwrap();

        assert_eq!(summary.emitted, vec![2]);
        assert_eq!(summary.frame_counter, 3);
    }

    #[test]
    fn test_scan_wraps_to_next_row() {
        let mut stim = Stimulus::new();
        stim.vsync_pulse(0);
        for (i, t) in (10..15u64).enumerate() {
            stim.pixel(t, Defined(i as u64 + 1), Defined(0), Defined(0));
        }
        stim.blank(15);

        let mut sink = Collector::default();
        small(4, 3).decode(&stim.signals(), &mut sink).unwrap();

        let (_, frame) = &sink.frames[0];
        for col in 0..4 {
            assert_eq!(frame.get(0, col).unwrap().r, (col as u8 + 1) * 17);
        }
        // Fifth capture after x = width - 1 lands on (row 1, col 0)
        assert_eq!(frame.get(1, 0).unwrap().r, 85);
        assert_eq!(frame.get(1, 1), Some(Rgb::BLACK));
    }

    #[test]
    fn test_writes_stop_at_frame_bottom() {
        let mut stim = Stimulus::new();
        stim.vsync_pulse(0);
        // 3x2 frame, 10 captures: the last four fall outside
        for t in 10..20u64 {
            stim.pixel(t, Defined(t % 7 + 1), Defined(1), Defined(1));
        }
        stim.blank(20);
        // A new row after the bottom stays outside the display area
        stim.hsync_pulse(30);
        stim.pixel(32, Defined(15), Defined(15), Defined(15));
        stim.blank(33);

        let mut sink = Collector::default();
        small(3, 2).decode(&stim.signals(), &mut sink).unwrap();

        let (index, frame) = &sink.frames[0];
        assert_eq!(*index, 1);
        assert_eq!(frame.as_bytes().len(), 3 * 2 * 3);
        assert_eq!(frame.get(1, 2).unwrap().r, (15 % 7 + 1) as u8 * 17);
        assert!(frame.as_bytes().iter().all(|&b| b != 255));
    }

    #[test]
    fn test_undefined_colors_never_emit() {
        let mut stim = Stimulus::new();
        let mut t = 0;
        for _ in 0..3 {
            stim.vsync_pulse(t);
            for row in 0..2u64 {
                stim.hsync_pulse(t + 2 + row * 10);
                for col in 0..4u64 {
                    stim.pixel(t + 4 + row * 10 + col, Undefined, Undefined, Undefined);
                }
                stim.blank(t + 8 + row * 10);
            }
            t += 30;
        }

        let mut sink = Collector::default();
        let summary = small(4, 2).decode(&stim.signals(), &mut sink).unwrap();

        assert!(sink.frames.is_empty());
        assert_eq!(summary.frame_counter, 3);
    }

    #[test]
    fn test_undefined_sync_holds_level() {
        let mut stim = Stimulus::new();
        stim.vsync_pulse(0);
        stim.hsync.push(5, Undefined);
        stim.pixel(6, Defined(2), Defined(2), Defined(2));
        stim.blank(7);

        let mut sink = Collector::default();
        let summary = small(4, 4).decode(&stim.signals(), &mut sink).unwrap();

        // Undefined hsync is not a falling edge, so x kept advancing from 0
        assert_eq!(summary.emitted, vec![1]);
        assert_eq!(sink.frames[0].1.get(0, 0), Some(Rgb::new(34, 34, 34)));
    }

    #[test]
    fn test_empty_trace_produces_nothing() {
        let stim = Stimulus::new();
        let mut sink = Collector::default();
        let summary = small(4, 4).decode(&stim.signals(), &mut sink).unwrap();

        assert_eq!(summary, DecodeSummary::default());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_missing_display_enable_signal() {
        let names = SignalMap::default();
        let store: Trace = [&names.hsync, &names.vsync, &names.red, &names.green, &names.blue]
            .into_iter()
            .map(|local| SignalTrace::new(names.qualified(local)))
            .collect();

        match VgaSignals::resolve(&store, &names) {
            Err(SharedError::MissingSignal { name, available }) => {
                assert!(name.contains("display_enable"));
                assert_eq!(available.len(), 5);
            }
            other => panic!("expected missing signal, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_resolve_with_bit_ranges() {
        let names = SignalMap::default();
        let store: Trace = ["hsync", "vsync", "red", "green", "blue", "display_enable"]
            .into_iter()
            .map(|local| SignalTrace::new(format!("image_controller_tb.uut.{}", local)))
            .collect();

        let signals = VgaSignals::resolve(&store, &names).unwrap();
        assert_eq!(signals.red.name(), "image_controller_tb.uut.red");
    }

    #[test]
    fn test_full_vga_frame() {
        const ROW_PERIOD: u64 = 800;
        let width = H_DISPLAY as u64;
        let height = V_DISPLAY as u64;

        let mut stim = Stimulus::new();
        stim.vsync.push(0, Defined(1));
        stim.vsync_pulse(5);

        for row in 0..height {
            let t0 = 100 + row * ROW_PERIOD;
            stim.hsync_pulse(t0);
            for col in 0..width {
                stim.pixel(t0 + 2 + col, Defined(col % 15 + 1), Defined(0), Defined(row % 16));
            }
            stim.blank(t0 + 2 + width);
        }
        stim.vsync_pulse(100 + height * ROW_PERIOD + 100);

        let mut sink = Collector::default();
        let summary = TimingDecoder::default().decode(&stim.signals(), &mut sink).unwrap();

        assert_eq!(summary.emitted, vec![1]);
        let (index, frame) = &sink.frames[0];
        assert_eq!(*index, 1);
        assert_eq!(crate::frame::frame_filename("frame", *index), "frame_001.png");
        assert_eq!((frame.width(), frame.height()), (H_DISPLAY, V_DISPLAY));

        assert_eq!(frame.get(0, 0), Some(Rgb::new(17, 0, 0)));
        assert_eq!(frame.get(0, 639), Some(Rgb::new(170, 0, 0)));
        assert_eq!(frame.get(479, 0), Some(Rgb::new(17, 0, 255)));
        for row in 0..V_DISPLAY {
            for col in 0..H_DISPLAY {
                assert_ne!(frame.get(row, col).unwrap().r, 0, "hole at ({}, {})", row, col);
            }
        }
    }
}
