/*!
Frame capture from a recorded waveform.

This module wires the trace loader, the timing decoder and the PNG writer
together for one run and reports progress on the console.
*/

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tracing::{info, warn};
use shared::frame::{frame_filename, FrameBuffer};
use shared::timing::{DecodeSummary, FrameSink, TimingDecoder, VgaSignals};
use shared::{vcd, PngFrameWriter, SharedError, Trace};
use crate::config::AppConfig;

/// Result of a capture run
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The trace was decoded to the end
    Completed(CaptureReport),
    /// A required signal is absent; nothing was decoded
    MissingSignal { name: String, available: Vec<String> },
}

/// Statistics and files of a completed run
#[derive(Debug)]
pub struct CaptureReport {
    pub summary: DecodeSummary,
    pub files: Vec<PathBuf>,
}

/// PNG writer that announces every saved frame
struct ReportingSink {
    writer: PngFrameWriter,
}

impl FrameSink for ReportingSink {
    fn emit(&mut self, index: u32, frame: FrameBuffer) -> shared::Result<()> {
        self.writer.emit(index, frame)?;
        println!("💾 Saved frame {}: {}", index, self.writer.path_for(index).display());
        Ok(())
    }
}

/// Load a waveform file and decode it with `config`
pub fn capture_file(trace_path: &Path, config: &AppConfig) -> Result<CaptureOutcome> {
    println!("📂 Loading VCD file: {}", trace_path.display());

    let trace = vcd::load_trace(trace_path)
        .with_context(|| format!("Failed to load trace {}", trace_path.display()))?;

    capture_trace(&trace, config)
}

/// Decode an already loaded trace with `config`
pub fn capture_trace(trace: &Trace, config: &AppConfig) -> Result<CaptureOutcome> {
    let signals = match VgaSignals::resolve(trace, &config.signals) {
        Ok(signals) => signals,
        Err(SharedError::MissingSignal { name, available }) => {
            warn!("Required signal {} not found in trace", name);
            return Ok(CaptureOutcome::MissingSignal { name, available });
        }
        Err(e) => return Err(e.into()),
    };

    let mut sink = ReportingSink {
        writer: PngFrameWriter::new(&config.output.directory, &config.output.prefix),
    };

    let decoder = TimingDecoder::new(config.decoder.clone());
    let summary = decoder
        .decode(&signals, &mut sink)
        .context("Frame decoding failed")?;

    info!(
        "Decoded {} time points, {} vsync edges, {} frames written",
        summary.instants,
        summary.frame_counter,
        summary.frames_emitted()
    );

    Ok(CaptureOutcome::Completed(CaptureReport {
        summary,
        files: sink.writer.written().to_vec(),
    }))
}

/// Print the missing-signal diagnostic with every available name
pub fn print_missing_signal(name: &str, available: &[String]) {
    println!("❌ Error: Could not find signal '{}'", name);
    print_signal_names(available);
}

/// Print the signal names present in a trace
pub fn print_signal_names(names: &[String]) {
    println!("Available signals:");
    for name in names {
        println!("  {}", name);
    }
}

/// Print the end-of-run summary
pub fn print_report(report: &CaptureReport, config: &AppConfig) {
    let prefix = Path::new(&config.output.directory)
        .join(&config.output.prefix)
        .display()
        .to_string();

    println!();
    println!("📈 Total frames captured: {}", report.summary.frames_emitted());

    match (report.summary.first_emitted(), report.summary.last_emitted()) {
        (Some(first), Some(last)) => println!(
            "📁 Output files: {} to {}",
            frame_filename(&prefix, first),
            frame_filename(&prefix, last)
        ),
        _ => println!("📭 No frames with visible content were found"),
    }
}
