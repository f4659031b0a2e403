/*!
# VCD Frame Grabber

Rebuilds the frames a VGA timing generator drove during an HDL simulation
and saves them as PNG files.

## Features

- Reads VCD waveform dumps recorded from the simulation testbench
- Replays hsync/vsync/display-enable to reconstruct every frame
- 4-bit RGB channels expanded to 8-bit PNG output
- Configurable signal names, frame size and output location
- Signal listing to help map testbench names

## Usage

### Decode frames
```bash
vcdgrabber image_controller_tb.vcd frame
```

### List signals in a trace
```bash
vcdgrabber signals image_controller_tb.vcd
```

### Generate a configuration file
```bash
vcdgrabber config --output vcdgrabber.toml
```
*/

use std::path::{Path, PathBuf};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod capture;
mod config;

use capture::CaptureOutcome;
use config::AppConfig;

#[derive(Parser)]
#[command(name = "vcdgrabber")]
#[command(about = "Rebuild VGA frames from a simulation waveform and save them as PNG files")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// VCD file recorded from the simulation
    ///
    /// A trace file literally named `signals` or `config` is read as the
    /// subcommand of that name; pass it as `./signals` instead.
    #[arg(required = true)]
    trace: Option<PathBuf>,

    /// Output filename prefix (frames are saved as <PREFIX>_NNN.png)
    prefix: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "vcdgrabber.toml")]
    config: PathBuf,

    /// Output directory for PNG files
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Hierarchical scope of the VGA signals
    #[arg(long)]
    scope: Option<String>,

    /// Visible pixels per row
    #[arg(long)]
    width: Option<usize>,

    /// Visible rows per frame
    #[arg(long)]
    height: Option<usize>,

    /// Disable log output on stderr
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the signals recorded in a trace
    Signals {
        /// VCD file to inspect
        trace: PathBuf,
    },

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "vcdgrabber.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if !cli.quiet {
        // Logs go to stderr so stdout only carries the run report
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match cli.command {
        Some(Commands::Signals { ref trace }) => list_signals(trace),

        Some(Commands::Config { ref output }) => generate_config_file(output),

        None => {
            let trace = cli.trace.clone().ok_or("a trace file is required")?;
            let config = build_config(&cli)?;
            run_capture(trace, config)
        }
    }
}

/// Merge the configuration file with command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_or_default(&cli.config)?;

    if let Some(prefix) = &cli.prefix {
        config.output.prefix = prefix.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if let Some(scope) = &cli.scope {
        config.signals.scope = scope.clone();
    }
    if let Some(width) = cli.width {
        config.decoder.width = width;
    }
    if let Some(height) = cli.height {
        config.decoder.height = height;
    }

    config.validate()?;
    Ok(config)
}

/// Decode a trace and save its frames
fn run_capture(trace: PathBuf, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Starting frame capture");
    println!("💾 Output: {}/{}_NNN.png", config.output.directory, config.output.prefix);

    match capture::capture_file(&trace, &config)? {
        CaptureOutcome::Completed(report) => {
            capture::print_report(&report, &config);
            println!("✅ Frame capture completed");
        }
        CaptureOutcome::MissingSignal { name, available } => {
            // Reported, not fatal: fix the signal names and rerun
            capture::print_missing_signal(&name, &available);
        }
    }

    Ok(())
}

/// Print every signal name in a trace
fn list_signals(trace: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("📂 Loading VCD file: {}", trace.display());

    let loaded = shared::vcd::load_trace(trace)?;
    capture::print_signal_names(&loaded.signal_names());

    Ok(())
}

/// Generate a default configuration file
fn generate_config_file(output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new();
    config.save_to_file(output_path)?;

    println!("✅ Generated configuration file: {}", output_path.display());
    println!("📝 Edit the file to customize settings, then run:");
    println!("   vcdgrabber --config {} <TRACE>", output_path.display());

    Ok(())
}
