use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use led_matrix_core::{LedService, ServiceConfig};
use tracing_subscriber::EnvFilter;

fn main() -> led_matrix_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServiceConfig::from_json_file(path)?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Commands::Show {
            name,
            sink_dir,
            command,
            hold,
        } => run_show(config, &name, sink_dir, &command, hold),
        Commands::Wave {
            name,
            sink_dir,
            frequency,
            seconds,
        } => run_wave(config, &name, sink_dir, frequency, seconds),
    }
}

fn run_show(
    config: ServiceConfig,
    name: &str,
    sink_dir: PathBuf,
    command: &str,
    hold: u64,
) -> led_matrix_core::Result<()> {
    tracing::info!(name, command, "issuing command");

    let service = LedService::new(config, sink_dir);
    service.register(name)?;
    service.ctrl(name, command)?;

    // Keep the worker alive so animated modes get to redraw.
    thread::sleep(Duration::from_secs(hold));
    service.unregister(name)
}

fn run_wave(
    config: ServiceConfig,
    name: &str,
    sink_dir: PathBuf,
    frequency: f32,
    seconds: u64,
) -> led_matrix_core::Result<()> {
    tracing::info!(name, frequency, "streaming synthetic tone");

    let block_len = config.spectrum.transform_len;
    let service = LedService::new(config, sink_dir);
    service.register(name)?;
    service.ctrl(name, "Show Wave")?;

    let block = tone_block(frequency, block_len);
    let deadline = std::time::Instant::now() + Duration::from_secs(seconds);
    while std::time::Instant::now() < deadline {
        service.feed(&block)?;
        thread::sleep(Duration::from_millis(250));
    }

    service.unregister(name)
}

/// Signed 8-bit sine block; `frequency` is in cycles per block.
fn tone_block(frequency: f32, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * frequency * i as f32 / len as f32;
            (120.0 * phase.sin()) as i8 as u8
        })
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a 16x16 LED dot-matrix panel", long_about = None)]
struct Cli {
    /// Optional JSON service configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a device, issue one control command and hold.
    Show {
        /// Device name; its sink files live under SINK_DIR/NAME.
        name: String,
        /// Directory the sink channel files are created in.
        sink_dir: PathBuf,
        /// Control command, e.g. "Show Time" or "Brightness 8".
        command: String,
        /// Seconds to keep the worker running before unregistering.
        #[arg(short = 't', long, default_value_t = 5)]
        hold: u64,
    },
    /// Register a device in wave mode and feed it a synthetic tone.
    Wave {
        /// Device name; its sink files live under SINK_DIR/NAME.
        name: String,
        /// Directory the sink channel files are created in.
        sink_dir: PathBuf,
        /// Tone frequency in cycles per sample block.
        #[arg(short, long, default_value_t = 8.0)]
        frequency: f32,
        /// Seconds to stream before unregistering.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
    },
}
