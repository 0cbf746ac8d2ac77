//! CLI definition using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use weighbridge_domain::SentinelPolicy;
use weighbridge_types::OutputFormat;

#[derive(Parser)]
#[command(name = "weighbridge")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Unattended weighbridge: scale telemetry in, priced weighing tickets out")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a weighbridge session on a telemetry source
    Run {
        /// Telemetry source: `-` for stdin, `tcp://host:port`, or a device/file path.
        /// Uses config value if not specified.
        #[arg(long, short = 's')]
        source: Option<String>,

        /// Starting material id (overrides config)
        #[arg(long, short = 'm')]
        material: Option<String>,

        /// Sentinel matching policy: isolate or pair (overrides config)
        #[arg(long, value_parser = parse_policy)]
        policy: Option<SentinelPolicy>,

        /// Do not read operator commands from stdin
        #[arg(long)]
        no_console: bool,
    },

    /// Frame a telemetry capture and print the readings found
    Frame {
        /// Capture file, or `-` for stdin
        input: String,

        /// Feed the framer in chunks of this many bytes
        #[arg(long, default_value = "1024")]
        chunk_size: usize,
    },

    /// Show the material price list
    Materials {
        /// TOML price list (overrides config)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Set telemetry source
    #[arg(long)]
    pub set_source: Option<String>,

    /// Set serial baud rate
    #[arg(long)]
    pub set_baud_rate: Option<u32>,

    /// Run stty on device paths before reading
    #[arg(long)]
    pub set_apply_line_settings: Option<bool>,

    /// Set stability poll interval (ms)
    #[arg(long)]
    pub set_poll_interval: Option<u64>,

    /// Set entry threshold (kg)
    #[arg(long)]
    pub set_entry_threshold: Option<f64>,

    /// Set departure threshold (kg)
    #[arg(long)]
    pub set_departure_threshold: Option<f64>,

    /// Set number of stable polls before a weighing
    #[arg(long)]
    pub set_stability_ticks: Option<u32>,

    /// Set cooldown after each visit (ms)
    #[arg(long)]
    pub set_settle_delay: Option<u64>,

    /// Set identification timeout (ms)
    #[arg(long)]
    pub set_identification_timeout: Option<u64>,

    /// Set snapshot capture command
    #[arg(long)]
    pub set_capture_command: Option<String>,

    /// Set identifier recognizer command
    #[arg(long)]
    pub set_recognizer_command: Option<String>,

    /// Set default material id
    #[arg(long)]
    pub set_default_material: Option<String>,

    /// Set material price list file
    #[arg(long)]
    pub set_materials_file: Option<PathBuf>,

    /// Set sentinel matching policy (isolate, pair)
    #[arg(long, value_parser = parse_policy)]
    pub set_sentinel_policy: Option<SentinelPolicy>,

    /// Set default output format
    #[arg(long)]
    pub set_output: Option<OutputFormat>,

    /// Reset to defaults
    #[arg(long)]
    pub reset: bool,
}

fn parse_policy(value: &str) -> Result<SentinelPolicy, String> {
    match value.to_ascii_lowercase().as_str() {
        "isolate" => Ok(SentinelPolicy::Isolate),
        "pair" => Ok(SentinelPolicy::Pair),
        other => Err(format!("unknown policy '{}' (expected isolate or pair)", other)),
    }
}
