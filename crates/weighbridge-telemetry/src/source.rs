//! Telemetry source addressing and opening

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio::process::Command;
use tracing::{debug, info};
use weighbridge_types::TelemetryError;

/// Boxed byte stream from the scale
pub type TelemetryReader = Box<dyn AsyncRead + Unpin + Send>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial line parameters of the scale indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    /// Configure `/dev/*` sources with `stty` before reading
    #[serde(default = "default_true")]
    pub apply_line_settings: bool,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::None,
            apply_line_settings: true,
        }
    }
}

impl SerialSettings {
    /// `stty` arguments for `device` (raw mode, no echo)
    pub fn stty_args(&self, device: &str) -> Vec<String> {
        let mut args = vec![
            "-F".to_string(),
            device.to_string(),
            self.baud_rate.to_string(),
            format!("cs{}", self.data_bits),
            if self.stop_bits >= 2 { "cstopb" } else { "-cstopb" }.to_string(),
        ];
        match self.parity {
            Parity::None => args.push("-parenb".to_string()),
            Parity::Even => {
                args.push("parenb".to_string());
                args.push("-parodd".to_string());
            }
            Parity::Odd => {
                args.push("parenb".to_string());
                args.push("parodd".to_string());
            }
        }
        args.push("raw".to_string());
        args.push("-echo".to_string());
        args
    }
}

impl std::fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate, self.data_bits, parity, self.stop_bits
        )
    }
}

/// Where scale telemetry comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetrySource {
    Stdin,
    /// Serial device servers and indicator network ports
    Tcp(String),
    /// Serial device node or a recorded capture
    Path(PathBuf),
}

impl TelemetrySource {
    /// `-` is stdin, `tcp://host:port` is TCP, anything else a path
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec == "-" {
            TelemetrySource::Stdin
        } else if let Some(addr) = spec.strip_prefix("tcp://") {
            TelemetrySource::Tcp(addr.to_string())
        } else {
            TelemetrySource::Path(PathBuf::from(spec))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, TelemetrySource::Stdin)
    }

    fn is_device(&self) -> bool {
        matches!(self, TelemetrySource::Path(p) if p.starts_with("/dev"))
    }

    /// Open the source. Failing here is the one hard telemetry error.
    pub async fn open(&self, serial: &SerialSettings) -> Result<TelemetryReader, TelemetryError> {
        let reader: TelemetryReader = match self {
            TelemetrySource::Stdin => Box::new(tokio::io::stdin()),
            TelemetrySource::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|e| self.connect_error(e))?;
                Box::new(stream)
            }
            TelemetrySource::Path(path) => {
                if self.is_device() && serial.apply_line_settings {
                    apply_line_settings(&path.display().to_string(), serial).await?;
                }
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| self.connect_error(e))?;
                Box::new(file)
            }
        };
        info!(source = %self, "telemetry source open");
        Ok(reader)
    }

    fn connect_error(&self, e: std::io::Error) -> TelemetryError {
        TelemetryError::Connect {
            target: self.to_string(),
            reason: e.to_string(),
        }
    }
}

impl std::fmt::Display for TelemetrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetrySource::Stdin => write!(f, "stdin"),
            TelemetrySource::Tcp(addr) => write!(f, "tcp://{}", addr),
            TelemetrySource::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

async fn apply_line_settings(device: &str, serial: &SerialSettings) -> Result<(), TelemetryError> {
    let args = serial.stty_args(device);
    debug!(?args, "configuring serial line");
    let output = Command::new("stty")
        .args(&args)
        .output()
        .await
        .map_err(|e| TelemetryError::LineSettings(format!("stty: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TelemetryError::LineSettings(stderr.trim().to_string()));
    }
    Ok(())
}
