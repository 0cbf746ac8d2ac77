//! Identification through external commands.
//!
//! `capture_command` writes a JPEG still of the scale deck to stdout.
//! `recognizer_command` reads that JPEG on stdin and prints
//! `{"identifier": "...", "confidence": 0.0-1.0}`.

use std::future::Future;
use std::process::Stdio;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use weighbridge_domain::VehicleIdentifier;
use weighbridge_types::{Identification, IdentificationError};

use super::reply::parse_recognizer_output;

#[derive(Debug, Clone, Default)]
pub struct CommandIdentifier {
    capture: Option<Vec<String>>,
    recognizer: Option<Vec<String>>,
}

fn split_command(name: &str, command: Option<&str>) -> Result<Option<Vec<String>>, IdentificationError> {
    let command = match command {
        Some(cmd) if !cmd.trim().is_empty() => cmd,
        _ => return Ok(None),
    };
    match shell_words::split(command) {
        Ok(parts) if !parts.is_empty() => Ok(Some(parts)),
        _ => Err(IdentificationError::NotConfigured(format!(
            "{} is invalid: {}",
            name, command
        ))),
    }
}

impl CommandIdentifier {
    /// Build from the configured command lines. Missing commands are allowed;
    /// identification then fails at run time and the visit gets the
    /// `MANUAL_CHECK` sentinel.
    pub fn from_commands(
        capture_command: Option<&str>,
        recognizer_command: Option<&str>,
    ) -> Result<Self, IdentificationError> {
        Ok(Self {
            capture: split_command("capture_command", capture_command)?,
            recognizer: split_command("recognizer_command", recognizer_command)?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.capture.is_some() && self.recognizer.is_some()
    }

    async fn capture(&self) -> Result<Vec<u8>, IdentificationError> {
        let parts = self
            .capture
            .as_ref()
            .ok_or_else(|| IdentificationError::NotConfigured("capture_command is not set".to_string()))?;

        let output = run(parts, None).await?;
        if output.is_empty() {
            return Err(IdentificationError::EmptySnapshot);
        }
        Ok(output)
    }

    async fn recognize(&self, jpeg: Vec<u8>) -> Result<Identification, IdentificationError> {
        let parts = self.recognizer.as_ref().ok_or_else(|| {
            IdentificationError::NotConfigured("recognizer_command is not set".to_string())
        })?;

        let stdout = run(parts, Some(jpeg)).await?;
        parse_recognizer_output(&String::from_utf8_lossy(&stdout))
    }

    async fn identify_inner(&self) -> Result<Identification, IdentificationError> {
        let jpeg = self.capture().await?;
        let digest = format!("{:x}", Sha256::digest(&jpeg));
        debug!(bytes = jpeg.len(), %digest, "snapshot captured");

        let identification = self.recognize(jpeg).await?;
        debug!(
            identifier = %identification.identifier,
            confidence = identification.confidence,
            "vehicle recognized"
        );
        Ok(identification.with_snapshot_digest(digest))
    }
}

impl VehicleIdentifier for CommandIdentifier {
    fn identify(&self) -> impl Future<Output = Result<Identification, IdentificationError>> + Send {
        self.identify_inner()
    }
}

/// Run a command, optionally feeding `stdin`, and return its stdout
async fn run(parts: &[String], stdin: Option<Vec<u8>>) -> Result<Vec<u8>, IdentificationError> {
    let (program, args) = parts
        .split_first()
        .ok_or_else(|| IdentificationError::NotConfigured("empty command".to_string()))?;
    let program = program.clone();
    let mut cmd = Command::new(&program);
    cmd.args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| IdentificationError::Spawn {
        program: program.clone(),
        reason: e.to_string(),
    })?;

    // Feed stdin concurrently so a chatty child cannot dead-lock on a full pipe
    let writer = match (stdin, child.stdin.take()) {
        (Some(data), Some(mut pipe)) => Some(tokio::spawn(async move {
            let result = pipe.write_all(&data).await;
            drop(pipe);
            result
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| IdentificationError::Failed {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    if let Some(writer) = writer {
        if let Ok(Err(e)) = writer.await {
            // The child may legitimately stop reading early
            warn!(%program, error = %e, "could not write snapshot to recognizer");
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IdentificationError::Failed {
            program,
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    Ok(output.stdout)
}
