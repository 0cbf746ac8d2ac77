//! Parsing of recognizer output

use serde::Deserialize;
use weighbridge_types::{Identification, IdentificationError};

#[derive(Debug, Deserialize)]
struct RecognizerReply {
    #[serde(default, alias = "licensePlate", alias = "plate")]
    identifier: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Cut the JSON object out of output that may carry prose or a fenced block
fn extract_json(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (start < end).then(|| &output[start..=end])
}

/// Turn recognizer stdout into an identification.
///
/// Blank output means nothing was recognized and yields `UNKNOWN`.
pub fn parse_recognizer_output(output: &str) -> Result<Identification, IdentificationError> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Identification::unknown());
    }

    let json = extract_json(output)
        .ok_or_else(|| IdentificationError::Parse(format!("no JSON object in: {}", output)))?;
    let reply: RecognizerReply = serde_json::from_str(json)
        .map_err(|e| IdentificationError::Parse(format!("{} - response: {}", e, json)))?;

    let identifier = reply.identifier.unwrap_or_default();
    Ok(Identification::new(identifier.trim(), reply.confidence.unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weighbridge_types::SENTINEL_UNKNOWN;

    #[test]
    fn test_plain_json() {
        let id = parse_recognizer_output(r#"{"identifier": "ABC123", "confidence": 0.93}"#).unwrap();
        assert_eq!(id.identifier, "ABC123");
        assert!((id.confidence - 0.93).abs() < 1e-9);
    }

    #[test]
    fn test_license_plate_alias_in_fenced_block() {
        let output = "Here you go:\n```json\n{\"licensePlate\": \" KM 130 1122 \", \"confidence\": 0.7}\n```\n";
        let id = parse_recognizer_output(output).unwrap();
        assert_eq!(id.identifier, "KM 130 1122");
    }

    #[test]
    fn test_blank_output_is_unknown() {
        assert_eq!(parse_recognizer_output("  \n").unwrap().identifier, SENTINEL_UNKNOWN);
    }

    #[test]
    fn test_missing_identifier_is_unknown() {
        let id = parse_recognizer_output(r#"{"confidence": 0.1}"#).unwrap();
        assert_eq!(id.identifier, SENTINEL_UNKNOWN);
    }

    #[test]
    fn test_recognizer_sentinel_passes_through() {
        let id = parse_recognizer_output(r#"{"identifier": "UNKNOWN", "confidence": 0}"#).unwrap();
        assert!(id.is_sentinel());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            parse_recognizer_output("segfault"),
            Err(IdentificationError::Parse(_))
        ));
        assert!(matches!(
            parse_recognizer_output("{not json}"),
            Err(IdentificationError::Parse(_))
        ));
    }
}
