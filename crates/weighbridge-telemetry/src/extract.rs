//! Max-magnitude token selection
//!
//! Indicator output mixes status codes with the reading, e.g.
//! `ST,GS,+  20340 kg`. Every maximal `[+-]?\d+(\.\d+)?` token on the line is
//! collected and the one with the largest absolute value is taken as the
//! weight. This is accurate as long as the weight is the largest number the
//! device prints on a line; a protocol-specific parser should replace it when
//! the device format is known.

/// All numeric tokens on a line, in order
pub fn numeric_tokens(line: &str) -> Vec<f64> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let signed = matches!(bytes[i], b'+' | b'-')
            && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit());
        if !signed && !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        if signed {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }

        // The token is pure ASCII, so slicing on these offsets is safe
        if let Ok(value) = line[start..i].parse::<f64>() {
            if value.is_finite() {
                tokens.push(value);
            }
        }
    }

    tokens
}

/// Weight reading for a line, or `None` when the line carries no number
pub fn extract_weight(line: &str) -> Option<f64> {
    numeric_tokens(line).into_iter().reduce(|best, candidate| {
        let (b, c) = (best.abs(), candidate.abs());
        if c > b || (c == b && candidate > best) {
            candidate
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefixed_line() {
        assert_eq!(extract_weight("ST,GS,+  20340 kg"), Some(20340.0));
    }

    #[test]
    fn test_plain_padded_value() {
        assert_eq!(extract_weight("   1500"), Some(1500.0));
    }

    #[test]
    fn test_no_number() {
        assert_eq!(extract_weight("no data"), None);
        assert_eq!(extract_weight(""), None);
        assert_eq!(extract_weight("+-. kg"), None);
    }

    #[test]
    fn test_tokens() {
        assert_eq!(numeric_tokens("ST,01,+12.5,-3 kg"), vec![1.0, 12.5, -3.0]);
        assert_eq!(numeric_tokens("1.2.3"), vec![1.2, 3.0]);
        assert_eq!(numeric_tokens("5-3"), vec![5.0, -3.0]);
        assert_eq!(numeric_tokens("--5"), vec![-5.0]);
        assert_eq!(numeric_tokens("7."), vec![7.0]);
        assert_eq!(numeric_tokens(".5"), vec![5.0]);
    }

    #[test]
    fn test_largest_magnitude_keeps_sign() {
        assert_eq!(extract_weight("US,GS,-1500 kg 02"), Some(-1500.0));
        assert_eq!(extract_weight("ID 3 W 12480.5"), Some(12480.5));
    }

    #[test]
    fn test_magnitude_tie_prefers_positive() {
        assert_eq!(extract_weight("-20 +20"), Some(20.0));
    }

    #[test]
    fn test_non_ascii_text_is_skipped() {
        assert_eq!(extract_weight("重量 12000 kg"), Some(12000.0));
    }
}
