//! Tolerant progress-token parsing for downloader output.
//!
//! The downloader reports progress as percentage tokens (`42%`, `99.5%`)
//! mixed into ordinary log lines. Parsing is tolerant by design: lines
//! without a valid token are ignored rather than failing the job, and
//! out-of-range values are clamped. A closed stream without a terminal
//! token means "unknown", deferring the verdict to the process exit code.

/// Extract the progress percentage from one output line.
///
/// Scans for `%` signs and parses the numeric run immediately before each;
/// the last valid token on the line wins. Returns `None` when the line
/// carries no valid token.
pub(crate) fn percent_token(line: &str) -> Option<f64> {
    let bytes = line.as_bytes();
    let mut found = None;

    for (idx, &b) in bytes.iter().enumerate() {
        if b != b'%' {
            continue;
        }

        // Walk back over the numeric run ending here
        let mut start = idx;
        while start > 0 {
            let c = bytes[start - 1];
            if c.is_ascii_digit() || c == b'.' {
                start -= 1;
            } else {
                break;
            }
        }

        if start == idx {
            continue; // bare '%' with no digits
        }

        // line is valid UTF-8 and the run is pure ASCII
        if let Ok(value) = line[start..idx].parse::<f64>() {
            if value.is_finite() {
                found = Some(value.clamp(0.0, 100.0));
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_tokens() {
        assert_eq!(percent_token("42%"), Some(42.0));
        assert_eq!(percent_token("  99.5%  "), Some(99.5));
        assert_eq!(percent_token("downloading: 7%"), Some(7.0));
    }

    #[test]
    fn last_valid_token_wins() {
        assert_eq!(percent_token("chunk 3/10 (30%) total 12%"), Some(12.0));
        assert_eq!(percent_token("12% then garbage .% end"), Some(12.0));
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(percent_token("150%"), Some(100.0));
        assert_eq!(percent_token("999.9%"), Some(100.0));
    }

    #[test]
    fn ignores_lines_without_tokens() {
        assert_eq!(percent_token(""), None);
        assert_eq!(percent_token("connecting to mirror..."), None);
        assert_eq!(percent_token("%"), None);
        assert_eq!(percent_token("100 percent"), None);
    }

    #[test]
    fn ignores_malformed_numbers() {
        // Multiple dots do not parse; the earlier valid token is kept
        assert_eq!(percent_token("at 55% then 1.2.3%"), Some(55.0));
        assert_eq!(percent_token("..%"), None);
    }

    #[test]
    fn handles_non_ascii_lines() {
        assert_eq!(percent_token("récupération 33% café"), Some(33.0));
        assert_eq!(percent_token("进度 66.6%"), Some(66.6));
    }
}
