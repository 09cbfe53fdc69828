//! Memory parsing utilities for PBS resource fields.

/// Parse a PBS memory string to megabytes.
///
/// Handles the unit suffixes PBS writes in `resources_used.mem`,
/// `resources_used.vmem` and `Resource_List.pmem`: "2048kb", "512mb", "4gb",
/// "1tb", "1024b" and a bare number of bytes. Suffixes are case-insensitive
/// and `w` (word) units are treated as bytes.
///
/// Returns None for empty strings, unrecognized units, or sizes that
/// overflow `u64` megabytes.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim().to_ascii_lowercase();
    if s.is_empty() || s == "-" {
        return None;
    }

    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let value: u64 = s[..digits_end].parse().ok()?;
    let unit = &s[digits_end..];

    match unit {
        "" | "b" | "w" => Some(value / (1024 * 1024)),
        "kb" | "kw" => Some(value / 1024),
        "mb" | "mw" => Some(value),
        "gb" | "gw" => value.checked_mul(1024),
        "tb" | "tw" => value.checked_mul(1024 * 1024),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_mb() {
        assert_eq!(parse_memory_mb("2097152kb"), Some(2048));
        assert_eq!(parse_memory_mb("512mb"), Some(512));
        assert_eq!(parse_memory_mb("4gb"), Some(4096));
        assert_eq!(parse_memory_mb("4GB"), Some(4096));
        assert_eq!(parse_memory_mb("1048576"), Some(1));
        assert_eq!(parse_memory_mb(""), None);
        assert_eq!(parse_memory_mb("-"), None);
        assert_eq!(parse_memory_mb("lots"), None);
        assert_eq!(parse_memory_mb("4xb"), None);
    }

    #[test]
    fn test_parse_memory_mb_overflow() {
        assert_eq!(parse_memory_mb("18446744073709551615tb"), None);
        assert_eq!(parse_memory_mb("18446744073709551615gb"), None);
        assert_eq!(
            parse_memory_mb("17592186044415tb"),
            Some(17_592_186_044_415 * 1024 * 1024)
        );
        // Too many digits for u64 at all
        assert_eq!(parse_memory_mb("99999999999999999999kb"), None);
    }
}
