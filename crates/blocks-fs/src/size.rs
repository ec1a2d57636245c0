const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count with the largest unit in which the value is at least 1.
///
/// Values are rounded to two decimals; sizes beyond the table stay in PB.
pub fn human_readable(bytes: u64) -> String {
    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_stay_in_bytes() {
        assert_eq!(human_readable(0), "0 B");
        assert_eq!(human_readable(1), "1 B");
        assert_eq!(human_readable(1023), "1023 B");
    }

    #[test]
    fn test_unit_boundaries() {
        assert_eq!(human_readable(1024), "1 KB");
        assert_eq!(human_readable(1536), "1.5 KB");
        assert_eq!(human_readable(5 * 1024 * 1024), "5 MB");
        assert_eq!(human_readable(3 * 1024u64.pow(3) + 1024u64.pow(3) / 4), "3.25 GB");
    }

    #[test]
    fn test_exponent_is_clamped() {
        assert_eq!(human_readable(2048 * 1024u64.pow(5)), "2048 PB");
        assert!(human_readable(u64::MAX).ends_with(" PB"));
    }
}
