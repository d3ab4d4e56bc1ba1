//! Time-related utilities

/// Format a nanosecond offset as milliseconds with four decimals
pub fn format_msec(nanos: u64) -> String {
    format!("{:.4}", nanos as f64 / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_msec() {
        assert_eq!(format_msec(0), "0.0000");
        assert_eq!(format_msec(1_500_000), "1.5000");
        assert_eq!(format_msec(123), "0.0001");
    }
}
