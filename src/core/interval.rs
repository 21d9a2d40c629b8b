//! Compact interval strings such as `"4s"`, `"1m"` or `"250ms"`.

use crate::utils::error::{Result, SchedulerError};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Longest interval accepted by [`parse_interval`].
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(ms|s|m|h|d)?$").expect("interval pattern is valid")
});

/// Parse `<integer><unit>` where unit is one of `ms`, `s`, `m`, `h`, `d`.
/// A bare integer is read as seconds. Values above [`MAX_INTERVAL`] are rejected.
pub fn parse_interval(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    let invalid = |reason: &str| SchedulerError::InvalidInterval {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("interval cannot be empty"));
    }

    let caps = INTERVAL_RE
        .captures(trimmed)
        .ok_or_else(|| invalid("expected <number><ms|s|m|h|d>"))?;

    let amount: u64 = caps[1]
        .parse()
        .map_err(|_| invalid("number is out of range"))?;
    if amount == 0 {
        return Err(invalid("interval must be greater than zero"));
    }

    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "s".to_string());

    let interval = match unit.as_str() {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(60 * 60).map(Duration::from_secs),
        "d" => amount.checked_mul(24 * 60 * 60).map(Duration::from_secs),
        _ => return Err(invalid("unknown unit")),
    };

    match interval {
        Some(interval) if interval <= MAX_INTERVAL => Ok(interval),
        _ => Err(invalid("interval exceeds 365d")),
    }
}

/// Render a duration in the largest unit that divides it evenly.
pub fn format_interval(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        return format!("{}ms", millis);
    }

    let secs = duration.as_secs();
    match secs {
        0 => "0s".to_string(),
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{}s", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_common_units() {
        assert_eq!(parse_interval("4s").unwrap(), Duration::from_secs(4));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_interval("1d").unwrap(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_parse_is_lenient_on_case_and_whitespace() {
        assert_eq!(parse_interval(" 10S ").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_interval("30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        for value in ["", "0s", "abc", "-1s", "1.5s", "4 weeks", "s"] {
            assert!(
                matches!(parse_interval(value), Err(SchedulerError::InvalidInterval { .. })),
                "expected '{}' to be rejected",
                value
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(parse_interval("99999999999999999999d").is_err());
        assert!(parse_interval("18446744073709551615d").is_err());
        assert!(parse_interval("10000000000000000000s").is_err());
        assert!(parse_interval("10000000000000000000ms").is_err());
    }

    #[test]
    fn test_parse_caps_at_one_year() {
        assert_eq!(parse_interval("365d").unwrap(), MAX_INTERVAL);
        assert_eq!(parse_interval("8760h").unwrap(), MAX_INTERVAL);
        assert!(matches!(
            parse_interval("366d"),
            Err(SchedulerError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(4)), "4s");
        assert_eq!(format_interval(Duration::from_secs(60)), "1m");
        assert_eq!(format_interval(Duration::from_secs(90)), "90s");
        assert_eq!(format_interval(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_interval(Duration::from_secs(7_200)), "2h");
    }
}
