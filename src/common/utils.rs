//! Utility functions for minivote

use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current Unix time as fractional seconds (wall clock, used for
/// `serverTime`, login times and deadlines).
pub fn unix_time_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Render Unix seconds as an RFC 3339 string; out-of-range values fall back
/// to the raw number.
pub fn format_unix_time(secs: f64) -> String {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    match DateTime::<Utc>::from_timestamp(whole as i64, nanos) {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{}", secs),
    }
}

/// Trim and validate a voter name supplied by a caller.
pub fn validate_name(name: &str) -> crate::Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(crate::Error::InvalidRequest("name cannot be empty".into()));
    }
    if name.len() > 256 {
        return Err(crate::Error::InvalidRequest(
            "name too long (max 256 bytes)".into(),
        ));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(crate::Error::InvalidRequest(
            "name contains invalid characters".into(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_time_now_is_recent() {
        // 2020-01-01
        assert!(unix_time_now() > 1_577_836_800.0);
    }

    #[test]
    fn test_format_unix_time() {
        assert_eq!(format_unix_time(0.0), "1970-01-01T00:00:00+00:00");
        assert!(format_unix_time(1_700_000_000.5).starts_with("2023-11-14T22:13:20.5"));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Kim ").unwrap(), "Kim");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("bad\nname").is_err());
        assert!(validate_name(&"x".repeat(300)).is_err());
    }
}
