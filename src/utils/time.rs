use chrono::NaiveDateTime;

use crate::constants::FILETIME_EPOCH_OFFSET_SECS;

/// Seconds since the Unix epoch for a FILETIME value. `0` stays `0`
/// (never), the max value maps to `-1`.
pub fn filetime_to_unix(filetime: i64) -> i64 {
    match filetime {
        i64::MAX => -1,
        ft if ft <= 0 => 0,
        ft => ft / 10_000_000 - FILETIME_EPOCH_OFFSET_SECS,
    }
}

/// Seconds since the Unix epoch for an LDAP generalized time
/// (`20220618042640.0Z`)
pub fn generalized_time_to_unix(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M%S%.fZ")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetime_conversion() {
        assert_eq!(filetime_to_unix(0), 0);
        assert_eq!(filetime_to_unix(i64::MAX), -1);
        assert_eq!(filetime_to_unix(116_444_736_000_000_000), 0);
        assert_eq!(filetime_to_unix(133_000_000_000_000_000), 1_655_526_400);
    }

    #[test]
    fn test_generalized_time() {
        assert_eq!(generalized_time_to_unix("20220618042640.0Z"), Some(1_655_526_400));
        assert!(generalized_time_to_unix("yesterday").is_none());
    }
}
