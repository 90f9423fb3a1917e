//! Time zone resolution for date range filters

use crate::error::{Error, Result};
use chrono_tz::Tz;
use tracing::debug;

/// Validate an IANA zone name, falling back to the local zone when empty
pub fn resolve(zone: Option<&str>) -> Result<String> {
    match zone.map(str::trim).filter(|z| !z.is_empty()) {
        Some(name) => name
            .parse::<Tz>()
            .map(|tz| tz.name().to_string())
            .map_err(|_| Error::InvalidTimeZone(name.to_string())),
        None => Ok(local_zone()),
    }
}

/// Name of the process-local zone
///
/// `TZ` wins when it names a valid zone, then the system setting, then UTC.
pub fn local_zone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        let tz = tz.trim_start_matches(':');
        if tz.parse::<Tz>().is_ok() {
            return tz.to_string();
        }
    }
    match iana_time_zone::get_timezone() {
        Ok(name) => name,
        Err(e) => {
            debug!("Could not detect local time zone, using UTC: {}", e);
            "UTC".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_zone() {
        assert_eq!(resolve(Some("Asia/Shanghai")).unwrap(), "Asia/Shanghai");
    }

    #[test]
    fn test_unknown_zone_is_an_error() {
        let err = resolve(Some("Mars/Olympus_Mons")).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeZone(ref z) if z == "Mars/Olympus_Mons"));
    }

    #[test]
    fn test_blank_zone_falls_back_to_local() {
        assert!(!resolve(Some("  ")).unwrap().is_empty());
        assert!(!resolve(None).unwrap().is_empty());
    }
}
