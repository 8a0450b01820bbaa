use std::time::{SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn unix_ms_to_rfc3339(ms: i64) -> Option<String> {
    let nanos: i128 = i128::from(ms).saturating_mul(1_000_000);
    let timestamp = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    timestamp.format(&Rfc3339).ok()
}

pub fn system_time_to_unix_ms(value: SystemTime) -> Option<i64> {
    let delta = value.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(delta.as_millis()).ok()
}

pub fn now_unix_ms() -> i64 {
    system_time_to_unix_ms(SystemTime::now()).unwrap_or(0)
}

/// Compact "how long ago" label for listings. Unknown timestamps (0 or in
/// the future beyond clock skew) come back as a dash.
pub fn format_relative(ms: i64, now_ms: i64) -> String {
    if ms <= 0 {
        return "-".to_string();
    }
    let delta_s = (now_ms.saturating_sub(ms)) / 1000;
    if delta_s < 0 {
        return "-".to_string();
    }
    if delta_s < 60 {
        return format!("{delta_s}s ago");
    }
    let minutes = delta_s / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    format!("{days}d ago")
}
