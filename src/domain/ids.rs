/// Record ids embed a creation timestamp: `prt_`/`msg_` followed by a hex
/// counter whose first 11 digits are epoch milliseconds. Anything outside
/// a sane epoch window is treated as a non-timestamp id.
const ID_TIMESTAMP_MIN_MS: i64 = 1_600_000_000_000;
const ID_TIMESTAMP_MAX_MS: i64 = 2_000_000_000_000;

const ID_TIMESTAMP_HEX_DIGITS: usize = 11;

pub fn extract_timestamp_from_id(id: &str) -> Option<i64> {
    let rest = id
        .strip_prefix("prt_")
        .or_else(|| id.strip_prefix("msg_"))?;

    let hex: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || ('a'..='f').contains(c))
        .take(ID_TIMESTAMP_HEX_DIGITS)
        .collect();
    if hex.is_empty() {
        return None;
    }

    let timestamp = i64::from_str_radix(&hex, 16).ok()?;
    if timestamp > ID_TIMESTAMP_MIN_MS && timestamp < ID_TIMESTAMP_MAX_MS {
        Some(timestamp)
    } else {
        None
    }
}
