//! PostgreSQL size strings as printed by `SHOW`.

/// Parses `SHOW` output such as `3276MB`, `2GB`, `8kB`, `1TB` or `128` into kB.
///
/// Unitless values are returned unchanged so counts like `max_connections` compare
/// through the same path. Byte values round down to whole kB.
#[must_use]
pub fn parse_pg_size(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value = digits.parse::<u64>().ok()?;

    match unit.trim() {
        "" | "kB" => Some(value),
        "B" => Some(value / 1024),
        "MB" => value.checked_mul(1024),
        "GB" => value.checked_mul(1024 * 1024),
        "TB" => value.checked_mul(1024 * 1024 * 1024),
        _ => None,
    }
}

/// Size-aware equality: `2GB` equals `2048MB`. Non-size values compare as trimmed text.
///
/// A plain count never equals a size, so `128` and `128kB` differ.
#[must_use]
pub fn settings_equal(expected: &str, actual: &str) -> bool {
    match (parse_pg_size(expected), parse_pg_size(actual)) {
        (Some(a), Some(b)) if is_unitless(expected) == is_unitless(actual) => a == b,
        _ => expected.trim() == actual.trim(),
    }
}

fn is_unitless(raw: &str) -> bool {
    raw.trim().bytes().all(|b| b.is_ascii_digit())
}
