//! Memory parsing for LSF resource strings (`gmem=`, `mem=`).

/// Parse an LSF memory string to megabytes.
///
/// Handles "16G", "16GB", "16 GB", "512M", "4096K", "1T" and bare numbers
/// (taken as MB). Fractional values like "4.5G" are accepted.
///
/// Returns None for empty strings or anything unrecognised.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let value: f64 = number.parse().ok()?;
    if value < 0.0 {
        return None;
    }

    let factor = match unit.trim().to_uppercase().as_str() {
        "T" | "TB" => 1024.0 * 1024.0,
        "G" | "GB" => 1024.0,
        "M" | "MB" | "" => 1.0,
        "K" | "KB" => 1.0 / 1024.0,
        _ => return None,
    };

    Some((value * factor) as u64)
}
