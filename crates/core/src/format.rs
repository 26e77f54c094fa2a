//! Human-readable renderings of engine results, used for log lines only.

const SIZE_UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
const TIME_UNITS: [&str; 3] = ["seconds", "minutes", "hours"];

/// Formats a byte count, scaling by 1024 until the value drops below 1024 or
/// the largest unit is reached. Scaling truncates, so `1536` is `1 KB`.
pub fn human_size(bytes: impl Into<i128>) -> String {
    let mut value = bytes.into();
    let last = SIZE_UNITS.len() - 1;
    let mut unit = 0;
    while value >= 1024 && unit < last {
        value >>= 10;
        unit += 1;
    }
    format!("{value} {}", SIZE_UNITS[unit])
}

/// Formats a duration given in seconds, escalating to minutes and hours.
pub fn human_time(seconds: f64) -> String {
    let mut value = seconds;
    let last = TIME_UNITS.len() - 1;
    let mut unit = 0;
    while value >= 60.0 && unit < last {
        value /= 60.0;
        unit += 1;
    }
    format!("{value:.1} {}", TIME_UNITS[unit])
}

/// Renders an integer with `,` thousands separators.
pub fn format_integer(value: impl Into<i128>) -> String {
    let value = value.into();
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
