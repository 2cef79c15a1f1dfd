//! Race mark parsing and formatting
//!
//! Cross-country marks are reported as `M:SS` or `M:SS.s` (minutes may run
//! past 59, e.g. `61:02.3` for a slow 10K). Anything else, including the
//! live feed's "In Progress" marker, is treated as unparseable.

/// Parse a race mark into seconds.
///
/// Accepts `M+:SS[.s+]`. Returns `None` for malformed marks rather than an
/// error so callers can degrade the affected field to null.
///
/// # Examples
///
/// ```
/// use xcd_common::race_time::parse_race_time;
///
/// assert_eq!(parse_race_time("23:01.5"), Some(1381.5));
/// assert_eq!(parse_race_time("4:05"), Some(245.0));
/// assert_eq!(parse_race_time("In Progress"), None);
/// assert_eq!(parse_race_time("1:02:03"), None);
/// ```
pub fn parse_race_time(mark: &str) -> Option<f64> {
    let mark = mark.trim();
    let (minutes, seconds) = mark.split_once(':')?;

    if minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    if whole.len() != 2 || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if seconds >= 60.0 {
        return None;
    }

    Some(minutes as f64 * 60.0 + seconds)
}

/// Format seconds as a race mark `M:SS.s`, rounded to tenths.
///
/// # Examples
///
/// ```
/// use xcd_common::race_time::format_race_time;
///
/// assert_eq!(format_race_time(1381.4), "23:01.4");
/// assert_eq!(format_race_time(59.96), "1:00.0");
/// assert_eq!(format_race_time(5.0), "0:05.0");
/// ```
pub fn format_race_time(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let remainder = tenths % 600;
    format!("{}:{:02}.{}", minutes, remainder / 10, remainder % 10)
}

/// Mean of a set of marks, formatted.
///
/// Returns `None` unless every mark parses.
pub fn mean_race_time<'a, I>(marks: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = 0.0;
    let mut count = 0usize;
    for mark in marks {
        total += parse_race_time(mark)?;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(format_race_time(total / count as f64))
}
