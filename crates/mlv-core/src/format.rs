//! Human-readable renderings of log metadata.

use crate::types::LogDescriptor;
use chrono::{DateTime, Local, TimeZone};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// `1536` → `"1.5 KB"`. One decimal below 100 of a unit, none above or for
/// plain bytes.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    if value >= 100.0 || exponent == 0 {
        format!("{value:.0} {}", UNITS[exponent])
    } else {
        format!("{value:.1} {}", UNITS[exponent])
    }
}

/// Epoch seconds in the local timezone.
pub fn format_mtime(mtime: i64) -> Option<String> {
    format_mtime_in(mtime, &Local)
}

pub fn format_mtime_in<Tz: TimeZone>(mtime: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(mtime, 0)?;
    Some(utc.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string())
}

/// `size • mtime`, omitting whatever the server did not report.
pub fn subtitle(log: &LogDescriptor) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(size) = log.size {
        parts.push(format_size(size));
    }
    if let Some(when) = log.mtime.filter(|m| *m != 0).and_then(format_mtime) {
        parts.push(when);
    }
    parts.join(" • ")
}
