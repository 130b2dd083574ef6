use lazy_static::lazy_static;
use regex::Regex;

use crate::commands::giveaway::models::MILLIS_PER_MINUTE;
use crate::error::{Error, Result};

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(
        r"^(?:(?P<days>\d+)\s*d)?\s*(?:(?P<hours>\d+)\s*h)?\s*(?:(?P<minutes>\d+)\s*m(?:in)?)?$"
    )
    .unwrap();
    static ref HOURS_REGEX: Regex = Regex::new(r"^(?P<hours>\d+)$").unwrap();
}

#[readonly::make]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParsedDuration {
    pub millis: i64,
    // Normalized form, e.g. `1d2h30m`.
    pub label: String,
}

fn invalid_duration(text: &str) -> Error {
    let message = format!(
        "Can't understand the `{}` duration. Use something like `2h`, `90m` or `1d12h`.",
        text
    );
    Error::Validation(message)
}

fn capture_number(captures: &regex::Captures, name: &str, text: &str) -> Result<i64> {
    match captures.name(name) {
        Some(value) => value
            .as_str()
            .parse::<i64>()
            .map_err(|_| invalid_duration(text)),
        None => Ok(0),
    }
}

fn build_label(total_minutes: i64) -> String {
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    let mut label = String::new();
    if days > 0 {
        label.push_str(&format!("{}d", days));
    }
    if hours > 0 {
        label.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        label.push_str(&format!("{}m", minutes));
    }
    label
}

// Parses durations like `2h`, `45m`, `1d12h` or `1h30m`. A bare number is
// read as hours.
pub fn parse_duration(text: &str) -> Result<ParsedDuration> {
    let trimmed = text.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(invalid_duration(text));
    }

    let (days, hours, minutes) = match HOURS_REGEX.captures(&trimmed) {
        Some(captures) => (0, capture_number(&captures, "hours", text)?, 0),
        None => {
            let captures = DURATION_REGEX
                .captures(&trimmed)
                .ok_or_else(|| invalid_duration(text))?;
            (
                capture_number(&captures, "days", text)?,
                capture_number(&captures, "hours", text)?,
                capture_number(&captures, "minutes", text)?,
            )
        }
    };

    let total_minutes = days
        .checked_mul(24 * 60)
        .and_then(|value| value.checked_add(hours.checked_mul(60)?))
        .and_then(|value| value.checked_add(minutes))
        .ok_or_else(|| invalid_duration(text))?;
    if total_minutes == 0 {
        return Err(Error::Validation("The duration must be positive.".to_string()));
    }

    let millis = total_minutes
        .checked_mul(MILLIS_PER_MINUTE)
        .ok_or_else(|| invalid_duration(text))?;

    Ok(ParsedDuration {
        millis,
        label: build_label(total_minutes),
    })
}
