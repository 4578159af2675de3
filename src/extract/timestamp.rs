use chrono::NaiveDateTime;

use crate::error::{ExtractError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const FRACTION_DIGITS: usize = 6;

/// Normalizes the fractional seconds of a timestamp to exactly six digits
/// followed by `Z`.
///
/// Extra digits are cut, missing ones are padded with zeros and whatever
/// followed the digits (zone marker or offset) is replaced by `Z`. Timestamps
/// without a fractional part are returned unchanged.
pub fn truncate_microseconds(timestamp: &str) -> String {
    let Some(dot) = timestamp.find('.') else {
        return timestamp.to_string();
    };

    let (prefix, rest) = timestamp.split_at(dot + 1);
    let digits: String = rest
        .chars()
        .take_while(char::is_ascii_digit)
        .take(FRACTION_DIGITS)
        .collect();

    format!("{prefix}{digits:0<width$}Z", width = FRACTION_DIGITS)
}

pub fn parse_timestamp(timestamp: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&truncate_microseconds(timestamp), TIMESTAMP_FORMAT).map_err(
        |_| ExtractError::InvalidTimestamp {
            value: timestamp.to_string(),
        },
    )
}

/// Seconds elapsed between two timestamps, at microsecond precision.
pub fn duration_seconds(start: &str, finish: &str) -> Result<f64> {
    let elapsed = parse_timestamp(finish)? - parse_timestamp(start)?;

    // Microseconds only overflow past ~292k years.
    let micros = elapsed
        .num_microseconds()
        .ok_or_else(|| ExtractError::InvalidTimestamp {
            value: finish.to_string(),
        })?;

    Ok(micros as f64 / 1_000_000.0)
}
