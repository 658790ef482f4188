//! Field encoders and decoders shared by packets, responses and broadcasts.
//!
//! Numbers travel as little-endian hex strings. Times of day are encoded as a
//! full unix timestamp for today's date, so the functions that deal with them
//! take the timezone explicitly and have `Local` convenience wrappers.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone, Utc};

use super::types::{MAINS_VOLTAGE, Weekday};
use crate::error::{Result, SwitcherError};

const MIN_AUTO_SHUTDOWN_SECS: i64 = 3599;
const MAX_AUTO_SHUTDOWN_SECS: i64 = 86341;
const NAME_FIELD_BYTES: usize = 32;

/// Format a second count as `HH:MM:SS`.
pub fn seconds_to_hms(seconds: u32) -> Result<String> {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 99 {
        return Err(SwitcherError::decoding(format!(
            "{seconds} seconds does not fit HH:MM:SS"
        )));
    }
    Ok(format!("{hours:02}:{minutes:02}:{secs:02}"))
}

/// Encode minutes as a 4-byte little-endian second count.
pub fn minutes_to_hex_seconds(minutes: u32) -> Result<String> {
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| SwitcherError::encoding(format!("{minutes} minutes overflows the timer field")))?;
    Ok(hex::encode(seconds.to_le_bytes()))
}

/// Encode an auto-shutdown duration, accepted between 1 and 24 hours.
///
/// Seconds are truncated to whole minutes.
pub fn timedelta_to_hex_seconds(duration: TimeDelta) -> Result<String> {
    let minutes = duration.num_minutes();
    let total = minutes * 60;
    if total > MIN_AUTO_SHUTDOWN_SECS && total < MAX_AUTO_SHUTDOWN_SECS {
        // range already checked, fits u32
        minutes_to_hex_seconds(minutes as u32)
    } else {
        Err(SwitcherError::encoding(
            "can only handle 1 to 24 hours on auto-shutdown set requests",
        ))
    }
}

/// Encode a device name into the fixed 32 byte field.
pub fn name_to_hex(name: &str) -> Result<String> {
    let len = name.len();
    if !(2..=NAME_FIELD_BYTES).contains(&len) {
        return Err(SwitcherError::encoding("name length can vary from 2 to 32"));
    }
    let mut encoded = hex::encode(name.as_bytes());
    encoded.push_str(&"00".repeat(NAME_FIELD_BYTES - len));
    Ok(encoded)
}

/// Decode a zero padded name field.
pub fn hex_to_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

pub fn unix_to_hex_timestamp(timestamp: u32) -> String {
    hex::encode(timestamp.to_le_bytes())
}

/// Current unix time as a little-endian hex timestamp.
pub fn now_to_hex_timestamp() -> Result<String> {
    let now = Utc::now().timestamp();
    let timestamp = u32::try_from(now)
        .map_err(|_| SwitcherError::encoding(format!("clock value {now} out of range")))?;
    Ok(unix_to_hex_timestamp(timestamp))
}

/// Encode today's `HH:MM` in the given timezone as a hex timestamp.
pub fn hms_string_to_hex_timestamp_in<Tz: TimeZone>(hm: &str, tz: &Tz) -> Result<String> {
    let time = NaiveTime::parse_from_str(hm.trim(), "%H:%M")
        .map_err(|e| SwitcherError::encoding(format!("failed to parse time {hm:?}: {e}")))?;
    let today = Utc::now().with_timezone(tz).date_naive();
    let local = tz
        .from_local_datetime(&today.and_time(time))
        .earliest()
        .ok_or_else(|| SwitcherError::encoding(format!("{hm} does not exist today")))?;
    let timestamp = u32::try_from(local.timestamp())
        .map_err(|_| SwitcherError::encoding(format!("{hm} out of timestamp range")))?;
    Ok(unix_to_hex_timestamp(timestamp))
}

pub fn hms_string_to_hex_timestamp(hm: &str) -> Result<String> {
    hms_string_to_hex_timestamp_in(hm, &Local)
}

/// Decode an 8 hex char timestamp to `HH:MM` in the given timezone.
pub fn hex_timestamp_to_hms_string_in<Tz: TimeZone>(hex_ts: &str, tz: &Tz) -> Result<String>
where
    Tz::Offset: std::fmt::Display,
{
    let timestamp = hex_le_u32(hex_ts)?;
    let utc = DateTime::from_timestamp(i64::from(timestamp), 0)
        .ok_or_else(|| SwitcherError::decoding(format!("invalid timestamp {hex_ts}")))?;
    Ok(utc.with_timezone(tz).format("%H:%M").to_string())
}

pub fn hex_timestamp_to_hms_string(hex_ts: &str) -> Result<String> {
    hex_timestamp_to_hms_string_in(hex_ts, &Local)
}

/// Sum the day bits of a non-empty, duplicate free day list as 2 hex chars.
pub fn weekday_set_to_hex(days: &[Weekday]) -> Result<String> {
    let unique: BTreeSet<Weekday> = days.iter().copied().collect();
    if days.is_empty() || unique.len() != days.len() {
        return Err(SwitcherError::encoding("no days requested"));
    }
    let sum = unique.iter().fold(0u8, |acc, day| acc | day.bit());
    Ok(format!("{sum:02x}"))
}

/// Decode a weekday bit-sum, valid between 2 and 254.
///
/// Bit 0 carries no day, so odd sums are rejected.
pub fn hex_to_weekday_set(bit_sum: u8) -> Result<BTreeSet<Weekday>> {
    if bit_sum & 1 == 1 {
        return Err(SwitcherError::decoding(format!(
            "weekdays bit sum {bit_sum:#04x} has the unused low bit set"
        )));
    }
    if bit_sum > 1 && bit_sum < 255 {
        Ok(Weekday::ALL
            .into_iter()
            .filter(|day| day.bit() & bit_sum != 0)
            .collect())
    } else {
        Err(SwitcherError::decoding(
            "weekdays bit sum should be between 2 and 254",
        ))
    }
}

/// Derive electric current from power, rounded to one decimal.
pub fn watts_to_amps(watts: u16) -> f64 {
    (f64::from(watts) / MAINS_VOLTAGE * 10.0).round() / 10.0
}

/// Parse an 8 hex char little-endian field.
pub(crate) fn hex_le_u32(field: &str) -> Result<u32> {
    let bytes: [u8; 4] = hex::decode(field)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| SwitcherError::decoding(format!("invalid 4 byte field {field:?}")))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Parse the first two bytes of a hex field as a little-endian u16.
pub(crate) fn hex_le_u16(field: &str) -> Result<u16> {
    let bytes = hex::decode(field.get(0..4).unwrap_or(field))
        .map_err(|e| SwitcherError::decoding(format!("invalid 2 byte field {field:?}: {e}")))?;
    match bytes.as_slice() {
        [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
        _ => Err(SwitcherError::decoding(format!("invalid 2 byte field {field:?}"))),
    }
}
