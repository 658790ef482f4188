//! Schedule slot records.
//!
//! A slot is 16 bytes on the wire, of which the first 12 carry data:
//!
//! | bytes | field |
//! |---|---|
//! | 0 | id |
//! | 1 | enabled flag (`01`) |
//! | 2 | weekday bit-sum, `00` for one-shot, `fe` for every day |
//! | 3 | state |
//! | 4..8 | start timestamp, u32 LE |
//! | 8..12 | end timestamp, u32 LE |

use std::collections::BTreeSet;

use chrono::{Local, NaiveTime, TimeDelta, TimeZone};
use serde::Serialize;

use super::codec::{hex_le_u32, hex_timestamp_to_hms_string_in, hex_to_weekday_set, hms_string_to_hex_timestamp_in};
use super::types::{EVERY_DAY, NON_RECURRING, SCHEDULE_DATA_SIZE, SCHEDULE_SLOT_SIZE, Weekday};
use crate::error::{Result, SwitcherError};

/// One schedule stored on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSlot {
    pub schedule_id: String,
    pub enabled: bool,
    pub recurring: bool,
    pub days: BTreeSet<Weekday>,
    pub state: u8,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    #[serde(skip)]
    pub start_timestamp: u32,
    #[serde(skip)]
    pub end_timestamp: u32,
}

impl ScheduleSlot {
    /// Build a slot from `HH:MM` times, anchored on today's date in `tz`.
    pub fn new_in<Tz: TimeZone>(
        id: u8,
        enabled: bool,
        days: &[Weekday],
        start: &str,
        end: &str,
        tz: &Tz,
    ) -> Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        let start_timestamp = hex_le_u32(&hms_string_to_hex_timestamp_in(start, tz)?)?;
        let end_timestamp = hex_le_u32(&hms_string_to_hex_timestamp_in(end, tz)?)?;
        let mut raw = [0u8; SCHEDULE_DATA_SIZE];
        raw[0] = id;
        raw[1] = u8::from(enabled);
        raw[2] = days.iter().fold(NON_RECURRING, |acc, day| acc | day.bit());
        raw[3] = 1;
        raw[4..8].copy_from_slice(&start_timestamp.to_le_bytes());
        raw[8..12].copy_from_slice(&end_timestamp.to_le_bytes());
        Self::decode_in(&raw, tz)
    }

    /// Decode a slot, rendering times in the local timezone.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Self::decode_in(raw, &Local)
    }

    pub fn decode_in<Tz: TimeZone>(raw: &[u8], tz: &Tz) -> Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        if raw.len() < SCHEDULE_DATA_SIZE {
            return Err(SwitcherError::decoding(format!(
                "schedule slot needs {SCHEDULE_DATA_SIZE} bytes, got {}",
                raw.len()
            )));
        }

        let weekday_byte = raw[2];
        let recurring = weekday_byte != NON_RECURRING;
        let days = match weekday_byte {
            NON_RECURRING => BTreeSet::new(),
            EVERY_DAY => Weekday::ALL.into_iter().collect(),
            sum => hex_to_weekday_set(sum)?,
        };

        let start_time = hex_timestamp_to_hms_string_in(&hex::encode(&raw[4..8]), tz)?;
        let end_time = hex_timestamp_to_hms_string_in(&hex::encode(&raw[8..12]), tz)?;
        let duration = calc_duration(&start_time, &end_time)?;

        Ok(Self {
            schedule_id: raw[0].to_string(),
            enabled: raw[1] == 1,
            recurring,
            days,
            state: raw[3],
            start_time,
            end_time,
            duration,
            start_timestamp: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            end_timestamp: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        })
    }

    pub fn id(&self) -> Result<u8> {
        self.schedule_id
            .parse()
            .map_err(|_| SwitcherError::encoding(format!("invalid schedule id {:?}", self.schedule_id)))
    }

    /// Full 16 byte record, trailing bytes zeroed.
    pub fn encode(&self) -> Result<[u8; SCHEDULE_SLOT_SIZE]> {
        let mut raw = [0u8; SCHEDULE_SLOT_SIZE];
        raw[..SCHEDULE_DATA_SIZE].copy_from_slice(&self.schedule_data()?);
        Ok(raw)
    }

    /// The 12 bytes carried by enable/disable requests.
    pub fn schedule_data(&self) -> Result<[u8; SCHEDULE_DATA_SIZE]> {
        let mut data = [0u8; SCHEDULE_DATA_SIZE];
        data[0] = self.id()?;
        data[1] = u8::from(self.enabled);
        data[2] = if self.recurring {
            self.days.iter().fold(0, |acc, day| acc | day.bit())
        } else {
            NON_RECURRING
        };
        data[3] = self.state;
        data[4..8].copy_from_slice(&self.start_timestamp.to_le_bytes());
        data[8..12].copy_from_slice(&self.end_timestamp.to_le_bytes());
        Ok(data)
    }
}

/// Time between two `HH:MM` values as `H:MM:SS`, wrapping past midnight.
pub fn calc_duration(start: &str, end: &str) -> Result<String> {
    let parse = |value: &str| {
        NaiveTime::parse_from_str(value, "%H:%M")
            .map_err(|e| SwitcherError::decoding(format!("invalid time {value:?}: {e}")))
    };
    let mut delta = parse(end)? - parse(start)?;
    if delta < TimeDelta::zero() {
        delta = delta + TimeDelta::days(1);
    }
    let secs = delta.num_seconds();
    Ok(format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60))
}

/// Split the slot region of a schedules response into decoded slots.
pub(crate) fn decode_slots_in<Tz: TimeZone>(region: &[u8], tz: &Tz) -> Result<Vec<ScheduleSlot>>
where
    Tz::Offset: std::fmt::Display,
{
    region
        .chunks(SCHEDULE_SLOT_SIZE)
        .map(|chunk| ScheduleSlot::decode_in(chunk, tz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn plus_three() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_decode_recurring_slot() {
        let raw = hex::decode("01010201e06aa35cf078a35c").unwrap();
        let slot = ScheduleSlot::decode_in(&raw, &plus_three()).unwrap();
        assert_eq!(slot.schedule_id, "1");
        assert!(slot.enabled);
        assert!(slot.recurring);
        assert_eq!(slot.days, BTreeSet::from([Weekday::Monday]));
        assert_eq!(slot.state, 1);
        assert_eq!(slot.start_time, "17:00");
        assert_eq!(slot.end_time, "18:00");
        assert_eq!(slot.duration, "1:00:00");
    }

    #[test]
    fn test_decode_every_day_slot() {
        let raw = hex::decode("0201fe01e06aa35cf078a35c").unwrap();
        let slot = ScheduleSlot::decode_in(&raw, &plus_three()).unwrap();
        assert_eq!(slot.days.len(), 7);
        assert!(slot.recurring);
    }

    #[test]
    fn test_decode_non_recurring_disabled_slot() {
        let raw = hex::decode("03000001e06aa35cf078a35c00000000").unwrap();
        let slot = ScheduleSlot::decode_in(&raw, &plus_three()).unwrap();
        assert_eq!(slot.schedule_id, "3");
        assert!(!slot.enabled);
        assert!(!slot.recurring);
        assert!(slot.days.is_empty());
    }

    #[test]
    fn test_decode_short_slot_fails() {
        let raw = hex::decode("01010201e06aa35c").unwrap();
        assert!(matches!(
            ScheduleSlot::decode_in(&raw, &plus_three()),
            Err(SwitcherError::Decoding(_))
        ));
    }

    #[test]
    fn test_decode_invalid_weekday_sum_fails() {
        let raw = hex::decode("01010101e06aa35cf078a35c").unwrap();
        assert!(ScheduleSlot::decode_in(&raw, &plus_three()).is_err());
    }

    #[test]
    fn test_encode_then_decode_is_identity() {
        let tz = plus_three();
        let raw = hex::decode("05012a01e06aa35cf078a35c").unwrap();
        let slot = ScheduleSlot::decode_in(&raw, &tz).unwrap();
        let encoded = slot.encode().unwrap();
        assert_eq!(&encoded[..12], raw.as_slice());
        assert_eq!(&encoded[12..], &[0, 0, 0, 0]);
        assert_eq!(ScheduleSlot::decode_in(&encoded, &tz).unwrap(), slot);
    }

    #[test]
    fn test_encode_then_decode_across_variants() {
        let tz = plus_three();
        let variants = [
            // one-shot
            "07010001e06aa35cf078a35c",
            // every day
            "0201fe01e06aa35cf078a35c",
            // disabled recurring
            "03004201e06aa35cf078a35c",
            // disabled one-shot
            "09000001e06aa35cf078a35c",
            // end before start wraps past midnight
            "0401a001f078a35ce06aa35c",
        ];
        for hex_slot in variants {
            let raw = hex::decode(hex_slot).unwrap();
            let slot = ScheduleSlot::decode_in(&raw, &tz).unwrap();
            let encoded = slot.encode().unwrap();
            assert_eq!(&encoded[..12], raw.as_slice(), "slot {hex_slot}");
            assert_eq!(ScheduleSlot::decode_in(&encoded, &tz).unwrap(), slot);
        }

        let wrapped = ScheduleSlot::decode_in(&hex::decode(variants[4]).unwrap(), &tz).unwrap();
        assert_eq!(wrapped.start_time, "18:00");
        assert_eq!(wrapped.end_time, "17:00");
        assert_eq!(wrapped.duration, "23:00:00");
    }

    #[test]
    fn test_decode_weekday_byte_with_low_bit_fails() {
        let raw = hex::decode("01010301e06aa35cf078a35c").unwrap();
        assert!(matches!(
            ScheduleSlot::decode_in(&raw, &plus_three()),
            Err(SwitcherError::Decoding(_))
        ));
    }

    #[test]
    fn test_new_slot_from_times() {
        let tz = plus_three();
        let slot =
            ScheduleSlot::new_in(4, true, &[Weekday::Sunday, Weekday::Friday], "23:30", "01:15", &tz).unwrap();
        assert_eq!(slot.schedule_id, "4");
        assert_eq!(slot.start_time, "23:30");
        assert_eq!(slot.end_time, "01:15");
        assert_eq!(slot.duration, "1:45:00");
        assert_eq!(slot.schedule_data().unwrap()[2], 0xa0);
    }

    #[test]
    fn test_calc_duration() {
        assert_eq!(calc_duration("17:00", "18:30").unwrap(), "1:30:00");
        assert_eq!(calc_duration("22:00", "02:00").unwrap(), "4:00:00");
        assert_eq!(calc_duration("10:00", "10:00").unwrap(), "0:00:00");
        assert!(calc_duration("1000", "11:00").is_err());
    }

    #[test]
    fn test_decode_slots_region() {
        let region = hex::decode(
            "01010201e06aa35cf078a35c0000000002000001e06aa35cf078a35c00000000",
        )
        .unwrap();
        let slots = decode_slots_in(&region, &plus_three()).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].schedule_id, "2");
    }
}
