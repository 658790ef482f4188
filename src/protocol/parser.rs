//! Response decoding at fixed offsets.
//!
//! Responses are flat records: every field sits at a known hex-character
//! position of the hexlified buffer. Offsets are bounds-checked so a short
//! buffer becomes a [`SwitcherError::Decoding`] rather than a panic.

use std::ops::Range;

use chrono::{Local, TimeZone};
use serde::Serialize;

use super::codec::{hex_le_u16, hex_le_u32, seconds_to_hms, watts_to_amps};
use super::schedule::{ScheduleSlot, decode_slots_in};
use super::types::{DeviceState, ProtocolVersion, ResponseKind, SCHEDULES_HEADER_HEX, SCHEDULES_TRAILER_HEX};
use crate::error::{Result, SwitcherError};

const LOGIN_SESSION: Range<usize> = 16..24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateResponse {
    pub state: DeviceState,
    pub power_w: u16,
    pub current_a: f64,
    pub time_left: String,
    /// Not reported by [`ProtocolVersion::Legacy`] devices.
    pub time_on: Option<String>,
    pub auto_shutdown: String,
}

/// Shared shape of control, name, auto-shutdown and schedule edit replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AckResponse {
    pub kind: ResponseKind,
    pub successful: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulesResponse {
    pub slots: Vec<ScheduleSlot>,
}

impl SchedulesResponse {
    pub fn found_schedules(&self) -> bool {
        !self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseMessage {
    Login(LoginResponse),
    State(StateResponse),
    Ack(AckResponse),
    Schedules(SchedulesResponse),
}

/// Slice a field, failing instead of panicking when the buffer is short.
pub(crate) fn hex_field<'a>(hex: &'a str, range: Range<usize>, what: &str) -> Result<&'a str> {
    let len = hex.len();
    hex.get(range.clone()).ok_or_else(|| {
        SwitcherError::decoding(format!(
            "failed to parse {what}: need hex chars {range:?}, response has {len}"
        ))
    })
}

pub fn parse_login(raw: &[u8]) -> Result<LoginResponse> {
    let hex = hex::encode(raw);
    let session_id = hex_field(&hex, LOGIN_SESSION, "login response")?.to_string();
    Ok(LoginResponse { session_id })
}

pub fn parse_state(raw: &[u8], version: ProtocolVersion) -> Result<StateResponse> {
    let hex = hex::encode(raw);
    let layout = version.state_layout();

    let code = hex_field(&hex, layout.state, "device state")?;
    let state = DeviceState::from_wire(code)
        .ok_or_else(|| SwitcherError::decoding(format!("unknown device state code {code}")))?;

    let power_w = hex_le_u16(hex_field(&hex, layout.power, "power consumption")?)?;
    let time_left = seconds_to_hms(hex_le_u32(hex_field(&hex, layout.time_left, "time left")?)?)?;
    let time_on = match layout.time_on {
        Some(range) => Some(seconds_to_hms(hex_le_u32(hex_field(&hex, range, "time on")?)?)?),
        None => None,
    };
    let auto_shutdown = seconds_to_hms(hex_le_u32(hex_field(&hex, layout.auto_shutdown, "auto shutdown")?)?)?;

    Ok(StateResponse {
        state,
        power_w,
        current_a: watts_to_amps(power_w),
        time_left,
        time_on,
        auto_shutdown,
    })
}

pub fn parse_schedules(raw: &[u8]) -> Result<SchedulesResponse> {
    parse_schedules_in(raw, &Local)
}

/// Slots sit between a fixed header and trailer.
pub fn parse_schedules_in<Tz: TimeZone>(raw: &[u8], tz: &Tz) -> Result<SchedulesResponse>
where
    Tz::Offset: std::fmt::Display,
{
    let header = SCHEDULES_HEADER_HEX / 2;
    let trailer = SCHEDULES_TRAILER_HEX / 2;
    if raw.len() < header + trailer {
        return Err(SwitcherError::decoding(format!(
            "failed to parse schedules response: {} bytes is shorter than {}",
            raw.len(),
            header + trailer
        )));
    }
    let slots = decode_slots_in(&raw[header..raw.len() - trailer], tz)?;
    Ok(SchedulesResponse { slots })
}

/// An empty buffer is an unsuccessful ack, not an error.
pub fn parse_ack(raw: &[u8], kind: ResponseKind) -> AckResponse {
    AckResponse {
        kind,
        successful: !raw.is_empty(),
    }
}

/// Decode a response of the given kind.
pub fn parse_response(raw: &[u8], kind: ResponseKind, version: ProtocolVersion) -> Result<ResponseMessage> {
    parse_response_in(raw, kind, version, &Local)
}

pub fn parse_response_in<Tz: TimeZone>(
    raw: &[u8],
    kind: ResponseKind,
    version: ProtocolVersion,
    tz: &Tz,
) -> Result<ResponseMessage>
where
    Tz::Offset: std::fmt::Display,
{
    Ok(match kind {
        ResponseKind::Login => ResponseMessage::Login(parse_login(raw)?),
        ResponseKind::State => ResponseMessage::State(parse_state(raw, version)?),
        ResponseKind::GetSchedules => ResponseMessage::Schedules(parse_schedules_in(raw, tz)?),
        ResponseKind::Control
        | ResponseKind::AutoShutdown
        | ResponseKind::UpdateName
        | ResponseKind::CreateSchedule
        | ResponseKind::DeleteSchedule
        | ResponseKind::EnableDisableSchedule => ResponseMessage::Ack(parse_ack(raw, kind)),
    })
}
