//! Packet templates, one builder per command.
//!
//! Builders return the unsigned hex packet; [`build_packet`] dispatches on a
//! [`Command`] and signs the result.

use chrono::TimeDelta;

use super::codec::{hms_string_to_hex_timestamp, minutes_to_hex_seconds, name_to_hex, timedelta_to_hex_seconds, weekday_set_to_hex};
use super::crc::sign_packet;
use super::types::{
    AUTO_SHUTDOWN_MARKER, AUTO_SHUTDOWN_PREFIX, CONTROL_MARKER, CONTROL_PREFIX, CREATE_SCHEDULE_MARKER,
    CREATE_SCHEDULE_PREFIX, CREDENTIALS_PADDING, Command, ConnectionContext, DELETE_SCHEDULE_MARKER,
    DELETE_SCHEDULE_PREFIX, DeviceState, DeviceTarget, ENABLE_DISABLE_SCHEDULE_MARKER, ENABLE_DISABLE_SCHEDULE_PREFIX,
    GET_SCHEDULES_MARKER, GET_SCHEDULES_PREFIX, GET_STATE_PREFIX, LOGIN_MARKER, LOGIN_PREFIX, NO_TIMER_REQUESTED,
    NON_RECURRING, REMOTE_SESSION_ID, REQUEST_MIDDLE, REQUEST_SUFFIX, SCHEDULE_DATA_SIZE, SCHEDULE_ENABLED_MARKER,
    SCHEDULE_STATE_MARKER, UPDATE_NAME_PREFIX, Weekday,
};
use crate::error::{Result, SwitcherError};

/// Common request header: session, fixed middle, timestamp, fixed suffix.
fn request_header(session_id: &str, timestamp: &str) -> String {
    format!("{session_id}{REQUEST_MIDDLE}{timestamp}{REQUEST_SUFFIX}")
}

/// Device id followed by the credential block.
fn credentials_block(target: &DeviceTarget) -> String {
    let (phone_id, password) = target.credentials();
    format!(
        "{}00{phone_id}0000{password}{}",
        target.device_id,
        "0".repeat(CREDENTIALS_PADDING)
    )
}

/// Prefix, header and credentials shared by every device command.
fn command_packet(prefix: &str, ctx: &ConnectionContext, target: &DeviceTarget, payload: &str) -> String {
    format!(
        "{prefix}{}{}{payload}",
        request_header(&ctx.session_id, &ctx.issued_at),
        credentials_block(target)
    )
}

/// Login always goes out with the all-zero session.
pub fn login_packet(timestamp: &str, target: &DeviceTarget) -> String {
    let (phone_id, password) = target.credentials();
    format!(
        "{LOGIN_PREFIX}{}{LOGIN_MARKER}{phone_id}0000{password}{}",
        request_header(REMOTE_SESSION_ID, timestamp),
        "0".repeat(CREDENTIALS_PADDING)
    )
}

pub fn get_state_packet(ctx: &ConnectionContext, target: &DeviceTarget) -> String {
    format!(
        "{GET_STATE_PREFIX}{}{}00",
        request_header(&ctx.session_id, &ctx.issued_at),
        target.device_id
    )
}

pub fn control_packet(
    ctx: &ConnectionContext,
    target: &DeviceTarget,
    state: DeviceState,
    timer_minutes: Option<u32>,
) -> Result<String> {
    let timer = match timer_minutes {
        Some(minutes) => minutes_to_hex_seconds(minutes)?,
        None => NO_TIMER_REQUESTED.to_string(),
    };
    let payload = format!("{CONTROL_MARKER}{}00{timer}", state.command_digit());
    Ok(command_packet(CONTROL_PREFIX, ctx, target, &payload))
}

pub fn auto_shutdown_packet(ctx: &ConnectionContext, target: &DeviceTarget, duration: TimeDelta) -> Result<String> {
    let seconds = timedelta_to_hex_seconds(duration)?;
    let payload = format!("{AUTO_SHUTDOWN_MARKER}{seconds}");
    Ok(command_packet(AUTO_SHUTDOWN_PREFIX, ctx, target, &payload))
}

pub fn update_name_packet(ctx: &ConnectionContext, target: &DeviceTarget, name: &str) -> Result<String> {
    let payload = name_to_hex(name)?;
    Ok(command_packet(UPDATE_NAME_PREFIX, ctx, target, &payload))
}

pub fn get_schedules_packet(ctx: &ConnectionContext, target: &DeviceTarget) -> String {
    command_packet(GET_SCHEDULES_PREFIX, ctx, target, GET_SCHEDULES_MARKER)
}

/// Device schedule ids are a single digit.
pub fn delete_schedule_packet(ctx: &ConnectionContext, target: &DeviceTarget, schedule_id: &str) -> Result<String> {
    if schedule_id.len() != 1 || !schedule_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(SwitcherError::encoding(format!(
            "schedule id must be a single digit, got {schedule_id:?}"
        )));
    }
    let payload = format!("{DELETE_SCHEDULE_MARKER}{schedule_id}");
    Ok(command_packet(DELETE_SCHEDULE_PREFIX, ctx, target, &payload))
}

pub fn enable_disable_schedule_packet(
    ctx: &ConnectionContext,
    target: &DeviceTarget,
    schedule_data: &[u8; SCHEDULE_DATA_SIZE],
) -> String {
    let payload = format!("{ENABLE_DISABLE_SCHEDULE_MARKER}{}", hex::encode(schedule_data));
    command_packet(ENABLE_DISABLE_SCHEDULE_PREFIX, ctx, target, &payload)
}

/// Start and end are already-encoded hex timestamps.
pub fn create_schedule_packet(
    ctx: &ConnectionContext,
    target: &DeviceTarget,
    days: &[Weekday],
    start_hex: &str,
    end_hex: &str,
) -> Result<String> {
    let weekdays = if days.is_empty() {
        format!("{NON_RECURRING:02x}")
    } else {
        weekday_set_to_hex(days)?
    };
    let payload = format!(
        "{CREATE_SCHEDULE_MARKER}{SCHEDULE_ENABLED_MARKER}{weekdays}{SCHEDULE_STATE_MARKER}{start_hex}{end_hex}"
    );
    Ok(command_packet(CREATE_SCHEDULE_PREFIX, ctx, target, &payload))
}

/// Build and sign the packet for `command`.
///
/// `CreateSchedule` times are `HH:MM` in the local timezone.
pub fn build_packet(command: &Command, ctx: &ConnectionContext, target: &DeviceTarget) -> Result<String> {
    let unsigned = match command {
        Command::Login => login_packet(&ctx.issued_at, target),
        Command::GetState => get_state_packet(ctx, target),
        Command::Control { state, timer_minutes } => control_packet(ctx, target, *state, *timer_minutes)?,
        Command::SetAutoShutdown { duration } => auto_shutdown_packet(ctx, target, *duration)?,
        Command::SetName { name } => update_name_packet(ctx, target, name)?,
        Command::GetSchedules => get_schedules_packet(ctx, target),
        Command::CreateSchedule { days, start, end } => {
            let start_hex = hms_string_to_hex_timestamp(start)?;
            let end_hex = hms_string_to_hex_timestamp(end)?;
            create_schedule_packet(ctx, target, days, &start_hex, &end_hex)?
        }
        Command::DeleteSchedule { id } => delete_schedule_packet(ctx, target, id)?,
        Command::EnableDisableSchedule { schedule_data } => enable_disable_schedule_packet(ctx, target, schedule_data),
    };
    sign_packet(&unsigned)
}
