//! Unit tests for packet building and response parsing.

use chrono::{FixedOffset, TimeDelta};

use super::crc::sign_packet;
use super::packets::{
    build_packet, create_schedule_packet, delete_schedule_packet, enable_disable_schedule_packet, get_schedules_packet,
    get_state_packet, login_packet, update_name_packet,
};
use super::parser::{ResponseMessage, hex_field, parse_ack, parse_login, parse_response, parse_schedules_in, parse_state};
use super::types::{Command, ConnectionContext, DeviceState, DeviceTarget, ProtocolVersion, ResponseKind, Weekday};
use crate::error::SwitcherError;

const SESSION: &str = "01000000";
const TIMESTAMP: &str = "ef8db35c";
const DEVICE_ID: &str = "a123bc";

fn ctx() -> ConnectionContext {
    ConnectionContext::new(SESSION, TIMESTAMP)
}

fn target() -> DeviceTarget {
    DeviceTarget::new(DEVICE_ID, ProtocolVersion::Current)
}

fn signature(signed: &str) -> &str {
    &signed[signed.len() - 8..]
}

fn signed(command: Command) -> String {
    build_packet(&command, &ctx(), &target()).unwrap()
}

/// Zero-filled buffer of `len` bytes with hex fields written at their offsets.
fn response(len: usize, fields: &[(usize, &str)]) -> Vec<u8> {
    let mut hex = "00".repeat(len);
    for (offset, value) in fields {
        hex.replace_range(*offset..*offset + value.len(), value);
    }
    hex::decode(hex).unwrap()
}

fn state_response(state: &str) -> Vec<u8> {
    response(
        101,
        &[
            (150, state),
            (154, "d0070000"),
            (178, "18150000"),
            (186, "100e0000"),
            (194, "80700000"),
        ],
    )
}

#[test]
fn test_login_packet_signature() {
    let packet = login_packet(TIMESTAMP, &target());
    assert_eq!(packet.len(), 156);
    assert!(packet.starts_with("fef052000232a10000000000"));
    assert_eq!(signature(&sign_packet(&packet).unwrap()), "627f33f1");
}

#[test]
fn test_login_ignores_session_of_context() {
    assert_eq!(signature(&signed(Command::Login)), "627f33f1");
}

#[test]
fn test_legacy_login_sends_credentials() {
    let legacy = DeviceTarget::new(DEVICE_ID, ProtocolVersion::Legacy).with_credentials("1234", "abcdef01");
    let packet = login_packet(TIMESTAMP, &legacy);
    assert!(packet.contains("1c0012340000abcdef01"));
    assert_eq!(signature(&sign_packet(&packet).unwrap()), "e5f69bcb");

    // current devices always get zeroed credentials
    let current = DeviceTarget::new(DEVICE_ID, ProtocolVersion::Current).with_credentials("1234", "abcdef01");
    assert_eq!(login_packet(TIMESTAMP, &current), login_packet(TIMESTAMP, &target()));
}

#[test]
fn test_get_state_packet_signature() {
    let packet = get_state_packet(&ctx(), &target());
    assert_eq!(
        packet,
        "fef030000232010301000000340001000000000000000000ef8db35c00000000000000000000f0fea123bc00"
    );
    assert_eq!(signature(&signed(Command::GetState)), "42a9a1b2");
}

#[test]
fn test_control_packet_signatures() {
    let on = signed(Command::Control {
        state: DeviceState::On,
        timer_minutes: None,
    });
    assert_eq!(on.len(), 178 + 8);
    assert_eq!(signature(&on), "cc06bb10");

    let off = signed(Command::Control {
        state: DeviceState::Off,
        timer_minutes: None,
    });
    assert_eq!(signature(&off), "6c432cf4");

    let timed = signed(Command::Control {
        state: DeviceState::On,
        timer_minutes: Some(90),
    });
    assert!(timed[..timed.len() - 8].ends_with("010600010018150000"));
    assert_eq!(signature(&timed), "3b30141e");
}

#[test]
fn test_auto_shutdown_packet_signature() {
    let packet = signed(Command::SetAutoShutdown {
        duration: TimeDelta::minutes(90),
    });
    assert_eq!(packet.len(), 174 + 8);
    assert_eq!(signature(&packet), "3bb1ca55");
}

#[test]
fn test_auto_shutdown_out_of_range() {
    let result = build_packet(
        &Command::SetAutoShutdown {
            duration: TimeDelta::minutes(30),
        },
        &ctx(),
        &target(),
    );
    assert!(matches!(result, Err(SwitcherError::Encoding(_))));
}

#[test]
fn test_update_name_packet_signature() {
    let packet = update_name_packet(&ctx(), &target(), "my device cool name").unwrap();
    assert_eq!(packet.len(), 224);
    assert_eq!(signature(&sign_packet(&packet).unwrap()), "1039bc0e");
    assert!(update_name_packet(&ctx(), &target(), "x").is_err());
}

#[test]
fn test_get_schedules_packet_signature() {
    let packet = get_schedules_packet(&ctx(), &target());
    assert_eq!(packet.len(), 166);
    assert_eq!(signature(&signed(Command::GetSchedules)), "0efde536");
}

#[test]
fn test_delete_schedule_packet_signature() {
    let packet = delete_schedule_packet(&ctx(), &target(), "3").unwrap();
    assert!(packet.ends_with("08010003"));
    assert_eq!(signature(&sign_packet(&packet).unwrap()), "fbecc638");
    assert!(delete_schedule_packet(&ctx(), &target(), "12").is_err());
    assert!(delete_schedule_packet(&ctx(), &target(), "a").is_err());
}

#[test]
fn test_enable_disable_schedule_packet_signature() {
    let data: [u8; 12] = hex::decode("01000201e06aa35cf078a35c").unwrap().try_into().unwrap();
    let packet = enable_disable_schedule_packet(&ctx(), &target(), &data);
    assert_eq!(packet.len(), 190);
    assert_eq!(signature(&sign_packet(&packet).unwrap()), "50338476");
}

#[test]
fn test_create_schedule_packet_signatures() {
    let recurring = create_schedule_packet(&ctx(), &target(), &[Weekday::Monday], "e06aa35c", "f078a35c").unwrap();
    assert!(recurring.ends_with("030c00ff010201e06aa35cf078a35c"));
    assert_eq!(signature(&sign_packet(&recurring).unwrap()), "2c4e631d");

    let once = create_schedule_packet(&ctx(), &target(), &[], "e06aa35c", "f078a35c").unwrap();
    assert!(once.contains("030c00ff010001"));
    assert_eq!(signature(&sign_packet(&once).unwrap()), "a6902ae4");
}

#[test]
fn test_create_schedule_rejects_duplicate_days() {
    let result = create_schedule_packet(
        &ctx(),
        &target(),
        &[Weekday::Friday, Weekday::Friday],
        "e06aa35c",
        "f078a35c",
    );
    assert!(result.is_err());
}

#[test]
fn test_parse_login_response() {
    let raw = response(40, &[(16, "a1b2c3d4")]);
    assert_eq!(parse_login(&raw).unwrap().session_id, "a1b2c3d4");
    assert!(matches!(parse_login(&[]), Err(SwitcherError::Decoding(_))));
    assert!(parse_login(&raw[..11]).is_err());
}

#[test]
fn test_parse_state_response() {
    let state = parse_state(&state_response("0100"), ProtocolVersion::Current).unwrap();
    assert_eq!(state.state, DeviceState::On);
    assert_eq!(state.power_w, 2000);
    assert_eq!(state.current_a, 9.1);
    assert_eq!(state.time_left, "01:30:00");
    assert_eq!(state.time_on.as_deref(), Some("01:00:00"));
    assert_eq!(state.auto_shutdown, "08:00:00");
}

#[test]
fn test_parse_state_legacy_has_no_time_on() {
    let state = parse_state(&state_response("0000"), ProtocolVersion::Legacy).unwrap();
    assert_eq!(state.state, DeviceState::Off);
    assert_eq!(state.time_on, None);
}

#[test]
fn test_parse_state_rejects_unknown_code() {
    assert!(matches!(
        parse_state(&state_response("0200"), ProtocolVersion::Current),
        Err(SwitcherError::Decoding(_))
    ));
}

#[test]
fn test_parse_state_short_buffer() {
    let raw = state_response("0100");
    for len in [0, 10, 76, 90, 100] {
        assert!(
            matches!(parse_state(&raw[..len], ProtocolVersion::Current), Err(SwitcherError::Decoding(_))),
            "length {len} should fail"
        );
    }
    // legacy stops before time_on but still needs auto shutdown
    assert!(parse_state(&raw[..100], ProtocolVersion::Legacy).is_err());
}

#[test]
fn test_parse_schedules_response() {
    let tz = FixedOffset::east_opt(3 * 3600).unwrap();
    let slots = "01010201e06aa35cf078a35c000000000201fe01e06aa35cf078a35c00000000";
    let raw = response(45 + 32 + 4, &[(90, slots)]);
    let parsed = parse_schedules_in(&raw, &tz).unwrap();
    assert!(parsed.found_schedules());
    assert_eq!(parsed.slots.len(), 2);
    assert_eq!(parsed.slots[0].start_time, "17:00");
    assert_eq!(parsed.slots[1].days.len(), 7);
}

#[test]
fn test_parse_schedules_empty_list() {
    let tz = FixedOffset::east_opt(0).unwrap();
    let parsed = parse_schedules_in(&response(49, &[]), &tz).unwrap();
    assert!(!parsed.found_schedules());
    assert!(parse_schedules_in(&[], &tz).is_err());
}

#[test]
fn test_parse_ack_success_marker() {
    assert!(parse_ack(&[0xfe, 0xf0], ResponseKind::Control).successful);
    assert!(!parse_ack(&[], ResponseKind::Control).successful);
}

#[test]
fn test_parse_response_dispatch() {
    let ack = parse_response(&[], ResponseKind::DeleteSchedule, ProtocolVersion::Current).unwrap();
    assert!(matches!(ack, ResponseMessage::Ack(a) if !a.successful && a.kind == ResponseKind::DeleteSchedule));

    let state = parse_response(&state_response("0100"), ResponseKind::State, ProtocolVersion::Current).unwrap();
    assert!(matches!(state, ResponseMessage::State(s) if s.state == DeviceState::On));

    assert!(parse_response(&[], ResponseKind::Login, ProtocolVersion::Current).is_err());
}

#[test]
fn test_hex_field_bounds() {
    assert_eq!(hex_field("abcdef", 2..4, "x").unwrap(), "cd");
    assert!(hex_field("abcdef", 4..8, "x").is_err());
}

#[test]
fn test_command_response_kinds() {
    assert_eq!(Command::Login.response_kind(), ResponseKind::Login);
    assert_eq!(Command::GetState.response_kind(), ResponseKind::State);
    assert_eq!(
        Command::DeleteSchedule { id: "1".into() }.response_kind(),
        ResponseKind::DeleteSchedule
    );
}
