//! Status broadcast datagrams.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::codec::{hex_le_u16, hex_le_u32, hex_to_name, seconds_to_hms, watts_to_amps};
use super::parser::hex_field;
use super::types::{BROADCAST_LENGTH, BROADCAST_MAGIC, DeviceState, DeviceType, ProtocolVersion};
use crate::error::{Result, SwitcherError};

/// Device status decoded from one broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastMessage {
    pub device_id: String,
    pub device_key: String,
    pub name: String,
    pub device_type: Option<DeviceType>,
    pub ip_address: Ipv4Addr,
    pub mac_address: String,
    pub state: DeviceState,
    pub power_w: u16,
    pub current_a: f64,
    /// `None` for power plugs, which have no running timer.
    pub remaining: Option<String>,
    pub auto_shutdown: Option<String>,
}

/// Magic prefix and fixed length identify a genuine device broadcast.
pub fn is_switcher_originator(datagram: &[u8]) -> bool {
    datagram.len() == BROADCAST_LENGTH && hex::encode(&datagram[..2]) == BROADCAST_MAGIC
}

pub fn parse_broadcast(datagram: &[u8], version: ProtocolVersion) -> Result<BroadcastMessage> {
    if !is_switcher_originator(datagram) {
        return Err(SwitcherError::decoding(format!(
            "not a device broadcast ({} bytes)",
            datagram.len()
        )));
    }

    let hex = hex::encode(datagram);
    let layout = version.broadcast_layout();

    let device_id = hex_field(&hex, layout.device_id, "device id")?.to_string();
    let device_key = hex_field(&hex, layout.device_key, "device key")?.to_string();
    let name = hex_to_name(&datagram[layout.name.start / 2..layout.name.end / 2]);
    let device_type = match layout.device_type {
        Some(range) => DeviceType::from_hex(hex_field(&hex, range, "device type")?),
        None => None,
    };

    let ip_raw = hex_le_u32(hex_field(&hex, layout.ip_address, "ip address")?)?;
    let ip_address = Ipv4Addr::from(ip_raw.to_le_bytes());

    let mac_hex = hex_field(&hex, layout.mac_address, "mac address")?.to_uppercase();
    let mac_address = mac_hex
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":");

    let state = if hex_field(&hex, layout.state, "device state")? == layout.state_on {
        DeviceState::On
    } else {
        DeviceState::Off
    };

    let power_w = match state {
        DeviceState::On => hex_le_u16(hex_field(&hex, layout.power, "power consumption")?)?,
        DeviceState::Off => 0,
    };

    let (remaining, auto_shutdown) = if device_type == Some(DeviceType::PowerPlug) {
        (None, None)
    } else {
        let remaining = match state {
            DeviceState::On => seconds_to_hms(hex_le_u32(hex_field(&hex, layout.remaining, "remaining time")?)?)?,
            DeviceState::Off => "00:00:00".to_string(),
        };
        let auto_shutdown = seconds_to_hms(hex_le_u32(hex_field(&hex, layout.auto_shutdown, "auto shutdown")?)?)?;
        (Some(remaining), Some(auto_shutdown))
    };

    Ok(BroadcastMessage {
        device_id,
        device_key,
        name,
        device_type,
        ip_address,
        mac_address,
        state,
        power_w,
        current_a: watts_to_amps(power_w),
        remaining,
        auto_shutdown,
    })
}
