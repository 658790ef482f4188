//! Switcher device protocol.
//!
//! Commands are hex packet templates signed with a two-stage CRC and sent over
//! TCP port 9957. Every command needs a session obtained from a login on the
//! same connection. Devices also announce their status over UDP broadcasts.

pub mod bridge;
pub mod broadcast;
pub mod client;
pub mod codec;
pub mod crc;
pub mod io;
pub mod packets;
pub mod parser;
pub mod schedule;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use bridge::{BridgeHandle, SwitcherBridge};
pub use broadcast::{BroadcastMessage, is_switcher_originator, parse_broadcast};
pub use client::SwitcherClient;
pub use crc::sign_packet;
pub use io::{TcpTransport, Transport};
pub use packets::build_packet;
pub use parser::{
    AckResponse, LoginResponse, ResponseMessage, SchedulesResponse, StateResponse, parse_response, parse_response_in,
};
pub use schedule::ScheduleSlot;
pub use types::{
    Command, ConnectionContext, DeviceState, DeviceTarget, DeviceType, ProtocolVersion, ResponseKind, Weekday,
};
